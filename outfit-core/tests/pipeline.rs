use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use chrono_tz::{Australia::Sydney, Tz};
use outfit_core::{
    Category, Config, Delivery, GenerativeBackend, HistoryRecord, HistoryStore, Notifier, Pipeline,
    RunMode, WardrobeItem, WardrobeStore, WeatherProvider, WeatherRequest, WeatherSnapshot,
};

const REPLY: &str = "Good morning Peter, it is Wednesday 21 Jan in Sydney.\n\
Warm and clear, so keep it light.\n\n\
Top: Chambray Work Shirt\n\
Bottom: Olive Fatigues\n\
Shoes: Paraboot Michael";

#[derive(Debug)]
struct FixedWeather;

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherSnapshot> {
        Ok(WeatherSnapshot {
            temperature_c: 24.0,
            feels_like_c: 25.0,
            humidity_pct: 60.0,
            wind_speed_kmh: 12.0,
            rain_chance_pct: 10.0,
            condition: "Clear sky".into(),
            high_c: 27.0,
            low_c: 19.0,
            daily_rain_chance_pct: 15.0,
            uv_index: 9.0,
            local_time: outfit_core::clock::format_local_time(&request.now),
            date_formatted: outfit_core::clock::format_long_date(&request.now),
        })
    }
}

struct FixedWardrobe(Vec<WardrobeItem>);

#[async_trait]
impl WardrobeStore for FixedWardrobe {
    async fn wardrobe(&self) -> Result<Vec<WardrobeItem>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct MemoryHistory {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistory {
    fn with(records: Vec<HistoryRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    fn snapshot(&self) -> Vec<HistoryRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn history(&self) -> Result<Vec<HistoryRecord>> {
        Ok(self.snapshot())
    }

    async fn append(&self, record: &HistoryRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Remembers the last instruction and answers with a canned reply.
struct ScriptedBackend {
    reply: String,
    seen: Mutex<Option<String>>,
}

impl ScriptedBackend {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            seen: Mutex::new(None),
        }
    }

    fn instruction(&self) -> String {
        self.seen.lock().unwrap().clone().unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn complete(&self, instruction: &str) -> Result<String> {
        *self.seen.lock().unwrap() = Some(instruction.to_string());
        Ok(self.reply.clone())
    }
}

struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn ok() -> Self {
        Self {
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<Delivery> {
        if self.fail {
            return Err(anyhow!("gateway rejected the message"));
        }
        self.sent.lock().unwrap().push(message.to_string());
        Ok(Delivery {
            sid: "SM1".into(),
            status: "queued".into(),
        })
    }
}

fn morning() -> DateTime<Tz> {
    Sydney.with_ymd_and_hms(2026, 1, 21, 7, 30, 0).unwrap()
}

fn item(name: &str, category: Category, quantity: u32) -> WardrobeItem {
    WardrobeItem {
        name: name.into(),
        category: category.label().into(),
        pillar: Some("Workwear".into()),
        description: None,
        quantity,
    }
}

fn wardrobe() -> FixedWardrobe {
    FixedWardrobe(vec![
        item("Chambray Work Shirt", Category::Top, 1),
        item("Grey Loopwheel Tee", Category::Top, 2),
        item("Olive Fatigues", Category::Bottom, 1),
        item("Paraboot Michael", Category::Shoes, 1),
    ])
}

fn worn(date: &str, top: &str) -> HistoryRecord {
    HistoryRecord {
        date: date.into(),
        top: top.into(),
        bottom: "Selvedge Denim".into(),
        shoes: "Paraboot Michael".into(),
        ..HistoryRecord::default()
    }
}

struct Fixture {
    config: Config,
    wardrobe: FixedWardrobe,
    history: MemoryHistory,
    backend: ScriptedBackend,
    notifier: RecordingNotifier,
}

impl Fixture {
    fn new(history: Vec<HistoryRecord>, notifier: RecordingNotifier) -> Self {
        Self {
            config: Config::default(),
            wardrobe: wardrobe(),
            history: MemoryHistory::with(history),
            backend: ScriptedBackend::new(REPLY),
            notifier,
        }
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline {
            config: &self.config,
            weather: &FixedWeather,
            wardrobe: &self.wardrobe,
            history: &self.history,
            backend: &self.backend,
            notifier: &self.notifier,
            skill: None,
        }
    }
}

#[tokio::test]
async fn successful_send_appends_one_record_dated_today() {
    let fx = Fixture::new(Vec::new(), RecordingNotifier::ok());

    let report = fx.pipeline().run(morning(), RunMode::Send).await.unwrap();

    assert!(report.history_written);
    assert_eq!(report.delivery.unwrap().sid, "SM1");
    assert_eq!(fx.notifier.sent(), vec![REPLY.to_string()]);

    let history = fx.history.snapshot();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].date, "2026-01-21");
    assert_eq!(history[0].top, "Chambray Work Shirt");
    assert_eq!(history[0].bottom, "Olive Fatigues");
    assert_eq!(history[0].shoes, "Paraboot Michael");
    assert_eq!(history[0].outer, "");
}

#[tokio::test]
async fn failed_send_leaves_history_untouched() {
    let earlier = vec![worn("2026-01-20", "Grey Loopwheel Tee")];
    let fx = Fixture::new(earlier.clone(), RecordingNotifier::failing());

    let err = fx.pipeline().run(morning(), RunMode::Send).await.unwrap_err();

    assert!(format!("{err:#}").contains("gateway rejected"));
    assert_eq!(fx.history.snapshot(), earlier);
}

#[tokio::test]
async fn dry_run_neither_sends_nor_records() {
    let fx = Fixture::new(Vec::new(), RecordingNotifier::ok());

    let report = fx.pipeline().run(morning(), RunMode::DryRun).await.unwrap();

    assert!(report.delivery.is_none());
    assert!(!report.history_written);
    assert!(fx.notifier.sent().is_empty());
    assert!(fx.history.snapshot().is_empty());
    assert_eq!(
        report.recommendation.outfit.get(Category::Top),
        Some("Chambray Work Shirt")
    );
}

#[tokio::test]
async fn exhausted_tops_reach_the_instruction() {
    let history = vec![
        worn("2026-01-19", "Chambray Work Shirt"),
        worn("2026-01-20", "Grey Loopwheel Tee"),
        // Too old to count.
        worn("2026-01-10", "Grey Loopwheel Tee"),
    ];
    let fx = Fixture::new(history, RecordingNotifier::ok());

    fx.pipeline().run(morning(), RunMode::DryRun).await.unwrap();
    let instruction = fx.backend.instruction();

    assert!(instruction.contains("already worn their max times in the last 7 days): Chambray Work Shirt\n"));
    assert!(instruction.contains("- 2026-01-20: Top=Grey Loopwheel Tee"));
    assert!(!instruction.contains("2026-01-10"));
    assert!(instruction.contains("Date: Wednesday 21 Jan"));

    let preview = fx.pipeline().compose(morning()).await.unwrap();
    assert_eq!(preview, instruction);
}

#[tokio::test]
async fn long_reply_is_truncated_before_sending() {
    let mut fx = Fixture::new(Vec::new(), RecordingNotifier::ok());
    fx.backend = ScriptedBackend::new(&"x".repeat(500));

    let report = fx.pipeline().run(morning(), RunMode::Send).await.unwrap();

    let sent = fx.notifier.sent();
    assert_eq!(sent[0].chars().count(), 480);
    assert!(sent[0].ends_with("..."));
    // Nothing parseable, but the empty outfit is still recorded.
    assert!(report.history_written);
    assert_eq!(fx.history.snapshot()[0].top, "");
}

#[tokio::test]
async fn bulleted_reply_still_records_the_outfit() {
    let mut fx = Fixture::new(Vec::new(), RecordingNotifier::ok());
    fx.backend = ScriptedBackend::new(
        "Good morning Peter.\n\n- Top: Chambray Work Shirt\n- Bottom: Olive Fatigues\n- Shoes: Paraboot Michael",
    );

    fx.pipeline().run(morning(), RunMode::Send).await.unwrap();

    let history = fx.history.snapshot();
    assert_eq!(history[0].top, "Chambray Work Shirt");
    assert_eq!(history[0].shoes, "Paraboot Michael");

    // Tomorrow the only Chambray is worn out.
    let tomorrow = Sydney.with_ymd_and_hms(2026, 1, 22, 7, 30, 0).unwrap();
    let instruction = fx.pipeline().compose(tomorrow).await.unwrap();
    assert!(instruction.contains("days): Chambray Work Shirt\n"));
}

//! One daily run: weather, wardrobe, history, recommendation, SMS, history write.

use anyhow::{Context, Result};
use chrono::DateTime;
use chrono_tz::Tz;

use crate::{
    clock,
    config::Config,
    llm::GenerativeBackend,
    model::{Delivery, HistoryRecord, OutfitRecommendation, WeatherRequest, WeatherSnapshot},
    notify::Notifier,
    parser::parse_outfit,
    prompt::{self, PromptInputs},
    provider::WeatherProvider,
    rotation::build_constraints,
    store::{HistoryStore, WardrobeStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Send,
    /// Read everything and call the backend, but neither send nor write to any store.
    DryRun,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub weather: WeatherSnapshot,
    pub recommendation: OutfitRecommendation,
    pub delivery: Option<Delivery>,
    pub history_written: bool,
}

/// Read the optional skill document named in the config.
pub fn load_skill(config: &Config) -> Result<Option<String>> {
    let Some(path) = &config.skill_path else {
        return Ok(None);
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read skill document {}", path.display()))?;
    Ok(Some(text))
}

pub struct Pipeline<'a> {
    pub config: &'a Config,
    pub weather: &'a dyn WeatherProvider,
    pub wardrobe: &'a dyn WardrobeStore,
    pub history: &'a dyn HistoryStore,
    pub backend: &'a dyn GenerativeBackend,
    pub notifier: &'a dyn Notifier,
    pub skill: Option<String>,
}

/// Everything gathered before the backend call.
struct Gathered {
    weather: WeatherSnapshot,
    instruction: String,
}

impl Pipeline<'_> {
    async fn gather(&self, now: DateTime<Tz>) -> Result<Gathered> {
        let request = WeatherRequest::from_config(self.config, now)?;
        let weather = self
            .weather
            .get_weather(&request)
            .await
            .context("Failed to fetch weather")?;
        tracing::info!(
            temp = weather.temperature_c,
            condition = %weather.condition,
            "weather fetched"
        );

        let wardrobe = self
            .wardrobe
            .wardrobe()
            .await
            .context("Failed to load wardrobe")?;
        tracing::info!(items = wardrobe.len(), "wardrobe loaded");

        let history = self
            .history
            .history()
            .await
            .context("Failed to load outfit history")?;

        let constraints = build_constraints(
            &history,
            &wardrobe,
            now.date_naive(),
            self.config.history.lookback_days,
        );
        tracing::info!(
            records = history.len(),
            recent = constraints.recent.len(),
            excluded_tops = constraints.excluded_tops.len(),
            "history loaded"
        );

        let instruction = prompt::compose(
            self.config,
            PromptInputs {
                weather: &weather,
                wardrobe: &wardrobe,
                constraints: &constraints,
                skill: self.skill.as_deref(),
            },
        );

        Ok(Gathered {
            weather,
            instruction,
        })
    }

    /// The instruction that would be sent to the backend right now.
    pub async fn compose(&self, now: DateTime<Tz>) -> Result<String> {
        Ok(self.gather(now).await?.instruction)
    }

    #[tracing::instrument(skip(self), fields(date = %clock::history_date(now.date_naive())))]
    pub async fn run(&self, now: DateTime<Tz>, mode: RunMode) -> Result<RunReport> {
        let Gathered {
            weather,
            instruction,
        } = self.gather(now).await?;

        let reply = self
            .backend
            .complete(&instruction)
            .await
            .context("Failed to generate recommendation")?;

        let message = prompt::truncate_message(reply.trim(), self.config.sms.max_chars);
        let outfit = parse_outfit(&message);
        if !outfit.has_required_fields() {
            tracing::warn!(parsed = outfit.len(), "reply is missing Top, Bottom or Shoes");
        }
        tracing::info!(chars = message.chars().count(), "recommendation generated");

        let recommendation = OutfitRecommendation { message, outfit };

        if mode == RunMode::DryRun {
            tracing::info!("dry run, skipping SMS and history");
            return Ok(RunReport {
                weather,
                recommendation,
                delivery: None,
                history_written: false,
            });
        }

        let delivery = self.notifier.send(&recommendation.message).await?;

        let record = HistoryRecord::for_outfit(now.date_naive(), &recommendation.outfit);
        self.history
            .append(&record)
            .await
            .context("SMS was sent but recording the outfit failed")?;
        tracing::info!(date = %record.date, top = %record.top, "history updated");

        Ok(RunReport {
            weather,
            recommendation,
            delivery: Some(delivery),
            history_written: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn no_skill_path_means_no_skill() {
        let config = Config::default();
        assert!(load_skill(&config).unwrap().is_none());
    }

    #[test]
    fn skill_file_is_read_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Prefer indigo.\nAvoid logos.").unwrap();

        let config = Config {
            skill_path: Some(file.path().to_path_buf()),
            ..Config::default()
        };

        assert_eq!(
            load_skill(&config).unwrap().as_deref(),
            Some("Prefer indigo.\nAvoid logos.")
        );
    }

    #[test]
    fn unreadable_skill_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            skill_path: Some(dir.path().join("missing.md")),
            ..Config::default()
        };

        let err = load_skill(&config).unwrap_err();
        assert!(err.to_string().contains("missing.md"));
    }
}

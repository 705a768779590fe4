use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::clock;

/// Where and when to fetch weather for.
#[derive(Debug, Clone)]
pub struct WeatherRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Tz,
    pub now: DateTime<Tz>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_kmh: f64,
    pub rain_chance_pct: f64,
    pub condition: String,
    pub high_c: f64,
    pub low_c: f64,
    pub daily_rain_chance_pct: f64,
    pub uv_index: f64,
    pub local_time: String,
    pub date_formatted: String,
}

/// Garment categories the recommender understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Top,
    Bottom,
    Shoes,
    Outer,
    Accessory,
}

impl Category {
    pub const fn all() -> &'static [Category] {
        &[
            Category::Top,
            Category::Bottom,
            Category::Shoes,
            Category::Outer,
            Category::Accessory,
        ]
    }

    /// Label as it appears in the sheet header and in model output.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Top => "Top",
            Category::Bottom => "Bottom",
            Category::Shoes => "Shoes",
            Category::Outer => "Outer",
            Category::Accessory => "Accessory",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Category::Top => "top",
            Category::Bottom => "bottom",
            Category::Shoes => "shoes",
            Category::Outer => "outer",
            Category::Accessory => "accessory",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::all()
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardrobeItem {
    pub name: String,
    pub category: String,
    pub pillar: Option<String>,
    pub description: Option<String>,
    pub quantity: u32,
}

impl WardrobeItem {
    pub fn category(&self) -> Option<Category> {
        Category::from_label(&self.category)
    }

    /// Parse a quantity cell. Blank, zero or non-numeric cells count as one.
    pub fn parse_quantity(raw: Option<&str>) -> u32 {
        raw.map(str::trim)
            .map(|s| {
                let digits: String = s.chars().take_while(char::is_ascii_digit).collect();
                digits.parse::<u32>().unwrap_or(0)
            })
            .filter(|q| *q > 0)
            .unwrap_or(1)
    }
}

/// One row of the history sheet. The date is kept as written so that
/// malformed rows survive a round trip and are only skipped when windowing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub date: String,
    pub top: String,
    pub bottom: String,
    pub shoes: String,
    pub outer: String,
    pub accessory: String,
}

impl HistoryRecord {
    pub const HEADER: [&'static str; 6] = ["Date", "Top", "Bottom", "Shoes", "Outer", "Accessory"];

    pub fn for_outfit(date: NaiveDate, outfit: &Outfit) -> Self {
        let value = |c| outfit.get(c).unwrap_or_default().to_string();
        Self {
            date: clock::history_date(date),
            top: value(Category::Top),
            bottom: value(Category::Bottom),
            shoes: value(Category::Shoes),
            outer: value(Category::Outer),
            accessory: value(Category::Accessory),
        }
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()
    }

    pub fn item(&self, category: Category) -> &str {
        match category {
            Category::Top => &self.top,
            Category::Bottom => &self.bottom,
            Category::Shoes => &self.shoes,
            Category::Outer => &self.outer,
            Category::Accessory => &self.accessory,
        }
    }

    /// Cells in header order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.top.clone(),
            self.bottom.clone(),
            self.shoes.clone(),
            self.outer.clone(),
            self.accessory.clone(),
        ]
    }
}

/// Structured outfit pulled out of the model's reply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Outfit {
    items: BTreeMap<Category, String>,
}

impl Outfit {
    pub fn get(&self, category: Category) -> Option<&str> {
        self.items.get(&category).map(String::as_str)
    }

    pub fn insert(&mut self, category: Category, value: impl Into<String>) {
        self.items.insert(category, value.into());
    }

    pub fn contains(&self, category: Category) -> bool {
        self.items.contains_key(&category)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_required_fields(&self) -> bool {
        [Category::Top, Category::Bottom, Category::Shoes]
            .iter()
            .all(|c| self.contains(*c))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &str)> {
        self.items.iter().map(|(c, v)| (*c, v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitRecommendation {
    pub message: String,
    pub outfit: Outfit,
}

/// Acknowledgment from the SMS gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub sid: String,
    pub status: String,
}

//! Rotation constraints derived from recent outfit history.
//!
//! A top is "in the laundry" once it has been worn at least as many times
//! within the lookback window as there are copies of it in the wardrobe.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Days, NaiveDate};

use crate::model::{Category, HistoryRecord, WardrobeItem};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationConstraints {
    /// Tops that must not be recommended today.
    pub excluded_tops: BTreeSet<String>,
    /// Bottoms worn in the window with their wear counts (soft variety hint).
    pub recent_bottoms: BTreeMap<String, usize>,
    /// The in-window records, in sheet order.
    pub recent: Vec<HistoryRecord>,
}

impl RotationConstraints {
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}

/// Records dated on or after `today - lookback_days`. Rows whose date does
/// not parse are dropped here and never reach the counts.
pub fn recent_history(
    history: &[HistoryRecord],
    today: NaiveDate,
    lookback_days: u32,
) -> Vec<HistoryRecord> {
    let cutoff = today
        .checked_sub_days(Days::new(u64::from(lookback_days)))
        .unwrap_or(NaiveDate::MIN);

    history
        .iter()
        .filter(|record| match record.parsed_date() {
            Some(date) => date >= cutoff,
            None => {
                tracing::debug!(date = %record.date, "skipping history row with unparseable date");
                false
            }
        })
        .cloned()
        .collect()
}

/// Owned quantity per top, keyed by item name.
fn top_quantities(wardrobe: &[WardrobeItem]) -> HashMap<&str, u32> {
    wardrobe
        .iter()
        .filter(|item| item.category() == Some(Category::Top))
        .map(|item| (item.name.as_str(), item.quantity))
        .collect()
}

/// Build today's constraints from the full history and the wardrobe.
pub fn build_constraints(
    history: &[HistoryRecord],
    wardrobe: &[WardrobeItem],
    today: NaiveDate,
    lookback_days: u32,
) -> RotationConstraints {
    let recent = recent_history(history, today, lookback_days);

    let mut top_wear: BTreeMap<&str, usize> = BTreeMap::new();
    let mut recent_bottoms: BTreeMap<String, usize> = BTreeMap::new();

    for record in &recent {
        let top = record.item(Category::Top).trim();
        if !top.is_empty() {
            *top_wear.entry(top).or_default() += 1;
        }

        let bottom = record.item(Category::Bottom).trim();
        if !bottom.is_empty() {
            *recent_bottoms.entry(bottom.to_string()).or_default() += 1;
        }
    }

    let quantities = top_quantities(wardrobe);
    let excluded_tops = top_wear
        .into_iter()
        .filter(|(top, worn)| {
            let owned = quantities.get(top).copied().unwrap_or(1).max(1);
            *worn >= owned as usize
        })
        .map(|(top, _)| top.to_string())
        .collect();

    RotationConstraints {
        excluded_tops,
        recent_bottoms,
        recent,
    }
}

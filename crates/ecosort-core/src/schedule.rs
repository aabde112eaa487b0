//! Weekly discharge schedule derived from local rule records.

use std::collections::BTreeSet;

use crate::types::{DischargeSchedule, RuleRecord, WasteCategory};

/// Shown for a weekday with nothing to put out.
pub const NO_COLLECTION: &str = "수거 없음";

/// Weekday names indexed from Sunday.
pub const WEEKDAYS: [&str; 7] = ["일", "월", "화", "수", "목", "금", "토"];

/// Separators used by the dataset's day fields ("월+수", "화,목", "월·금").
const DAY_SEPARATORS: &[char] = &[',', '+', '/', '·'];

/// Build the per-weekday schedule for a set of rule records.
///
/// Categories for a day are listed once each, general waste first, then
/// food waste, then recyclables.
pub fn derive_schedule(rules: &[RuleRecord]) -> DischargeSchedule {
    let mut per_day: [BTreeSet<usize>; 7] = Default::default();

    for rule in rules {
        for (order, category) in WasteCategory::ALL.iter().enumerate() {
            for day in parse_day_field(rule.day_field(*category)) {
                per_day[day as usize].insert(order);
            }
        }
    }

    let days = per_day
        .iter()
        .enumerate()
        .map(|(day, orders)| {
            let text = if orders.is_empty() {
                NO_COLLECTION.to_string()
            } else {
                orders
                    .iter()
                    .map(|order| WasteCategory::ALL[*order].label())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            (day as u8, text)
        })
        .collect();

    DischargeSchedule { days }
}

/// Weekday indexes (0 = Sunday) named by a free-text day field.
pub fn parse_day_field(field: &str) -> BTreeSet<u8> {
    let mut days = BTreeSet::new();

    for token in field
        .split(|c: char| DAY_SEPARATORS.contains(&c) || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        match token {
            "매일" => days.extend(0..7),
            "평일" => days.extend(1..=5),
            "주말" => days.extend([0, 6]),
            _ => {
                if let Some((start, end)) = token.split_once('~') {
                    if let (Some(start), Some(end)) = (weekday_index(start), weekday_index(end)) {
                        days.extend(weekday_range(start, end));
                    }
                } else if let Some(day) = weekday_index(token) {
                    days.insert(day);
                }
            }
        }
    }

    days
}

fn weekday_index(token: &str) -> Option<u8> {
    let name = token.strip_suffix("요일").unwrap_or(token);
    WEEKDAYS.iter().position(|d| *d == name).map(|i| i as u8)
}

/// Inclusive range that wraps past Saturday ("금~월").
fn weekday_range(start: u8, end: u8) -> Vec<u8> {
    let mut out = vec![start];
    let mut day = start;
    while day != end {
        day = (day + 1) % 7;
        out.push(day);
    }
    out
}

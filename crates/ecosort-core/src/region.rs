//! One-screen collection summary for a region.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::josa::get_josa;
use crate::schedule::{parse_day_field, WEEKDAYS};
use crate::types::{Holiday, RuleRecord};

/// Used when a region's rules say nothing about bulky items.
pub const LARGE_WASTE_METHOD: &str = "주민센터 신고 또는 온라인 접수 후 배출";

pub const NORMAL_SERVICE_MESSAGE: &str = "정상 운행 중입니다.";

/// Days, hours and method for one waste stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub days: String,
    pub time: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargeWasteSummary {
    pub days: String,
    pub method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    Normal,
    /// Collection may be shifted (public holiday)
    Delay,
    /// No collection today
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionAlert {
    pub status: AlertStatus,
    pub message: String,
}

impl CollectionAlert {
    pub fn normal() -> Self {
        Self {
            status: AlertStatus::Normal,
            message: NORMAL_SERVICE_MESSAGE.to_string(),
        }
    }
}

/// Streams are `None` when no rule covers the region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    pub region_name: String,
    pub general_waste: Option<StreamSummary>,
    pub food_waste: Option<StreamSummary>,
    pub recycle_waste: Option<StreamSummary>,
    pub large_waste: LargeWasteSummary,
    pub contact: String,
    pub alert: CollectionAlert,
}

impl RegionSummary {
    /// Summarize the first matching rule record.
    pub fn build(region_name: &str, rules: &[RuleRecord], alert: CollectionAlert) -> Self {
        let rule = rules.first();

        let large_waste = LargeWasteSummary {
            days: rule.map(|r| r.large_waste_day.clone()).unwrap_or_default(),
            method: rule
                .map(|r| r.large_waste_method.trim())
                .filter(|m| !m.is_empty())
                .unwrap_or(LARGE_WASTE_METHOD)
                .to_string(),
        };

        Self {
            region_name: region_name.trim().to_string(),
            general_waste: rule.map(|r| {
                stream(&r.general_waste_day, &r.general_waste_time, &r.general_waste_method)
            }),
            food_waste: rule
                .map(|r| stream(&r.food_waste_day, &r.food_waste_time, &r.food_waste_method)),
            recycle_waste: rule.map(|r| stream(&r.recycle_day, &r.recycle_time, &r.recycle_method)),
            large_waste,
            contact: rule.map(|r| r.contact.clone()).unwrap_or_default(),
            alert,
        }
    }
}

fn stream(days: &str, time: &str, note: &str) -> StreamSummary {
    StreamSummary {
        days: days.to_string(),
        time: time.to_string(),
        note: note.to_string(),
    }
}

/// Alert for `today`. A no-collection weekday outranks a holiday.
pub fn collection_alert(
    rules: &[RuleRecord],
    today: NaiveDate,
    holidays: &[Holiday],
) -> CollectionAlert {
    let weekday = today.weekday().num_days_from_sunday() as u8;

    if rules
        .iter()
        .any(|rule| parse_day_field(&rule.no_collection_day).contains(&weekday))
    {
        return CollectionAlert {
            status: AlertStatus::Stop,
            message: format!(
                "오늘({}요일)은 수거하지 않는 날이에요.",
                WEEKDAYS[weekday as usize]
            ),
        };
    }

    if let Some(holiday) = holidays.iter().find(|h| h.is_holiday && h.date == today) {
        return CollectionAlert {
            status: AlertStatus::Delay,
            message: format!(
                "오늘은 {}{} 수거 일정이 바뀔 수 있어요.",
                holiday.name,
                get_josa(&holiday.name, "이라/라")
            ),
        };
    }

    CollectionAlert::normal()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jongno() -> RuleRecord {
        RuleRecord {
            sido: "서울특별시".into(),
            sigungu: "종로구".into(),
            general_waste_day: "일,화,목".into(),
            general_waste_time: "18:00~24:00".into(),
            general_waste_method: "종량제봉투에 담아 배출".into(),
            recycle_day: "일,화,목".into(),
            large_waste_day: "화,금".into(),
            no_collection_day: "토요일".into(),
            contact: "02-2148-2384".into(),
            ..Default::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_summary_from_rule() {
        let summary = RegionSummary::build("서울 종로구", &[jongno()], CollectionAlert::normal());

        assert_eq!(summary.region_name, "서울 종로구");
        let general = summary.general_waste.unwrap();
        assert_eq!(general.days, "일,화,목");
        assert_eq!(general.time, "18:00~24:00");
        assert_eq!(general.note, "종량제봉투에 담아 배출");
        assert_eq!(summary.large_waste.days, "화,금");
        assert_eq!(summary.large_waste.method, LARGE_WASTE_METHOD);
        assert_eq!(summary.contact, "02-2148-2384");
    }

    #[test]
    fn test_summary_without_rules() {
        let summary = RegionSummary::build("어딘가", &[], CollectionAlert::normal());
        assert!(summary.general_waste.is_none());
        assert!(summary.recycle_waste.is_none());
        assert_eq!(summary.large_waste.days, "");
        assert_eq!(summary.alert.status, AlertStatus::Normal);
    }

    #[test]
    fn test_alert_priorities() {
        let rules = [jongno()];
        let children_day = Holiday {
            date: date(2025, 5, 5),
            name: "어린이날".into(),
            is_holiday: true,
        };

        // 2025-05-05 is a Monday
        let alert = collection_alert(&rules, date(2025, 5, 5), &[children_day.clone()]);
        assert_eq!(alert.status, AlertStatus::Delay);
        assert_eq!(alert.message, "오늘은 어린이날이라 수거 일정이 바뀔 수 있어요.");

        // Saturday is a no-collection day in Jongno
        let alert = collection_alert(&rules, date(2025, 5, 10), &[]);
        assert_eq!(alert.status, AlertStatus::Stop);
        assert!(alert.message.contains("토요일"));

        let alert = collection_alert(&rules, date(2025, 5, 6), &[children_day]);
        assert_eq!(alert, CollectionAlert::normal());
    }

    #[test]
    fn test_alert_serializes_uppercase() {
        let json = serde_json::to_value(CollectionAlert::normal()).unwrap();
        assert_eq!(json["status"], "NORMAL");
    }
}

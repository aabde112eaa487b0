//! Public holiday gateway (special day information service).

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use ecosort_core::Holiday;

use super::envelope::decode_items;
use super::{log_failure, HolidayGateway, UpstreamClient};

const GATEWAY: &str = "holidays";

/// Holiday item as the portal sends it. `locdate` is `20250301`, either
/// as a number (JSON) or a string (XML).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHoliday {
    locdate: Value,
    date_name: String,
    #[serde(default)]
    is_holiday: String,
}

impl RawHoliday {
    fn into_holiday(self) -> Option<Holiday> {
        let digits = match &self.locdate {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let date = NaiveDate::parse_from_str(&digits, "%Y%m%d").ok()?;
        Some(Holiday {
            date,
            name: self.date_name,
            is_holiday: self.is_holiday == "Y",
        })
    }
}

pub struct HttpHolidayGateway {
    client: Arc<UpstreamClient>,
    endpoint: String,
}

impl HttpHolidayGateway {
    pub fn new(client: Arc<UpstreamClient>, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl HolidayGateway for HttpHolidayGateway {
    async fn fetch(&self, year: i32, month: u32) -> Vec<Holiday> {
        let params = [
            ("solYear", year.to_string()),
            ("solMonth", format!("{:02}", month)),
            ("numOfRows", "100".to_string()),
        ];

        let result = self
            .client
            .get_items(&self.endpoint, &params)
            .await
            .map(|items| decode_items::<RawHoliday>(items, GATEWAY));

        log_failure(GATEWAY, result)
            .into_iter()
            .filter_map(|raw| {
                let locdate = raw.locdate.clone();
                let holiday = raw.into_holiday();
                if holiday.is_none() {
                    tracing::warn!(gateway = GATEWAY, locdate = %locdate, "Unparseable holiday date");
                }
                holiday
            })
            .collect()
    }
}

//! Remote holiday calendar client.
//!
//! Fetches the full-year holiday table from the calendar API. The endpoint
//! is best-effort by contract: HTTP errors, a non-zero `code`, and
//! malformed payloads all collapse to `None` and the caller keeps whatever
//! cache it already has.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;

use super::HolidayInfo;

pub const DEFAULT_API_BASE: &str = "https://timor.tech";

/// Response envelope for `GET /api/holiday/year/{year}`.
#[derive(Debug, Deserialize)]
struct YearResponse {
    code: i32,
    #[serde(default)]
    holiday: HashMap<String, DayEntry>,
}

/// One day entry, keyed by "MM-DD" in the envelope.
///
/// `holiday == false` entries are compensatory workdays (a weekend day
/// designated as working to offset an extended holiday).
#[derive(Debug, Deserialize)]
struct DayEntry {
    holiday: bool,
    #[serde(default)]
    name: String,
}

/// HTTP client for the holiday calendar API.
pub struct HolidayApi {
    base_url: String,
    client: Client,
}

impl HolidayApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    /// Fetch the holiday table for `year`, keyed by "MM-DD".
    ///
    /// Returns `None` on any failure; the caller must not treat that as an
    /// error.
    pub async fn fetch_year(&self, year: i32) -> Option<HashMap<String, HolidayInfo>> {
        let url = format!("{}/api/holiday/year/{}", self.base_url, year);
        let resp: YearResponse = self
            .client
            .get(&url)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?
            .json()
            .await
            .ok()?;

        if resp.code != 0 {
            return None;
        }

        let days = resp
            .holiday
            .into_iter()
            .map(|(month_day, entry)| {
                let info = HolidayInfo {
                    is_holiday: entry.holiday,
                    name: if entry.name.is_empty() {
                        None
                    } else {
                        Some(entry.name)
                    },
                    is_compensatory_workday: !entry.holiday,
                };
                (month_day, info)
            })
            .collect();
        Some(days)
    }
}

impl Default for HolidayApi {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_year_maps_holidays_and_workdays() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/holiday/year/2025")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"code":0,"holiday":{
                    "01-01":{"holiday":true,"name":"元旦","wage":3,"date":"2025-01-01"},
                    "01-26":{"holiday":false,"name":"春节前补班","wage":1,"date":"2025-01-26"}
                }}"#,
            )
            .create_async()
            .await;

        let api = HolidayApi::new(server.url());
        let days = api.fetch_year(2025).await.unwrap();

        let new_year = &days["01-01"];
        assert!(new_year.is_holiday);
        assert!(!new_year.is_compensatory_workday);
        assert_eq!(new_year.name.as_deref(), Some("元旦"));

        let makeup = &days["01-26"];
        assert!(!makeup.is_holiday);
        assert!(makeup.is_compensatory_workday);
    }

    #[tokio::test]
    async fn non_zero_code_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/holiday/year/2025")
            .with_status(200)
            .with_body(r#"{"code":-1,"holiday":{}}"#)
            .create_async()
            .await;

        let api = HolidayApi::new(server.url());
        assert!(api.fetch_year(2025).await.is_none());
    }

    #[tokio::test]
    async fn malformed_payload_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/holiday/year/2025")
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let api = HolidayApi::new(server.url());
        assert!(api.fetch_year(2025).await.is_none());
    }

    #[tokio::test]
    async fn http_error_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/holiday/year/2025")
            .with_status(500)
            .create_async()
            .await;

        let api = HolidayApi::new(server.url());
        assert!(api.fetch_year(2025).await.is_none());
    }
}

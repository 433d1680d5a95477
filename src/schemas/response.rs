use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CacheStatus;

/// `2024-05-01T12:00:00.000Z`, the format clients parse timestamps in.
pub fn iso8601(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub has_cache: bool,
    pub cache_timestamp: Option<String>,
    pub cache_age_seconds: Option<u64>,
    pub refreshing: bool,
    pub ttl: u64,
    pub last_error: Option<String>,
}

impl StatusResponse {
    pub fn new(status: CacheStatus, ttl_secs: u64) -> Self {
        Self {
            has_cache: status.has_entry,
            cache_timestamp: status.created_at.map(iso8601),
            cache_age_seconds: status.age_seconds.map(|age| age.floor() as u64),
            refreshing: status.refresh_in_progress,
            ttl: ttl_secs,
            last_error: status.last_error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub cache_timestamp: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refreshing: Option<bool>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = Some(true);
        self
    }

    pub fn refreshing(mut self) -> Self {
        self.refreshing = Some(true);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamps_use_millisecond_zulu_format() {
        let timestamp = DateTime::from_timestamp_millis(1_714_564_800_123).unwrap();
        assert_eq!(iso8601(timestamp), "2024-05-01T12:00:00.123Z");
    }

    #[test]
    fn status_serializes_camel_case_with_nulls() {
        let status = CacheStatus {
            has_entry: false,
            created_at: None,
            age_seconds: None,
            refresh_in_progress: true,
            last_error: None,
        };

        let body = serde_json::to_value(StatusResponse::new(status, 3600)).unwrap();

        assert_eq!(
            body,
            json!({
                "hasCache": false,
                "cacheTimestamp": null,
                "cacheAgeSeconds": null,
                "refreshing": true,
                "ttl": 3600,
                "lastError": null,
            })
        );
    }

    #[test]
    fn error_body_omits_unset_fields() {
        let body = serde_json::to_value(ErrorResponse::new("Cache file missing").retryable()).unwrap();
        assert_eq!(body, json!({ "error": "Cache file missing", "retryable": true }));
    }
}

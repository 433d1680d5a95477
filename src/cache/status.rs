use chrono::{DateTime, Utc};

/// Point-in-time view of the coordinator, cheap to take.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatus {
    pub has_entry: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub age_seconds: Option<f64>,
    pub refresh_in_progress: bool,
    pub last_error: Option<String>,
}

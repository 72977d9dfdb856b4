use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;
use uuid::Uuid;

/// CRM temperature of a prospect, recomputed from its full event history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrmStatus {
    Cold,
    Warm,
    Hot,
}

impl CrmStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrmStatus::Cold => "cold",
            CrmStatus::Warm => "warm",
            CrmStatus::Hot => "hot",
        }
    }

    /// Unknown values in the store fall back to cold rather than failing
    /// the read path.
    pub fn from_db(value: &str) -> CrmStatus {
        match value {
            "hot" => CrmStatus::Hot,
            "warm" => CrmStatus::Warm,
            _ => CrmStatus::Cold,
        }
    }
}

impl std::fmt::Display for CrmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of telemetry pings the public report page can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Deserialize)]
pub enum EventType {
    #[value(name = "view")]
    #[serde(rename = "view")]
    View,
    #[value(name = "scroll_50")]
    #[serde(rename = "scroll_50")]
    Scroll50,
    #[value(name = "scroll_80")]
    #[serde(rename = "scroll_80")]
    Scroll80,
    #[value(name = "dwell_10s")]
    #[serde(rename = "dwell_10s")]
    Dwell10s,
    #[value(name = "dwell_30s")]
    #[serde(rename = "dwell_30s")]
    Dwell30s,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::View => "view",
            EventType::Scroll50 => "scroll_50",
            EventType::Scroll80 => "scroll_80",
            EventType::Dwell10s => "dwell_10s",
            EventType::Dwell30s => "dwell_30s",
        }
    }

    /// Anything other than a plain page view counts as an interaction.
    pub fn interacted(&self) -> bool {
        !matches!(self, EventType::View)
    }
}

#[derive(Debug, Clone)]
pub struct ProspectRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub company_name: String,
    pub crm_status: CrmStatus,
    pub visit_count: i32,
    pub last_viewed_at: Option<DateTime<Utc>>,
}

/// The slice of a report event that threshold evaluation looks at.
#[derive(Debug, Clone, Default)]
pub struct EngagementSample {
    pub scroll_depth: Option<i32>,
    pub dwell_seconds: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProspectOverview {
    pub company_name: String,
    pub crm_status: CrmStatus,
    pub visit_count: i32,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub event_count: i64,
}

#[derive(Debug, Clone)]
pub struct EventRecord {
    pub company_name: String,
    pub event_type: String,
    pub scroll_depth: Option<i32>,
    pub dwell_seconds: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::database::StoredState;

/// `{ success: false, error }`, used by both cron routes for soft failures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CronFailure {
    pub success: bool,
    pub error: String,
}

impl CronFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSummary {
    pub title: String,
    pub new_episodes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyReport {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub ongoing_dramas_count: usize,
    pub notifications_sent: usize,
    pub notifications: Vec<NotificationSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NotifyResponse {
    Report(NotifyReport),
    Failure(CronFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredStateReport {
    pub success: bool,
    pub state: StoredState,
    pub total_dramas: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyStateReport {
    pub success: bool,
    pub state: StoredState,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StateResponse {
    Stored(StoredStateReport),
    Empty(EmptyStateReport),
    Failure(CronFailure),
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    /// Display number, dense per clinic per day, starting at 1.
    pub ticket_number: i32,
    pub status: QueueStatus,
    pub queued_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Waiting,
    Called,
    InConsultation,
    Completed,
    Skipped,
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueStatus::Waiting => write!(f, "waiting"),
            QueueStatus::Called => write!(f, "called"),
            QueueStatus::InConsultation => write!(f, "in_consultation"),
            QueueStatus::Completed => write!(f, "completed"),
            QueueStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQueueStatusRequest {
    pub status: QueueStatus,
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue entry not found")]
    NotFound,

    #[error("The queue is empty")]
    Empty,

    #[error("Queue transition from {from} to {to} is not allowed")]
    InvalidTransition { from: QueueStatus, to: QueueStatus },

    #[error("Database error: {0}")]
    Database(String),
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationSession {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub queue_entry_id: Option<Uuid>,
    pub practitioner_name: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub presenting_complaint: Option<String>,
    pub notes: Option<String>,
    /// AI-tidied copy of notes; the raw text is never overwritten.
    pub cleaned_notes: Option<String>,
    pub diagnosis: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::InProgress => write!(f, "in_progress"),
            SessionStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub queue_entry_id: Option<Uuid>,
    pub practitioner_name: String,
    pub presenting_complaint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNotesRequest {
    pub notes: Option<String>,
    pub presenting_complaint: Option<String>,
    pub diagnosis: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionListQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<SessionStatus>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesCleanupResponse {
    pub session_id: Uuid,
    pub original_notes: String,
    pub cleaned_notes: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConsultationError {
    #[error("Consultation session not found")]
    NotFound,

    #[error("Session is already completed")]
    AlreadyCompleted,

    #[error("Session has no notes to clean up")]
    NoNotes,

    #[error("Database error: {0}")]
    Database(String),
}

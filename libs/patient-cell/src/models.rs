use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub national_id: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub allergies: Option<String>,
    pub medical_notes: Option<String>,
    /// Third-party payer this patient bills through, if any.
    pub panel_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age(&self) -> i32 {
        let today = chrono::Utc::now().date_naive();
        today.years_since(self.date_of_birth).unwrap_or(0) as i32
    }

    pub fn is_panel_patient(&self) -> bool {
        self.panel_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub national_id: Option<String>,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub allergies: Option<String>,
    pub medical_notes: Option<String>,
    pub panel_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub allergies: Option<String>,
    pub medical_notes: Option<String>,
    pub panel_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSearchQuery {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

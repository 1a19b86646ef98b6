use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::Appointment;

/// Detects overlapping bookings for one practitioner. Cancelled and
/// no-show appointments do not block a slot.
pub struct ConflictDetectionService;

impl ConflictDetectionService {
    pub async fn find_overlap(
        supabase: &SupabaseClient,
        clinic_id: Uuid,
        practitioner_name: &str,
        start: DateTime<Utc>,
        duration_minutes: i32,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Option<Appointment>> {
        let end = start + Duration::minutes(duration_minutes as i64);

        // Fetch the practitioner's active bookings around the window; the
        // precise overlap check happens in code.
        let day_start = start - Duration::hours(24);
        let day_end = end + Duration::hours(24);

        let path = format!(
            "/rest/v1/appointments?clinic_id=eq.{}&practitioner_name=eq.{}\
             &status=not.in.(cancelled,no_show)\
             &scheduled_start=gte.{}&scheduled_start=lte.{}",
            clinic_id,
            urlencoding::encode(practitioner_name),
            day_start.to_rfc3339(),
            day_end.to_rfc3339()
        );

        let result: Vec<Value> = supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let appointments: Vec<Appointment> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        for existing in appointments {
            if Some(existing.id) == exclude_appointment_id {
                continue;
            }
            if Self::overlaps(start, end, existing.scheduled_start, existing.scheduled_end()) {
                debug!(
                    "Booking conflict: requested [{} - {}] overlaps appointment {}",
                    start, end, existing.id
                );
                return Ok(Some(existing));
            }
        }

        Ok(None)
    }

    /// Half-open interval overlap: back-to-back bookings are allowed.
    pub fn overlaps(
        a_start: DateTime<Utc>,
        a_end: DateTime<Utc>,
        b_start: DateTime<Utc>,
        b_end: DateTime<Utc>,
    ) -> bool {
        a_start < b_end && b_start < a_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 2, hour, minute, 0).unwrap()
    }

    #[test]
    fn detects_partial_overlap() {
        assert!(ConflictDetectionService::overlaps(
            at(10, 0),
            at(10, 30),
            at(10, 15),
            at(10, 45)
        ));
    }

    #[test]
    fn detects_containment() {
        assert!(ConflictDetectionService::overlaps(
            at(10, 0),
            at(11, 0),
            at(10, 15),
            at(10, 30)
        ));
    }

    #[test]
    fn back_to_back_is_not_a_conflict() {
        assert!(!ConflictDetectionService::overlaps(
            at(10, 0),
            at(10, 30),
            at(10, 30),
            at(11, 0)
        ));
    }
}

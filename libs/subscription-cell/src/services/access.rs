use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AccessDecision, Subscription, SubscriptionStatus};

/// The subscription gate. Trialing and active tenants pass; a tenant
/// whose payment failed keeps access through the grace window; canceled
/// tenants keep access to the end of the period they paid for.
pub fn evaluate_access(
    subscription: Option<&Subscription>,
    now: DateTime<Utc>,
    grace_days: i64,
) -> AccessDecision {
    let Some(subscription) = subscription else {
        return AccessDecision {
            allowed: false,
            reason: "No subscription on record".to_string(),
            grace_expires_at: None,
        };
    };

    match subscription.status {
        SubscriptionStatus::Trialing => AccessDecision {
            allowed: true,
            reason: "Trial in progress".to_string(),
            grace_expires_at: None,
        },
        SubscriptionStatus::Active => AccessDecision {
            allowed: true,
            reason: "Subscription active".to_string(),
            grace_expires_at: None,
        },
        SubscriptionStatus::PastDue => {
            let grace_expires_at = subscription
                .current_period_end
                .map(|end| end + Duration::days(grace_days));

            match grace_expires_at {
                Some(expiry) if now < expiry => AccessDecision {
                    allowed: true,
                    reason: "Payment failed, within grace period".to_string(),
                    grace_expires_at,
                },
                Some(_) => AccessDecision {
                    allowed: false,
                    reason: "Grace period expired".to_string(),
                    grace_expires_at,
                },
                // No period end on record: nothing anchors a grace window.
                None => AccessDecision {
                    allowed: false,
                    reason: "Payment failed".to_string(),
                    grace_expires_at: None,
                },
            }
        }
        SubscriptionStatus::Canceled => {
            let still_paid = subscription
                .current_period_end
                .map(|end| now < end)
                .unwrap_or(false);

            AccessDecision {
                allowed: still_paid,
                reason: if still_paid {
                    "Canceled, paid period still running".to_string()
                } else {
                    "Subscription canceled".to_string()
                },
                grace_expires_at: None,
            }
        }
        SubscriptionStatus::Unpaid => AccessDecision {
            allowed: false,
            reason: "Subscription unpaid".to_string(),
            grace_expires_at: None,
        },
    }
}

pub struct SubscriptionService {
    supabase: SupabaseClient,
    grace_days: i64,
}

impl SubscriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            grace_days: config.subscription_grace_days,
        }
    }

    pub async fn get_subscription(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Subscription>> {
        let path = format!("/rest/v1/subscriptions?clinic_id=eq.{}", clinic_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if result.is_empty() {
            return Ok(None);
        }

        let subscription: Subscription = serde_json::from_value(result[0].clone())?;
        Ok(Some(subscription))
    }

    pub async fn access_decision(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<(Option<Subscription>, AccessDecision)> {
        let subscription = self.get_subscription(clinic_id, auth_token).await?;
        let decision = evaluate_access(subscription.as_ref(), Utc::now(), self.grace_days);

        debug!(
            "Access decision for clinic {}: allowed={} ({})",
            clinic_id, decision.allowed, decision.reason
        );

        Ok((subscription, decision))
    }

    pub async fn require_customer_id(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<String> {
        let subscription = self
            .get_subscription(clinic_id, auth_token)
            .await?
            .ok_or_else(|| anyhow!("No subscription on record for clinic {}", clinic_id))?;

        subscription
            .stripe_customer_id
            .ok_or_else(|| anyhow!("Subscription has no Stripe customer attached"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn subscription(
        status: SubscriptionStatus,
        current_period_end: Option<DateTime<Utc>>,
    ) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            stripe_customer_id: Some("cus_test".to_string()),
            stripe_subscription_id: Some("sub_test".to_string()),
            status,
            plan: "standard".to_string(),
            current_period_end,
            cancel_at_period_end: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn active_and_trialing_pass() {
        for status in [SubscriptionStatus::Active, SubscriptionStatus::Trialing] {
            let sub = subscription(status, Some(day(30)));
            assert!(evaluate_access(Some(&sub), day(1), 7).allowed);
        }
    }

    #[test]
    fn missing_subscription_is_denied() {
        assert!(!evaluate_access(None, day(1), 7).allowed);
    }

    #[test]
    fn past_due_passes_inside_the_grace_window() {
        let sub = subscription(SubscriptionStatus::PastDue, Some(day(10)));

        let within = evaluate_access(Some(&sub), day(14), 7);
        assert!(within.allowed);
        assert_eq!(within.grace_expires_at, Some(day(17)));

        let beyond = evaluate_access(Some(&sub), day(18), 7);
        assert!(!beyond.allowed);
        assert_eq!(beyond.grace_expires_at, Some(day(17)));
    }

    #[test]
    fn past_due_without_a_period_end_is_denied() {
        let sub = subscription(SubscriptionStatus::PastDue, None);
        assert!(!evaluate_access(Some(&sub), day(1), 7).allowed);
    }

    #[test]
    fn canceled_keeps_access_until_period_end() {
        let sub = subscription(SubscriptionStatus::Canceled, Some(day(20)));

        assert!(evaluate_access(Some(&sub), day(15), 7).allowed);
        assert!(!evaluate_access(Some(&sub), day(21), 7).allowed);
    }

    #[test]
    fn unpaid_is_denied_outright() {
        let sub = subscription(SubscriptionStatus::Unpaid, Some(day(30)));
        assert!(!evaluate_access(Some(&sub), day(1), 7).allowed);
    }
}

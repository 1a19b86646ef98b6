pub mod access;
pub mod stripe;
pub mod webhook;

pub use access::{evaluate_access, SubscriptionService};
pub use stripe::StripeClient;
pub use webhook::WebhookService;

pub mod clinic;
pub mod subdomain;

pub use clinic::ClinicService;
pub use subdomain::SubdomainService;

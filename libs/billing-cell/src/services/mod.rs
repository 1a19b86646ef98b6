pub mod claims;
pub mod invoice;
pub mod panel;

pub use claims::ClaimService;
pub use invoice::InvoiceService;
pub use panel::PanelService;

pub mod repository;
pub mod service;

pub use repository::{ConsentRepository, SqliteConsentRepository};
pub use service::{ConsentDetails, ConsentReceipt, ConsentService, ConsentSubmission};

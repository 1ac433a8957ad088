pub mod kind;
pub mod repository;
pub mod service;
pub mod stats;
pub mod validation;

pub use kind::{Kind, KindDescriptor};
pub use repository::{ObservationRepository, SqliteObservationRepository};
pub use service::ObservationService;
pub use stats::Stats;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::consent::{ConsentService, SqliteConsentRepository};
use crate::observations::{ObservationService, SqliteObservationRepository};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub observations: ObservationService,
    pub consents: ConsentService,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let observations =
            ObservationService::new(Arc::new(SqliteObservationRepository::new(db.clone())));
        let consents = ConsentService::new(Arc::new(SqliteConsentRepository::new(db)));

        Self {
            config,
            observations,
            consents,
        }
    }
}

// Library exports for the sightings service
// This allows integration tests and external code to use its modules

pub mod config;
pub mod consent;
pub mod db;
pub mod error;
pub mod extractors;
pub mod observations;
pub mod routes;
pub mod state;

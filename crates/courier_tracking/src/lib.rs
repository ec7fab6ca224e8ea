pub mod access;
pub mod broadcaster;
pub mod clock;
pub mod config;
mod delivery_locks;
pub mod error;
pub mod eta_engine;
pub mod events;
pub mod features;
pub mod geo_math;
pub mod geopoint;
pub mod ids;
pub mod ingest_coordinator;
pub mod kmh;
pub mod location_fix;
pub mod location_store;
pub mod meters;
pub mod route;
pub mod route_registry;
pub mod session_aggregator;
pub mod tracking_session;

#[cfg(test)]
pub(crate) mod test_utils;

pub mod configuration;
pub mod domain;
pub mod errors;
pub mod models;
pub mod payments;
pub mod routes;
pub mod services;
pub mod startup;
pub mod store;
pub mod telemetry;

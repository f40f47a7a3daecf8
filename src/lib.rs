pub mod calendar;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod ports;
pub mod store;

pub mod config;
pub mod problem;
pub mod session;
pub mod snapshot;

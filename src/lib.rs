//! Email-keyed user accounts with registration and bearer token issuance.

pub mod app;
pub mod config;
pub mod state;
pub mod user;

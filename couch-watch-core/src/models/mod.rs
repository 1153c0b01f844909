pub mod capture;
pub mod config;
pub mod error;
pub mod escalation;
pub mod frame;
pub mod intent;

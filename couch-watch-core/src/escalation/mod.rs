pub mod alarm;
pub mod command_port;
pub mod evaluate;
pub mod orchestrator;
pub mod runner;

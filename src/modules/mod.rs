pub mod backend;
pub mod classifier;
pub mod cleaner;
pub mod common;
pub mod config;
pub mod orchestrator;
pub mod reporter;
pub mod scanner;
pub mod simulator;

pub mod commands;
pub mod modules;

pub use modules::common::error::CleanupError;
pub use modules::common::utils;
pub use modules::backend;
pub use modules::classifier;
pub use modules::cleaner;
pub use modules::orchestrator;
pub use modules::reporter;
pub use modules::scanner;
pub use modules::simulator;

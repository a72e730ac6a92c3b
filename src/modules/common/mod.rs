pub mod cancel;
pub mod error;
pub mod logging;
pub mod utils;

pub mod config;
pub mod constants;
pub mod error;

pub use config::{NumberFormat, WireConfig};
pub use error::{Error, Result};

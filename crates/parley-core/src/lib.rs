pub mod config;
pub mod error;
pub mod naming;
pub mod types;

pub use config::ParleyConfig;
pub use error::{ParleyError, Result};
pub use types::*;

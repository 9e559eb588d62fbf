//! # cachelab-core
//!
//! Shared plumbing for the cachelab workspace.
//!
//! This crate provides:
//! - [`LabError`] - Errors for configuration, file, and logging setup
//! - [`logging`] - Tracing setup and log file locations
//!
//! ## Example
//!
//! ```no_run
//! use cachelab_core::{LabError, logging};
//!
//! fn main() -> cachelab_core::Result<()> {
//!     let _guard = logging::init_logging(None, false)?;
//!
//!     let pricing_path = std::path::Path::new("pricing.yaml");
//!     if !pricing_path.exists() {
//!         return Err(LabError::config_not_found(pricing_path));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

pub use error::{LabError, Result};
pub use logging::{LogGuard, init_logging};

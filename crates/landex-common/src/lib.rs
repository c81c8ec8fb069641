//! Landex Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared infrastructure for the Landex workspace.
//!
//! Currently this is the centralized logging setup used by every Landex
//! binary: a [`logging::LogConfig`] describing level, target and format,
//! and [`logging::init_logging`] which installs the global tracing
//! subscriber once at startup.
//!
//! # Example
//!
//! ```no_run
//! use landex_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     tracing::info!("starting up");
//!     Ok(())
//! }
//! ```

pub mod logging;

//! Sift: streaming answers for agent-backed search
//!
//! Opens a server-sent event stream for one query at a time, decodes the
//! small message protocol carried over it, accumulates partial text and tool
//! invocations into snapshots, and notifies the caller after every frame.
//! Starting a new query cleanly supersedes the previous one.
//!
//! # Quick Start
//!
//! ```no_run
//! use sift::prelude::*;
//!
//! # async fn example() -> sift::error::Result<()> {
//! let controller = SessionController::from_config(&SiftConfig::load()?)?;
//! let handle = controller.start("Champions Trophy 2025 results");
//! let status = handle.wait().await;
//! println!("{}", status.snapshot.text);
//! # Ok(())
//! # }
//! ```

pub mod accumulator;
pub mod config;
pub mod error;
pub mod http;
pub mod prelude;
pub mod protocol;
pub mod session;
pub mod storage;
pub mod transport;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

//! Streaming sessions.
//!
//! A [`SessionController`] turns a query into a live event stream, decodes
//! each frame, folds it into a [`ResponseSnapshot`](crate::types::ResponseSnapshot)
//! and notifies a registered observer after every accepted frame.
//!
//! ```no_run
//! use sift::config::SiftConfig;
//! use sift::session::{channel_observer, SessionController};
//! use futures::StreamExt;
//!
//! # async fn example() -> sift::error::Result<()> {
//! let (observer, mut notifications) = channel_observer();
//! let controller = SessionController::from_config(&SiftConfig::load()?)?
//!     .with_observer(observer);
//!
//! controller.start("best pubs in Dublin");
//! while let Some(update) = notifications.next().await {
//!     println!("{}", update.snapshot.text);
//!     if update.state.is_final() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod events;
pub mod supervisor;

pub use controller::{connection_error_message, SessionController, SessionHandle};
pub use events::{channel_observer, Notice, SessionNotification, SessionObserver};
pub use supervisor::{ConnectivitySupervisor, Reachability};

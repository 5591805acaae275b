//! Coalesce bursts of triggers into a single delayed action.
//!
//! A [`Debouncer`] accepts tasks together with a delay. Every new task replaces the one
//! scheduled before it, unless that one already started, so only the last task of a burst runs
//! once things calmed down for the duration of the delay.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! let debouncer = lull::Debouncer::new()?;
//! for _ in 0..10 {
//!     debouncer.debounce(|| Ok(println!("rebuilding")), Duration::from_millis(100))?;
//! }
//! # Ok::<(), lull::DebounceError>(())
//! ```
#![deny(clippy::unwrap_used)]

pub mod config;

mod debouncer;
mod error;
mod handle;
mod worker;

pub use config::DebouncerConfig;
pub use debouncer::Debouncer;
pub use error::{DebounceError, TaskError};
pub use handle::{Outcome, TaskHandle, TaskId, TaskState};

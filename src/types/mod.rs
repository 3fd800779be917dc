//! Core types for the timer queue.
//!
//! - [`id`]: Identifier and timestamp types (`TimerId`, `Time`)

pub mod id;

pub use id::{Time, TimerId};

//! `encore`: a music player core that resumes exactly where you left off.
//!
//! The crate holds the playlist model and play-order policy, the bounded play
//! history, the player engine state machine and the persistence that carries
//! all of it across restarts. The `encore` binary drives it from a terminal.

pub mod audio;
pub mod config;
pub mod error;
pub mod keybinds;
pub mod library;
pub mod storage;

pub use error::{PlayerError, Result};

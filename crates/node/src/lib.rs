//! yz-node: the simulation driver of the yz overlay.
//!
//! - [config] loads and stores the YAML config of a simulation.
//! - [logging] installs the tracing subscriber and the panic hook.
//! - [simulation] grows an overlay, builds chords, injects failures and
//!   reports what the overlay did with the messages it was given.
pub mod config;
pub mod error;
pub mod logging;
pub mod simulation;
pub mod util;

pub use yz_core;

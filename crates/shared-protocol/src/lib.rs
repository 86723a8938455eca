//! Shared definitions for the NVRTSP streaming pipeline
//!
//! This crate contains the packet, codec and configuration types shared
//! by the encoder, the transport and the stream controller, plus the
//! clock helpers that convert capture timestamps between timebases.

mod config;
mod error;
mod packets;
mod time;

pub use config::*;
pub use error::*;
pub use packets::*;
pub use time::*;

/// Timebase of the outbound video track (90 kHz)
pub const TRANSPORT_CLOCK_RATE: i64 = 90_000;

//! Conductor - control plane for long-running external operations.
//!
//! Commands are submitted idempotently, executed strictly one at a time
//! against registered handlers, and observed through a cursor-addressable
//! telemetry stream with filtered, replayable delivery.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

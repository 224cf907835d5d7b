//! Broadcast fan-out
//!
//! [`BroadcastSink`] is the last stage of the pipeline: every chunk it
//! receives is written to every registered listener, and listeners whose
//! stream has closed are dropped from the registry on the way.

pub mod sink;

pub use sink::BroadcastSink;

//! Throttled broadcast pipeline
//!
//! ```text
//!   [File] ──read──► [Throttle] ──chunk──► [BroadcastSink] ──► listeners
//!                      sleeps until
//!                      start + sent / rate
//! ```
//!
//! The pipeline runs as one tokio task. Reading, pacing and fan-out happen in
//! the same loop, so the end of any stage ends the whole chain and releases
//! the file. Stopping is a single cancellation token checked at every
//! suspension point.

pub mod run;
pub mod throttle;

pub use run::{PipelineExit, PipelineHandle, ThrottledPipeline};
pub use throttle::Throttle;

//! Processing Pipeline Module
//!
//! ```text
//! LineSource ──reader task──► mpsc ──try_recv──► ProcessingLoop (tick)
//!                                                   │
//!                                                   ▼
//!                                             MonitorSession
//!     decode → SignalChain → SeriesLog → WarmupGate → WindowedSeries → LiveRateTracker
//!                                                   │
//!                                                   ▼
//!                                        watch<LiveSnapshot> → display API
//! ```
//!
//! All pipeline state is owned by the session and mutated only by the tick
//! loop. Nothing is shared, so nothing is locked.

mod session;
mod signal_chain;
mod window;
pub mod processing_loop;
pub mod source;

pub use processing_loop::ProcessingLoop;
pub use session::{
    LineOutcome, LiveRateTracker, MonitorSession, SessionClock, SessionStats, TickReport,
};
pub use signal_chain::{ChainOutput, SignalChain};
pub use source::{acquire_source, spawn_reader, InputChannel, LineEvent, LineSource};
pub use window::{clip_points, WarmupGate, WindowedSeries};

//! Ports - 抽象化レイヤー
//!
//! The scheduler and the supervisor only talk to the outside world through
//! these traits: the filesystem for artifact existence, the event sink for
//! status output, the clock for regeneration intervals, and the caller's
//! regeneration callback.

pub mod artifact_store;
pub mod clock;
pub mod event_sink;
pub mod regenerator;

pub use self::artifact_store::ArtifactStore;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::regenerator::Regenerator;

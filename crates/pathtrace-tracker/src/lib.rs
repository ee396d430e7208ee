pub mod config;
pub mod filter;
pub mod format;
pub mod sink;
pub mod tracker;

pub use config::{Format, TrackerConfig};
pub use format::{write_choices, ChoiceLines, RenderedLine};
pub use sink::{OwnedSink, SinkTarget, TraceSink};
pub use tracker::ChoiceTracker;

//! Operation facade over the tracker core and its storage.

mod error;
mod sink;
mod tracker;

pub use error::ServiceError;
pub use sink::{EventSink, LogSink};
pub use tracker::Tracker;

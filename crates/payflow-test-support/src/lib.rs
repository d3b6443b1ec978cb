//! Shared test mocks and utilities for the payflow services.

mod clock;
mod publisher;

pub use clock::FixedClock;
pub use publisher::{FailingPublisher, RecordingPublisher};

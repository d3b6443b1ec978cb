//! Payflow Event Store — envelope persistence alongside the aggregate tables.
//!
//! The `event_stream` table records every published envelope per aggregate.
//! It is written through [`publisher::StoringPublisher`] but never read for
//! behaviour; the per-aggregate tables stay authoritative. A future replay
//! capability can rebuild state from the stream.

pub mod pg_event_stream;
pub mod publisher;
pub mod stream;

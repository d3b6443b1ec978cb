//! Payflow Transport — the at-least-once event plane.
//!
//! A [`queue::TopicClient`] fans published events out to bound queues; a
//! [`queue::QueueClient`] is the receive side. [`publisher::FanoutPublisher`]
//! batches events onto the topic, and [`subscriber::QueueSubscriber`] runs
//! the reader/worker/cleaner pipeline that feeds an `EventHandler`.
//!
//! The broker itself is deployment wiring; [`memory::InMemoryBroker`]
//! implements both client traits in-process with real visibility-timeout
//! bookkeeping and backs local development and the integration tests.

pub mod memory;
pub mod publisher;
pub mod queue;
pub mod subscriber;

//! Accelerator arbitration and the serialized job queue.
//!
//! Requests enter through [`dispatcher::Dispatcher`] (safety gate, quota
//! ledger, enqueue). A single [`worker::DispatchWorker`] drains the
//! [`queue`] in order, asks the [`arbiter::ResourceArbiter`] to make the
//! right model family resident, runs the backend, and hands the outcome
//! to the job's [`sink::ResponseSink`].

pub mod arbiter;
pub mod backend;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod events;
pub mod job;
pub mod ledger;
pub mod queue;
pub mod render;
pub mod sink;
pub mod store;
pub mod worker;

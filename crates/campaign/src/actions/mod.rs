//! Subscriber, list and campaign actions
//!
//! Mutations built on the remote service, the list cache and the resume
//! engine.

mod handler;

pub use handler::ActionHandler;

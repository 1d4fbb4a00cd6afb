//! Remote mailing service contract and implementations
//!
//! The engine only talks to the remote service through [`MailingService`].
//! The Listmonk HTTP client is the production implementation; the
//! in-memory one backs tests and dry runs.

mod filter;
mod memory;
mod traits;

pub use filter::{Condition, SubscriberFilter};
pub use memory::{BulkUpdate, InMemoryMailingService, Operation};
pub use traits::MailingService;

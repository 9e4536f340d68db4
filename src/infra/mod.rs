//! Queue and handoff building blocks shared by the scheduler and its items.

pub mod mailbox;
pub(crate) mod queue;

pub use mailbox::{ChangeTracker, Handoff};

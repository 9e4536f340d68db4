//! Single-slot result handoff between a builder thread and the applier.

pub mod handoff;

pub use handoff::{ChangeTracker, Handoff};

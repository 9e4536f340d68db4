//! # Build Scheduler
//!
//! A priority-ordered, pausable, cancelable background build scheduler with an
//! explicit two-phase build/apply protocol.
//!
//! Expensive work (mesh generation, LOD baking, anything that would stall a
//! frame) runs on a fixed pool of worker threads. Results are handed back to a
//! single consumer thread, usually the render loop, which applies a bounded
//! number of them per tick.
//!
//! ## Core Problem Solved
//!
//! Interactive tools rebuild the same things over and over while the user
//! drags sliders:
//!
//! - **Coalescing**: a rebuild requested while one is queued is a no-op; one
//!   requested while a build is running is honored once that build is applied
//! - **Thread affinity**: `build` runs on a worker, `apply` and `release` only
//!   ever run on the thread that calls `drain`
//! - **Cancellation**: an item dropped before it started never builds; one
//!   dropped mid-build gets exactly one `release` and no `apply`
//! - **Pausing**: a hidden editor can stop scheduling new work without losing
//!   what was queued
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use build_scheduler::config::SchedulerConfig;
//! use build_scheduler::core::{ItemRef, WorkScheduler};
//!
//! let scheduler = WorkScheduler::new(
//!     SchedulerConfig::new()
//!         .with_name("trees")
//!         .with_pool_size(4),
//! )?;
//!
//! let tree: ItemRef = Arc::new(my_tree_item);
//! scheduler.submit(&tree)?;
//!
//! // Once per frame, on the render thread:
//! let backlog = scheduler.drain(10)?;
//! ```
//!
//! For host loops with enable/disable lifecycles, see
//! [`runtime::FrameDriver`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and the build/apply state machine.
pub mod core;
/// Configuration models for scheduler instances.
pub mod config;
/// Queue and handoff building blocks shared by the scheduler and its items.
pub mod infra;
/// Host frame-loop adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;

//! The capability set callers implement to have work scheduled.

use std::sync::Arc;

use super::AppResult;

/// A unit of background-computable work with an apply/release contract.
///
/// The scheduler never looks inside an item. It only reads its priority and
/// sequences the three callbacks:
///
/// - [`build`](WorkItem::build) runs on a worker thread and must not touch
///   resources owned by the consumer thread.
/// - [`apply`](WorkItem::apply) runs on the thread calling
///   [`WorkScheduler::drain`](crate::core::WorkScheduler::drain) and may assume
///   exclusive access to whatever `build` produced. It is also called after a
///   failed build, so it has to tolerate finding nothing new.
/// - [`release`](WorkItem::release) runs on the draining thread when the item
///   is discarded. It may follow a partial build or no build at all.
///
/// All methods take `&self`; items publish build results through interior
/// mutability, typically a [`Handoff`](crate::infra::Handoff).
///
/// # Example
///
/// ```rust,ignore
/// use build_scheduler::core::{AppResult, WorkItem};
/// use build_scheduler::infra::{ChangeTracker, Handoff};
///
/// struct TreeMesh {
///     changes: ChangeTracker,
///     pending: Handoff<Vec<LevelGeometry>>,
/// }
///
/// impl WorkItem for TreeMesh {
///     fn priority(&self) -> i32 {
///         0
///     }
///
///     fn build(&self) -> AppResult<()> {
///         if self.changes.take_changes() == 0 {
///             return Ok(());
///         }
///         self.pending.publish(generate_levels()?);
///         Ok(())
///     }
///
///     fn apply(&self) {
///         if let Some(levels) = self.pending.take() {
///             attach(levels);
///         }
///     }
///
///     fn release(&self) {
///         detach_all();
///     }
/// }
/// ```
pub trait WorkItem: Send + Sync + 'static {
    /// Scheduling key; lower values are built and applied sooner.
    ///
    /// Read when the item is enqueued and again when a paused scheduler
    /// resumes. Must be cheap and free of side effects.
    fn priority(&self) -> i32;

    /// Compute the item's result on a worker thread.
    ///
    /// Errors are logged by the scheduler and otherwise ignored: the item
    /// still completes and `apply` is still called.
    ///
    /// # Errors
    ///
    /// Any failure the item wants logged against its build.
    fn build(&self) -> AppResult<()>;

    /// Install the result of the last build on the draining thread.
    fn apply(&self);

    /// Tear the item down on the draining thread.
    fn release(&self);
}

/// Shared handle to a work item. One allocation is one scheduling slot.
pub type ItemRef = Arc<dyn WorkItem>;

/// Identity of a work item, taken from its allocation address.
///
/// The scheduler keeps a clone of the `Arc` for as long as the key is in use,
/// so the address cannot be recycled under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ItemKey(usize);

impl ItemKey {
    pub(crate) fn of(item: &ItemRef) -> Self {
        Self(Arc::as_ptr(item).cast::<()>() as usize)
    }
}

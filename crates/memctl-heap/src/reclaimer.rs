//! The reclamation service seen from the control surface.

use crate::state::GcState;
use crate::stats::HeapInfo;

/// A memory reclaimer the control surface can drive and inspect.
///
/// The collection algorithm itself is opaque. Implementations consult
/// [`GcState::should_auto_collect`] for their own automatic triggering and
/// report live counters through [`Reclaimer::info`].
pub trait Reclaimer {
    /// Run a full collection now, regardless of the automatic switch.
    ///
    /// Returns the number of blocks reclaimed.
    fn collect(&mut self, state: &GcState) -> usize;

    /// Current heap counters.
    fn info(&self) -> HeapInfo;
}

//! ID types for effects and drawing surfaces.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for drawing-surface IDs.
static TARGET_COUNTER: AtomicU64 = AtomicU64::new(1);

new_key_type! {
    /// Stable handle to an effect, backed by a generational slot map.
    ///
    /// A handle to a released effect never resolves to a later effect that
    /// reused its slot.
    pub struct EffectId;
}

/// Identity of a drawing surface, used to detect when a renderer is
/// pointed at a different target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(u64);

impl TargetId {
    /// Creates a new unique target ID.
    #[must_use]
    pub fn new() -> Self {
        Self(TARGET_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

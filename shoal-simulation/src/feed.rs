//! Render-facing snapshot handle.

use shoal_core::Transform;
use std::sync::{Arc, Mutex, PoisonError};

/// Handle to the most recently published tick.
///
/// Publish swaps in a freshly copied buffer, so a reader either sees the
/// whole previous tick or the whole new one, never an interleaving. Readers
/// clone the inner `Arc` and may treat the snapshot as immutable for as long
/// as they hold it.
#[derive(Debug, Clone)]
pub struct RenderFeed {
    latest: Arc<Mutex<Arc<Vec<Transform>>>>,
}

impl RenderFeed {
    pub(crate) fn new(initial: &[Transform]) -> Self {
        Self {
            latest: Arc::new(Mutex::new(Arc::new(initial.to_vec()))),
        }
    }

    pub(crate) fn publish(&self, transforms: &[Transform]) {
        let snapshot = Arc::new(transforms.to_vec());
        let mut guard = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = snapshot;
    }

    /// Latest published transforms, frame-stable for the caller.
    pub fn snapshot(&self) -> Arc<Vec<Transform>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

//! The active-LUT slot shared between the loader and the frame loop.

use std::sync::Arc;

use dichroma_core::ColorLut;
use parking_lot::RwLock;

/// Holds the table every new frame is transformed with.
///
/// Readers clone the inner `Arc` once per frame, so a table swap never
/// tears a frame: a frame in flight finishes with the table it started with.
#[derive(Clone)]
pub struct LutSlot {
    inner: Arc<RwLock<Arc<ColorLut>>>,
}

impl LutSlot {
    pub fn new(lut: ColorLut) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(lut))),
        }
    }

    /// The table currently in effect.
    pub fn current(&self) -> Arc<ColorLut> {
        self.inner.read().clone()
    }

    /// Make `lut` the active table and return the one it replaced.
    pub fn publish(&self, lut: Arc<ColorLut>) -> Arc<ColorLut> {
        std::mem::replace(&mut *self.inner.write(), lut)
    }
}

impl Default for LutSlot {
    fn default() -> Self {
        Self::new(ColorLut::identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dichroma_core::LutResolution;

    #[test]
    fn test_default_slot_holds_identity() {
        assert!(LutSlot::default().current().is_identity());
    }

    #[test]
    fn test_publish_is_visible_to_clones() {
        let slot = LutSlot::default();
        let reader = slot.clone();
        let held = reader.current();

        let gray = ColorLut::from_fn("Gray", LutResolution::Quantized, |_| [128; 3]);
        let previous = slot.publish(Arc::new(gray));

        assert!(previous.is_identity());
        assert_eq!(reader.current().name(), "Gray");
        // A table already handed out is unaffected by the swap.
        assert!(held.is_identity());
    }
}

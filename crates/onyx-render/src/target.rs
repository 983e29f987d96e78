//! Presentation targets and view masks.

use bitflags::bitflags;

bitflags! {
    /// Set of presentation targets a context or light is routed to.
    ///
    /// Each target owns one bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ViewMask: u64 {
        const NONE = 0;
        const ALL = u64::MAX;
    }
}

impl ViewMask {
    /// Mask with only bit `index` set.
    pub const fn bit(index: u32) -> Self {
        assert!(index < 64, "A view mask holds at most 64 targets");
        ViewMask::from_bits_retain(1u64 << index)
    }
}

/// A presentation target (usually a window) the renderer can draw into.
pub trait Target {
    /// The unique bit identifying this target.
    fn view_bit(&self) -> ViewMask;
}

impl Target for ViewMask {
    fn view_bit(&self) -> ViewMask {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits() {
        let a = ViewMask::bit(0);
        let b = ViewMask::bit(5);
        let mask = a | b;
        assert!(mask.contains(b));
        assert!(!mask.difference(b).contains(b));
        assert!(mask.intersects(a));
        assert_eq!(b.bits(), 32);
    }

    #[test]
    #[should_panic(expected = "at most 64 targets")]
    fn test_bit_out_of_range() {
        let _ = ViewMask::bit(64);
    }
}

//! Index conversion helpers shared by the kernels
//
// Vector pointers, row indices and id lists are stored as i64, storage
// positions as usize. Values from a validated structure are never negative.

/// Convert i64 to usize, asserting non-negativity.
#[inline]
#[must_use]
pub fn i64_to_usize(x: i64) -> usize {
    debug_assert!(x >= 0);
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    {
        x as usize
    }
}

/// Resolve an entry of an upstream mapping array; negative means absent.
#[inline]
#[must_use]
pub fn mapped(x: i64) -> Option<usize> {
    usize::try_from(x).ok()
}

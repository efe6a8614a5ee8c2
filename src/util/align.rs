//! Offset alignment utilities.

/// Align an offset up to the given power-of-two alignment.
#[inline]
pub const fn align_up(offset: u64, align: u64) -> u64 {
    (offset + align - 1) & !(align - 1)
}

/// Check that an alignment is usable (non-zero power of two).
#[inline]
pub const fn is_valid_alignment(align: u64) -> bool {
    align.is_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(700, 16), 704);
    }

    #[test]
    fn test_valid_alignment() {
        assert!(is_valid_alignment(1));
        assert!(is_valid_alignment(256));
        assert!(!is_valid_alignment(0));
        assert!(!is_valid_alignment(24));
    }
}

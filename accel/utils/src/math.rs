use std::cmp;

fn bits_helper(n: u64, i: u64) -> u64 {
    if n == 0 { i } else { bits_helper(n / 2, i + 1) }
}

/// Number of bits needed to index `n` distinct entries. Never less than one,
/// since a zero-width address port cannot be expressed.
pub fn bits_needed_for(n: u64) -> u64 {
    cmp::max(bits_helper(n.saturating_sub(1), 0), 1)
}

/// Number of bits needed to represent the value `v` itself.
pub fn bits_for_value(v: u64) -> u64 {
    (64 - v.leading_zeros()) as u64
}

/// All-ones mask for `width` bits.
pub fn mask(width: u64) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1_u64 << width) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_widths() {
        assert_eq!(bits_needed_for(1), 1);
        assert_eq!(bits_needed_for(2), 1);
        assert_eq!(bits_needed_for(3), 2);
        assert_eq!(bits_needed_for(64), 6);
        assert_eq!(bits_needed_for(65), 7);
        assert_eq!(bits_needed_for(4096), 12);
    }

    #[test]
    fn value_widths() {
        assert_eq!(bits_for_value(0), 0);
        assert_eq!(bits_for_value(1), 1);
        assert_eq!(bits_for_value(64), 7);
        assert_eq!(mask(3), 0b111);
        assert_eq!(mask(64), u64::MAX);
    }
}

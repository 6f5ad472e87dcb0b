/// Returns the number of bits needed to distinguish `count` different values,
/// i.e. `ceil(log2(count))`. This is zero when there is at most one value,
/// since nothing has to be written to identify it.
///
/// # Examples
/// ```
/// use sharc_number::bits_for_count;
///
/// assert_eq!(bits_for_count(1), 0);
/// assert_eq!(bits_for_count(4), 2);
/// assert_eq!(bits_for_count(5), 3);
/// ```
pub fn bits_for_count(count: usize) -> u32 {
    if count <= 1 { 0 } else { (count - 1).ilog2() + 1 }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(0, 0 ; "empty")]
    #[test_case(1, 0 ; "single")]
    #[test_case(2, 1 ; "two")]
    #[test_case(3, 2 ; "three")]
    #[test_case(4, 2 ; "four")]
    #[test_case(5, 3 ; "five")]
    #[test_case(256, 8 ; "byte")]
    #[test_case(257, 9 ; "byte plus one")]
    fn test_bits_for_count(count: usize, expected: u32) {
        assert_eq!(bits_for_count(count), expected);
    }

    #[test]
    fn test_bits_for_count_covers_indices() {
        for count in 2..2000usize {
            let bits = bits_for_count(count);
            assert!((count - 1) >> bits == 0, "Index {} does not fit in {bits} bits", count - 1);
            assert!(bits == 1 || (count - 1) >> (bits - 1) != 0, "{bits} bits is not minimal for {count}");
        }
    }
}

//! Power-of-two helpers for sizing hash tables.

/// Returns true when exactly one bit of the value is set.
pub fn is_power_of_two<T>(value: T) -> bool
where
    T: num::PrimInt,
{
    value.count_ones() == 1
}

/// Returns the smallest power of two that is larger than or equal to the given
/// value, where zero rounds up to one.
///
/// # Examples
/// ```
/// use sharc_number::round_up_to_power_of_two;
///
/// assert_eq!(round_up_to_power_of_two(3u32), 4);
/// assert_eq!(round_up_to_power_of_two(4u32), 4);
/// assert_eq!(round_up_to_power_of_two(1000usize), 1024);
/// ```
pub fn round_up_to_power_of_two<T>(value: T) -> T
where
    T: num::PrimInt,
{
    if value <= T::one() {
        return T::one();
    }

    let bits = std::mem::size_of::<T>() * 8;
    let result = T::one() << (bits - (value - T::one()).leading_zeros() as usize);
    debug_assert!(is_power_of_two(result) && result >= value);
    result
}

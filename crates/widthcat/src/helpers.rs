//! Integer helpers shared by window planning and argument packing.

/// Smallest multiple of `divisor` that is `>= value`.
pub fn ceil_to_multiple(value: usize, divisor: usize) -> usize {
    debug_assert!(divisor > 0);
    value.div_ceil(divisor) * divisor
}

/// Largest multiple of `divisor` that is `<= value`.
pub fn floor_to_multiple(value: usize, divisor: usize) -> usize {
    debug_assert!(divisor > 0);
    (value / divisor) * divisor
}

/// Floor modulo: the residual is always in `[0, divisor)`, also for negative `value`.
pub fn floor_mod(value: i64, divisor: i64) -> i64 {
    debug_assert!(divisor > 0);
    value.rem_euclid(divisor)
}

/// Smallest value `>= required` that is reachable from `required` in whole `step`s
/// and lies at or above `available`.
pub(crate) fn adjust_up(required: i64, available: i64, step: i64) -> i64 {
    debug_assert!(step > 0);
    debug_assert!(available >= required);
    let distance = available - required;
    required + ((distance + step - 1) / step) * step
}

/// Largest value `<= required` that is reachable from `required` in whole `step`s
/// and lies at or below `available`.
pub(crate) fn adjust_down(required: i64, available: i64, step: i64) -> i64 {
    debug_assert!(step > 0);
    debug_assert!(available <= required);
    let distance = required - available;
    required - ((distance + step - 1) / step) * step
}

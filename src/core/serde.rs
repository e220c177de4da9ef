/*!
 * Serde Helpers
 * Predicates used with `skip_serializing_if`
 */

/// Skip serializing zero u64 values
#[inline]
pub fn is_zero_u64(value: &u64) -> bool {
    *value == 0
}

/// Skip serializing zero usize values
#[inline]
pub fn is_zero_usize(value: &usize) -> bool {
    *value == 0
}

use std::cmp::Ordering;

/// `f64` wrapper with a total order, so floating point keys can be used in heaps.
/// NaN values are rejected on construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct NonNan(f64);

impl NonNan {
    pub const INFINITY: NonNan = NonNan(f64::INFINITY);
    pub const NEG_INFINITY: NonNan = NonNan(f64::NEG_INFINITY);

    pub fn new(val: f64) -> Option<NonNan> {
        if val.is_nan() {
            None
        } else {
            Some(NonNan(val))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Eq for NonNan {}

impl Ord for NonNan {
    fn cmp(&self, other: &NonNan) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Check that a value is usable as a cost: not NaN and not negative.
/// Infinity is allowed and means impassable or forbidden.
pub fn is_valid_cost(val: f64) -> bool {
    !val.is_nan() && val >= 0.0
}

/// Approximate float equality with a relative tolerance, for comparing sums of weights
/// that were added up in different orders.
pub fn approx_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

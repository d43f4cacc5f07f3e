//! Tolerance-aware float helpers shared by the solver and the models.
//!
//! Residues below the configured precision are noise from repeated
//! subtraction; they are clamped to zero rather than surfaced.

/// `value` is meaningfully above zero.
#[inline]
pub fn double_positive(value: f64, precision: f64) -> bool {
    value > precision
}

/// `a` and `b` are within `precision` of each other.
#[inline]
pub fn double_equals(a: f64, b: f64, precision: f64) -> bool {
    (a - b).abs() < precision
}

/// `*variable -= value`, snapping the result to zero when it falls below
/// `precision`.
#[inline]
pub fn double_update(variable: &mut f64, value: f64, precision: f64) {
    *variable -= value;
    if *variable < precision {
        *variable = 0.0;
    }
}

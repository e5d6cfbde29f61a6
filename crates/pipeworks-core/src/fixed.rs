use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Amounts closer to zero than this are treated as empty. Guards against
/// fractional residue left behind by repeated partial withdrawals.
pub const AMOUNT_EPSILON: Fixed64 = Fixed64::from_bits(4295); // ~1e-6

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Snap values within [`AMOUNT_EPSILON`] of zero to exactly zero.
#[inline]
pub fn snap_to_zero(v: Fixed64) -> Fixed64 {
    if v.abs() < AMOUNT_EPSILON {
        Fixed64::ZERO
    } else {
        v
    }
}

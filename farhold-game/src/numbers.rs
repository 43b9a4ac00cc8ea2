//! Numeric conversion helpers centralizing safe casts and fuel quantization.

use num_traits::cast::cast;

/// Fuel values are kept on a fixed 0.01 grid to stop floating drift from
/// accumulating across repeated jumps.
pub const FUEL_STEP: f64 = 0.01;

/// Clamp a f64 to the f32 range and downcast, returning 0.0 for non-finite values.
#[must_use]
pub fn clamp_f64_to_f32(value: f64) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let min = cast::<f32, f64>(f32::MIN).unwrap_or(f64::MIN);
    let max = cast::<f32, f64>(f32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max);
    cast::<f64, f32>(clamped).unwrap_or(0.0)
}

/// Ceil a f64 and clamp it to the i64 range, returning 0 for non-finite values.
#[must_use]
pub fn ceil_f64_to_i64(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).ceil();
    cast::<f64, i64>(clamped).unwrap_or(0)
}

/// Round a f64 and clamp it to the i64 range, returning 0 for non-finite values.
#[must_use]
pub fn round_f64_to_i64(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i64>(clamped).unwrap_or(0)
}

/// Ceil a f64 and clamp it to the u32 range, returning 0 for non-finite or
/// negative values.
#[must_use]
pub fn ceil_f64_to_u32(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let max = cast::<u32, f64>(u32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(0.0, max).ceil();
    cast::<f64, u32>(clamped).unwrap_or(0)
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// A fuel amount expressed in whole quantization steps. Comparisons between
/// quantized fuel values go through this so they never hinge on float error.
#[must_use]
pub fn fuel_centi(value: f64) -> i64 {
    round_f64_to_i64(value / FUEL_STEP)
}

/// Quantize a fuel amount up to the next step. Costs are always rounded
/// against the spender.
#[must_use]
pub fn quantize_fuel_up(value: f64) -> f64 {
    i64_to_f64(ceil_f64_to_i64(value / FUEL_STEP)) * FUEL_STEP
}

/// Quantize a fuel amount to the nearest step.
#[must_use]
pub fn quantize_fuel(value: f64) -> f64 {
    i64_to_f64(fuel_centi(value)) * FUEL_STEP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_handles_non_finite() {
        assert!((clamp_f64_to_f32(f64::NAN) - 0.0).abs() < f32::EPSILON);
        assert!((clamp_f64_to_f32(f64::from(f32::MAX) * 2.0) - f32::MAX).abs() < f32::EPSILON);
    }

    #[test]
    fn ceil_clamps_and_handles_nan() {
        assert_eq!(ceil_f64_to_i64(1.2), 2);
        assert_eq!(ceil_f64_to_i64(f64::NAN), 0);
        assert_eq!(ceil_f64_to_u32(-3.0), 0);
        assert_eq!(ceil_f64_to_u32(0.001), 1);
    }

    #[test]
    fn quantize_up_rounds_against_the_spender() {
        assert!((quantize_fuel_up(1.001) - 1.01).abs() < 1e-12);
        assert!((quantize_fuel_up(2.0) - 2.0).abs() < 1e-12);
        assert_eq!(fuel_centi(quantize_fuel_up(0.10000000001)), 10);
    }

    #[test]
    fn quantized_values_compare_exactly_in_centi_units() {
        let paid = quantize_fuel(80.0 - 59.999_999_999);
        assert_eq!(fuel_centi(paid), 2000);
        assert_eq!(fuel_centi(quantize_fuel(f64::NAN)), 0);
    }
}

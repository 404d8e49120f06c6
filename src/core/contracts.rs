//! Input contracts checked at the public boundary of the paint core.

use crate::core::errors::PaintError;

/// Largest stroke coordinate magnitude. Brush boxes around a dab are computed
/// in `i32`, so positions stay well inside its range.
pub const MAX_COORDINATE: f64 = (1 << 24) as f64;

pub fn validate_position(x: f64, y: f64) -> Result<(), PaintError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(PaintError::InvalidInput(
            "Stroke coordinates must be finite numbers".to_string(),
        ));
    }
    if x.abs() > MAX_COORDINATE || y.abs() > MAX_COORDINATE {
        return Err(PaintError::InvalidInput(format!(
            "Stroke coordinates must be within ±{}",
            MAX_COORDINATE
        )));
    }
    Ok(())
}

pub fn validate_scale(scale: f64) -> Result<(), PaintError> {
    if !scale.is_finite() || scale < 0.0 {
        return Err(PaintError::InvalidInput(
            "Brush scale must be a non-negative finite number".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_pressure(pressure: f64) -> Result<(), PaintError> {
    if !pressure.is_finite() || !(0.0..=1.0).contains(&pressure) {
        return Err(PaintError::InvalidInput(
            "Pressure must be in [0, 1]".to_string(),
        ));
    }
    Ok(())
}

//! Blinded half-ECDH point arithmetic.
//!
//! The three operations the binding needs, over [`KeyMaterial`] values.
//! Every result is a fresh public exchange key; a product of a public point
//! and a scalar never reconstitutes private material.
//!
//! # Security
//!
//! - [`multiply`] re-validates the point against the scalar's curve before
//!   use, so a crafted point cannot leak bits of the scalar
//! - Results at the point at infinity are rejected rather than encoded

use crate::{error::KeyError, key::KeyMaterial};

/// Whether `point` lies on `on`'s curve.
pub fn is_on_curve(point: &KeyMaterial, on: &KeyMaterial) -> bool {
    point.curve() == on.curve() && on.curve().check_point(point.x(), point.y()).is_ok()
}

/// `d·P` where `P` is `point` and `d` is `scalar`'s private scalar.
///
/// # Errors
///
/// - `InvalidKey`: `scalar` is public-only, `point` is off the scalar's
///   curve, or the product is the point at infinity
pub fn multiply(point: &KeyMaterial, scalar: &KeyMaterial) -> Result<KeyMaterial, KeyError> {
    let d = scalar.scalar().ok_or_else(|| KeyError::invalid("scalar key has no private part"))?;
    if !is_on_curve(point, scalar) {
        return Err(KeyError::invalid("off-curve point"));
    }

    let curve = scalar.curve();
    let product = curve.multiply(point.x(), point.y(), d)?;
    Ok(KeyMaterial::exchange_point(curve, product))
}

/// `A + B`.
pub fn add(a: &KeyMaterial, b: &KeyMaterial) -> Result<KeyMaterial, KeyError> {
    same_curve(a, b)?;
    let sum = a.curve().add((a.x(), a.y()), (b.x(), b.y()))?;
    Ok(KeyMaterial::exchange_point(a.curve(), sum))
}

/// `A - B`.
pub fn subtract(a: &KeyMaterial, b: &KeyMaterial) -> Result<KeyMaterial, KeyError> {
    same_curve(a, b)?;
    let difference = a.curve().subtract((a.x(), a.y()), (b.x(), b.y()))?;
    Ok(KeyMaterial::exchange_point(a.curve(), difference))
}

fn same_curve(a: &KeyMaterial, b: &KeyMaterial) -> Result<(), KeyError> {
    if a.curve() == b.curve() {
        Ok(())
    } else {
        Err(KeyError::invalid(format!("curve mismatch: {} and {}", a.curve(), b.curve())))
    }
}

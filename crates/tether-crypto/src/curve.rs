//! Supported curves and the RustCrypto arithmetic behind them.
//!
//! Point and scalar operations are written once, generically over
//! [`CurveArithmetic`], and dispatched on the [`Curve`] tag. Coordinates cross
//! this boundary as fixed-width big-endian byte strings, the same shape they
//! take inside a JWK.

use std::{fmt, str::FromStr};

use elliptic_curve::{
    AffinePoint, CurveArithmetic, FieldBytes, FieldBytesSize, NonZeroScalar, ProjectivePoint,
    SecretKey,
    generic_array::typenum::Unsigned,
    sec1::{EncodedPoint, FromEncodedPoint, ModulusSize, ToEncodedPoint},
};
use p256::ecdsa::signature::{Signer, Verifier};
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::error::KeyError;

/// NIST prime curves accepted for key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Curve {
    /// NIST P-256 (secp256r1)
    P256,
    /// NIST P-384 (secp384r1)
    P384,
    /// NIST P-521 (secp521r1)
    P521,
}

impl Curve {
    /// Every supported curve.
    pub const ALL: [Self; 3] = [Self::P256, Self::P384, Self::P521];

    /// JWK `crv` name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    /// Look a curve up by its JWK `crv` name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|curve| curve.name() == name)
    }

    /// Width in bytes of one coordinate or of the private scalar.
    pub const fn field_size(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    /// The ECDSA algorithm that signs with keys on this curve.
    pub const fn signature_algorithm(self) -> SignatureAlgorithm {
        match self {
            Self::P256 => SignatureAlgorithm::Es256,
            Self::P384 => SignatureAlgorithm::Es384,
            Self::P521 => SignatureAlgorithm::Es512,
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Curve {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| KeyError::invalid(format!("unsupported curve {s:?}")))
    }
}

/// JWS signature algorithms, one per supported curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignatureAlgorithm {
    /// ECDSA over P-256 with SHA-256
    Es256,
    /// ECDSA over P-384 with SHA-384
    Es384,
    /// ECDSA over P-521 with SHA-512
    Es512,
}

impl SignatureAlgorithm {
    /// Every supported signature algorithm.
    pub const ALL: [Self; 3] = [Self::Es256, Self::Es384, Self::Es512];

    /// JOSE `alg` name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
        }
    }

    /// Look an algorithm up by its JOSE `alg` name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.name() == name)
    }

    /// The only curve this algorithm is defined over.
    pub const fn curve(self) -> Curve {
        match self {
            Self::Es256 => Curve::P256,
            Self::Es384 => Curve::P384,
            Self::Es512 => Curve::P521,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
            .ok_or_else(|| KeyError::invalid(format!("unsupported signature algorithm {s:?}")))
    }
}

/// Affine coordinates of a finite point.
#[derive(Debug)]
pub(crate) struct Coordinates {
    pub(crate) x: Vec<u8>,
    pub(crate) y: Vec<u8>,
}

macro_rules! on_curve {
    ($curve:expr, $op:ident ( $($arg:expr),* )) => {
        match $curve {
            Curve::P256 => $op::<p256::NistP256>($($arg),*),
            Curve::P384 => $op::<p384::NistP384>($($arg),*),
            Curve::P521 => $op::<p521::NistP521>($($arg),*),
        }
    };
}

impl Curve {
    /// Fails unless `(x, y)` has the right width and satisfies the curve
    /// equation.
    pub(crate) fn check_point(self, x: &[u8], y: &[u8]) -> Result<(), KeyError> {
        on_curve!(self, check_point(x, y))
    }

    /// Fails unless `d` is a full-width scalar in `[1, n)`.
    pub(crate) fn check_scalar(self, d: &[u8]) -> Result<(), KeyError> {
        on_curve!(self, check_scalar(d))
    }

    pub(crate) fn random_key(
        self,
        rng: &mut impl CryptoRngCore,
    ) -> Result<(Coordinates, Zeroizing<Vec<u8>>), KeyError> {
        on_curve!(self, random_key(rng))
    }

    /// `d·(x, y)`; the point is validated before use.
    pub(crate) fn multiply(self, x: &[u8], y: &[u8], d: &[u8]) -> Result<Coordinates, KeyError> {
        on_curve!(self, multiply(x, y, d))
    }

    pub(crate) fn add(self, a: (&[u8], &[u8]), b: (&[u8], &[u8])) -> Result<Coordinates, KeyError> {
        on_curve!(self, combine(a, b, false))
    }

    pub(crate) fn subtract(
        self,
        a: (&[u8], &[u8]),
        b: (&[u8], &[u8]),
    ) -> Result<Coordinates, KeyError> {
        on_curve!(self, combine(a, b, true))
    }

    /// ECDSA signature in the fixed-width `r || s` form JWS uses.
    pub(crate) fn sign(self, d: &[u8], message: &[u8]) -> Result<Vec<u8>, KeyError> {
        match self {
            Self::P256 => {
                let key = p256::ecdsa::SigningKey::from_slice(d).map_err(signing_failed)?;
                let signature: p256::ecdsa::Signature =
                    key.try_sign(message).map_err(signing_failed)?;
                Ok(signature.to_bytes().to_vec())
            },
            Self::P384 => {
                let key = p384::ecdsa::SigningKey::from_slice(d).map_err(signing_failed)?;
                let signature: p384::ecdsa::Signature =
                    key.try_sign(message).map_err(signing_failed)?;
                Ok(signature.to_bytes().to_vec())
            },
            Self::P521 => {
                let key = p521::ecdsa::SigningKey::from_slice(d).map_err(signing_failed)?;
                let signature: p521::ecdsa::Signature =
                    key.try_sign(message).map_err(signing_failed)?;
                Ok(signature.to_bytes().to_vec())
            },
        }
    }

    pub(crate) fn verify(
        self,
        x: &[u8],
        y: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), KeyError> {
        let sec1 = [&[0x04][..], x, y].concat();
        match self {
            Self::P256 => {
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| KeyError::invalid("bad verifying key"))?;
                let signature = p256::ecdsa::Signature::from_slice(signature)
                    .map_err(|_| KeyError::signature("malformed ES256 signature"))?;
                key.verify(message, &signature)
                    .map_err(|_| KeyError::signature("ES256 signature mismatch"))
            },
            Self::P384 => {
                let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| KeyError::invalid("bad verifying key"))?;
                let signature = p384::ecdsa::Signature::from_slice(signature)
                    .map_err(|_| KeyError::signature("malformed ES384 signature"))?;
                key.verify(message, &signature)
                    .map_err(|_| KeyError::signature("ES384 signature mismatch"))
            },
            Self::P521 => {
                let key = p521::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| KeyError::invalid("bad verifying key"))?;
                let signature = p521::ecdsa::Signature::from_slice(signature)
                    .map_err(|_| KeyError::signature("malformed ES512 signature"))?;
                key.verify(message, &signature)
                    .map_err(|_| KeyError::signature("ES512 signature mismatch"))
            },
        }
    }
}

fn signing_failed(err: p256::ecdsa::Error) -> KeyError {
    KeyError::Signing { reason: err.to_string() }
}

fn affine<C>(x: &[u8], y: &[u8]) -> Result<AffinePoint<C>, KeyError>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let width = FieldBytesSize::<C>::USIZE;
    if x.len() != width || y.len() != width {
        return Err(KeyError::invalid(format!(
            "coordinates must be {width} bytes, got {} and {}",
            x.len(),
            y.len()
        )));
    }

    let encoded = EncodedPoint::<C>::from_affine_coordinates(
        FieldBytes::<C>::from_slice(x),
        FieldBytes::<C>::from_slice(y),
        false,
    );
    Option::from(AffinePoint::<C>::from_encoded_point(&encoded))
        .ok_or_else(|| KeyError::invalid("off-curve point"))
}

fn coordinates<C>(point: &AffinePoint<C>) -> Result<Coordinates, KeyError>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let encoded = point.to_encoded_point(false);
    match (encoded.x(), encoded.y()) {
        (Some(x), Some(y)) => Ok(Coordinates { x: x.to_vec(), y: y.to_vec() }),
        _ => Err(KeyError::invalid("point at infinity")),
    }
}

fn scalar<C>(d: &[u8]) -> Result<NonZeroScalar<C>, KeyError>
where
    C: CurveArithmetic,
{
    let width = FieldBytesSize::<C>::USIZE;
    if d.len() != width {
        return Err(KeyError::invalid(format!(
            "private scalar must be {width} bytes, got {}",
            d.len()
        )));
    }

    let secret = SecretKey::<C>::from_slice(d)
        .map_err(|_| KeyError::invalid("private scalar out of range"))?;
    Ok(secret.to_nonzero_scalar())
}

fn check_point<C>(x: &[u8], y: &[u8]) -> Result<(), KeyError>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    affine::<C>(x, y).map(|_| ())
}

fn check_scalar<C>(d: &[u8]) -> Result<(), KeyError>
where
    C: CurveArithmetic,
{
    scalar::<C>(d).map(|_| ())
}

fn random_key<C>(
    rng: &mut impl CryptoRngCore,
) -> Result<(Coordinates, Zeroizing<Vec<u8>>), KeyError>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let secret = SecretKey::<C>::random(rng);
    let public = coordinates::<C>(secret.public_key().as_affine())
        .map_err(|err| KeyError::KeyGeneration { reason: err.to_string() })?;
    Ok((public, Zeroizing::new(secret.to_bytes().to_vec())))
}

fn multiply<C>(x: &[u8], y: &[u8], d: &[u8]) -> Result<Coordinates, KeyError>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let point = ProjectivePoint::<C>::from(affine::<C>(x, y)?);
    let k = scalar::<C>(d)?;
    let product: AffinePoint<C> = (point * *k).into();
    coordinates::<C>(&product)
}

fn combine<C>(a: (&[u8], &[u8]), b: (&[u8], &[u8]), negate_b: bool) -> Result<Coordinates, KeyError>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let a = ProjectivePoint::<C>::from(affine::<C>(a.0, a.1)?);
    let b = ProjectivePoint::<C>::from(affine::<C>(b.0, b.1)?);
    let sum = if negate_b { a - b } else { a + b };
    let sum: AffinePoint<C> = sum.into();
    coordinates::<C>(&sum)
}

//! Group primitive for the PSI protocol.
//!
//! Elements are hashed into the Ristretto group and blinded by exponentiation
//! with a party's private scalar. Blinding commutes, so `H(x)^(cs)` is the
//! same value whichever party exponentiates first.

use crate::error::{PsiError, Result};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::Scalar;
use rand::rngs::OsRng;
use sha2::Sha512;
use std::fmt;
use zeroize::Zeroize;

/// Length in bytes of a serialized group element.
pub const ELEMENT_SIZE: usize = 32;

/// Length in bytes of a serialized private key.
pub const KEY_SIZE: usize = 32;

/// Map arbitrary bytes to a Ristretto point using hash-to-curve.
///
/// # Arguments
/// * `input` - The bytes to hash
///
/// # Returns
/// The corresponding Ristretto point
pub fn hash_to_point(input: &[u8]) -> RistrettoPoint {
    RistrettoPoint::hash_from_bytes::<Sha512>(input)
}

/// Decompress a compressed Ristretto point.
///
/// # Errors
/// Returns `PsiError::CryptoError` if the bytes are not a valid encoding
pub fn decompress_point(compressed: &CompressedRistretto) -> Result<RistrettoPoint> {
    compressed
        .decompress()
        .ok_or_else(|| PsiError::CryptoError("Failed to decompress Ristretto point".to_string()))
}

/// A party's private scalar.
///
/// Never zero, so it always has an inverse. The scalar is wiped when the key
/// is dropped.
pub struct PrivateKey(Scalar);

impl PrivateKey {
    /// Generate a fresh key using OsRng.
    pub fn random() -> Self {
        let mut rng = OsRng;
        loop {
            let scalar = Scalar::random(&mut rng);
            if scalar != Scalar::ZERO {
                return Self(scalar);
            }
        }
    }

    /// Load a key from its canonical 32-byte little-endian encoding.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidKey` if `bytes` has the wrong length, is not
    /// reduced modulo the group order, or encodes zero
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut array: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            PsiError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            ))
        })?;
        let scalar = Option::<Scalar>::from(Scalar::from_canonical_bytes(array));
        array.zeroize();

        match scalar {
            Some(scalar) if scalar != Scalar::ZERO => Ok(Self(scalar)),
            Some(_) => Err(PsiError::InvalidKey("key must not be zero".to_string())),
            None => Err(PsiError::InvalidKey(
                "key is not a canonical scalar".to_string(),
            )),
        }
    }

    /// Canonical encoding of the scalar. Do not send this to the other party.
    pub fn to_bytes(&self) -> [u8; KEY_SIZE] {
        self.0.to_bytes()
    }

    /// The multiplicative inverse of this key, used to strip a layer of
    /// blinding.
    pub fn invert(&self) -> Result<PrivateKey> {
        if self.0 == Scalar::ZERO {
            return Err(PsiError::CryptoError(
                "cannot invert the zero scalar".to_string(),
            ));
        }
        Ok(PrivateKey(self.0.invert()))
    }

    /// Blind a point by multiplying it with this key.
    pub fn blind(&self, point: &RistrettoPoint) -> CompressedRistretto {
        (point * self.0).compress()
    }

    /// Hash `input` to the group and blind it, computing `H(x)^k`.
    pub fn encrypt(&self, input: &[u8]) -> CompressedRistretto {
        self.blind(&hash_to_point(input))
    }

    /// Add this key's layer of blinding to an already blinded element.
    ///
    /// # Errors
    /// Returns `PsiError::CryptoError` if `element` does not decompress
    pub fn re_encrypt(&self, element: &CompressedRistretto) -> Result<CompressedRistretto> {
        let point = decompress_point(element)?;
        Ok(self.blind(&point))
    }

    /// Strip this key's layer of blinding from `element`.
    ///
    /// Inverts the key on every call; callers with many elements should
    /// [`invert`](Self::invert) once and [`re_encrypt`](Self::re_encrypt).
    pub fn decrypt(&self, element: &CompressedRistretto) -> Result<CompressedRistretto> {
        self.invert()?.re_encrypt(element)
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

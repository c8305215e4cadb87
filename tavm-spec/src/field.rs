//! Field element type for the TAVM.
//!
//! Memory cells tagged `FIELD` hold an element of the BN254 scalar field.
//! The canonical range is `[0, MODULUS)`; every constructor reduces into it.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// BN254 scalar field modulus, decimal string form.
pub const MODULUS_DEC: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

/// Number of bits in the modulus.
pub const MODULUS_BITS: u32 = 254;

fn modulus() -> &'static BigUint {
    static MODULUS: OnceLock<BigUint> = OnceLock::new();
    MODULUS.get_or_init(|| MODULUS_DEC.parse().expect("modulus literal parses"))
}

/// A field element, always reduced into `[0, MODULUS)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Fr(BigUint);

impl Fr {
    /// Create a field element, reducing modulo the prime.
    pub fn new(value: BigUint) -> Self {
        Fr(value % modulus())
    }

    pub fn zero() -> Self {
        Fr(BigUint::zero())
    }

    pub fn one() -> Self {
        Fr(BigUint::one())
    }

    /// The field modulus.
    pub fn modulus() -> &'static BigUint {
        modulus()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The canonical representative.
    pub fn to_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Addition modulo the prime.
    pub fn add(&self, rhs: &Fr) -> Fr {
        Fr::new(&self.0 + &rhs.0)
    }

    /// Subtraction modulo the prime (adds the modulus back on underflow).
    pub fn sub(&self, rhs: &Fr) -> Fr {
        if self.0 >= rhs.0 {
            Fr(&self.0 - &rhs.0)
        } else {
            Fr(modulus() - &rhs.0 + &self.0)
        }
    }

    /// Multiplication modulo the prime.
    pub fn mul(&self, rhs: &Fr) -> Fr {
        Fr::new(&self.0 * &rhs.0)
    }

    /// Euclidean division over the canonical representatives.
    ///
    /// This is the quotient of the integer division `a / b`, not a field
    /// operation. Returns `None` for a zero divisor.
    pub fn ediv(&self, rhs: &Fr) -> Option<Fr> {
        if rhs.is_zero() {
            return None;
        }
        Some(Fr(&self.0 / &rhs.0))
    }

    /// Field division: multiplication by the modular inverse.
    ///
    /// Returns `None` for a zero divisor.
    pub fn fdiv(&self, rhs: &Fr) -> Option<Fr> {
        rhs.inverse().map(|inv| self.mul(&inv))
    }

    /// Multiplicative inverse via Fermat's little theorem: `a^(p-2) mod p`.
    pub fn inverse(&self) -> Option<Fr> {
        if self.is_zero() {
            return None;
        }
        let exp = modulus() - 2u32;
        Some(Fr(self.0.modpow(&exp, modulus())))
    }

    /// Canonical-representative comparison.
    pub fn lt(&self, rhs: &Fr) -> bool {
        self.0 < rhs.0
    }

    /// Big-endian 32-byte encoding of the canonical representative.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let raw = self.0.to_bytes_be();
        let mut out = [0u8; 32];
        out[32 - raw.len()..].copy_from_slice(&raw);
        out
    }

    /// Decode a big-endian byte string, reducing modulo the prime.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        Fr::new(BigUint::from_bytes_be(bytes))
    }

    pub fn from_u128(value: u128) -> Self {
        // 2^128 < MODULUS, no reduction needed.
        Fr(BigUint::from(value))
    }

    pub fn from_u64(value: u64) -> Self {
        Fr(BigUint::from(value))
    }

    /// Truncate the canonical representative to `u128`.
    pub fn to_u128_truncated(&self) -> u128 {
        let digits = self.0.to_u64_digits();
        let lo = digits.first().copied().unwrap_or(0) as u128;
        let hi = digits.get(1).copied().unwrap_or(0) as u128;
        lo | (hi << 64)
    }

    /// Number of base-`radix` limbs needed to represent the modulus.
    ///
    /// Used by radix-decomposition gas metering: the circuit always pays for
    /// at least this many limbs regardless of the requested count.
    pub fn limbs_for_modulus(radix: u32) -> u32 {
        debug_assert!(radix >= 2);
        let mut n = modulus().clone();
        let radix = BigUint::from(radix);
        let mut limbs = 0u32;
        while !n.is_zero() {
            n /= &radix;
            limbs += 1;
        }
        limbs
    }

    /// Big-endian base-`radix` decomposition, padded or truncated to
    /// `num_limbs` limbs. Truncation keeps the least-significant limbs.
    pub fn to_radix_be(&self, radix: u32, num_limbs: u32) -> Vec<u8> {
        debug_assert!((2..=256).contains(&radix));
        let radix_big = BigUint::from(radix);
        let mut rest = self.0.clone();
        let mut limbs_le = Vec::with_capacity(num_limbs as usize);
        for _ in 0..num_limbs {
            let digit = &rest % &radix_big;
            limbs_le.push(digit.to_u64_digits().first().copied().unwrap_or(0) as u8);
            rest /= &radix_big;
        }
        limbs_le.reverse();
        limbs_le
    }
}

impl PartialOrd for Fr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<u64> for Fr {
    fn from(value: u64) -> Self {
        Fr::from_u64(value)
    }
}

impl From<u128> for Fr {
    fn from(value: u128) -> Self {
        Fr::from_u128(value)
    }
}

impl fmt::Display for Fr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

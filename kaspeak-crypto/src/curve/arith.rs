use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};

use super::CurveError;

/// Modular exponentiation with a fixed 4-bit window.
///
/// The identifier algebra computes `k^i mod n` for arbitrary chain indices,
/// so the exponent is scanned a nibble at a time against a 16-entry table.
pub fn pow_mod(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    if modulus.is_one() {
        return BigUint::zero();
    }

    let base = base % modulus;
    if exp.is_zero() {
        return BigUint::one();
    }

    let mut table = Vec::with_capacity(16);
    table.push(BigUint::one());
    for i in 1..16usize {
        table.push(&table[i - 1] * &base % modulus);
    }

    let mut acc = BigUint::one();
    for digit in exp.to_radix_be(16) {
        for _ in 0..4 {
            acc = &acc * &acc % modulus;
        }
        if digit != 0 {
            acc = acc * &table[digit as usize] % modulus;
        }
    }

    acc
}

/// Modular inverse via the extended Euclidean algorithm.
///
/// Fails when `gcd(a, m) != 1`, which for the prime moduli used here only
/// happens when `a ≡ 0`.
pub fn mod_inv(a: &BigUint, modulus: &BigUint) -> Result<BigUint, CurveError> {
    let m = BigInt::from(modulus.clone());
    let mut old_r = BigInt::from(a % modulus);
    let mut r = m.clone();
    let mut old_s = BigInt::one();
    let mut s = BigInt::zero();

    while !r.is_zero() {
        let q = &old_r / &r;
        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &q * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    if old_r != BigInt::one() {
        return Err(CurveError::NotInvertible);
    }

    let reduced = ((old_s % &m) + &m) % &m;
    Ok(reduced.to_biguint().expect("reduced into [0, m)"))
}

/// Square root in the secp256k1 field, via the `(p + 1) / 4` exponent.
///
/// The candidate is verified before acceptance; a failed check means the
/// input was a non-residue.
pub(crate) fn sqrt_fp(a: &BigUint) -> Result<BigUint, CurveError> {
    let p = &*super::FIELD_PRIME;
    let a = a % p;
    let candidate = pow_mod(&a, &super::SQRT_EXP, p);
    if (&candidate * &candidate) % p == a {
        Ok(candidate)
    } else {
        Err(CurveError::NonResidue)
    }
}

/// `(a - b) mod p` without leaving the unsigned domain.
pub(crate) fn sub_mod(a: &BigUint, b: &BigUint, modulus: &BigUint) -> BigUint {
    ((a % modulus) + modulus - (b % modulus)) % modulus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{FIELD_PRIME, GROUP_ORDER};

    #[test]
    fn pow_mod_matches_reference_implementation() {
        let n = &*GROUP_ORDER;
        let base = BigUint::parse_bytes(b"deadbeefcafef00d", 16).unwrap();
        for exp in [0u32, 1, 2, 15, 16, 17, 255, 1000] {
            let exp = BigUint::from(exp);
            assert_eq!(pow_mod(&base, &exp, n), base.modpow(&exp, n));
        }
    }

    #[test]
    fn pow_mod_large_exponent() {
        let p = &*FIELD_PRIME;
        let base = BigUint::from(7u32);
        let exp = &*GROUP_ORDER - BigUint::from(1u32);
        assert_eq!(pow_mod(&base, &exp, p), base.modpow(&exp, p));
    }

    #[test]
    fn mod_inv_round_trips() {
        let n = &*GROUP_ORDER;
        for v in [1u32, 2, 6, 1337, 65535] {
            let v = BigUint::from(v);
            let inv = mod_inv(&v, n).unwrap();
            assert_eq!((&v * &inv) % n, BigUint::one());
        }
    }

    #[test]
    fn zero_is_not_invertible() {
        assert_eq!(
            mod_inv(&BigUint::zero(), &GROUP_ORDER),
            Err(CurveError::NotInvertible)
        );
    }

    #[test]
    fn sqrt_of_residue_verifies() {
        // 2^2 = 4 is trivially a residue
        let four = BigUint::from(4u32);
        let root = sqrt_fp(&four).unwrap();
        let p = &*FIELD_PRIME;
        assert_eq!((&root * &root) % p, four);
    }

    #[test]
    fn sub_mod_wraps() {
        let m = BigUint::from(7u32);
        let a = BigUint::from(2u32);
        let b = BigUint::from(5u32);
        assert_eq!(sub_mod(&a, &b, &m), BigUint::from(4u32));
    }
}

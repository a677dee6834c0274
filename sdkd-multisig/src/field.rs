//! Arithmetic over GF(2^b) with exponent and logarithm tables

use crate::{MultisigError, MultisigResult};

/// Smallest supported field width
pub const MIN_BITS: u32 = 3;

/// Largest supported field width
pub const MAX_BITS: u32 = 20;

/// Field width used when none is given
pub const DEFAULT_BITS: u32 = 8;

/// Primitive polynomial (without the leading term) for each width, indexed by bit count
const PRIMITIVE_POLYNOMIALS: [u32; 21] = [
    0, 0, 1, 3, 3, 5, 3, 3, 29, 17, 9, 5, 83, 27, 43, 3, 45, 9, 39, 39, 9,
];

/// Finite field of `2^bits` elements
#[derive(Debug, Clone)]
pub struct GaloisField {
    bits: u32,
    max: u32,
    exps: Vec<u32>,
    logs: Vec<u32>,
}

impl GaloisField {
    /// Build the tables for a width in `3..=20`
    pub fn new(bits: u32) -> MultisigResult<Self> {
        if !(MIN_BITS..=MAX_BITS).contains(&bits) {
            return Err(MultisigError::InvalidParameters(format!(
                "bit width must be between {MIN_BITS} and {MAX_BITS}, got {bits}"
            )));
        }

        Ok(Self::build(bits))
    }

    fn build(bits: u32) -> Self {
        let size = 1u32 << bits;
        let max = size - 1;
        let primitive = PRIMITIVE_POLYNOMIALS[bits as usize];

        let mut exps = vec![0u32; size as usize];
        let mut logs = vec![0u32; size as usize];
        let mut x = 1u32;
        for i in 0..size {
            exps[i as usize] = x;
            logs[x as usize] = i;
            x <<= 1;
            if x >= size {
                x ^= primitive;
                x &= max;
            }
        }

        Self {
            bits,
            max,
            exps,
            logs,
        }
    }

    /// Width in bits
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Largest element, also the multiplicative group order
    pub fn max(&self) -> u32 {
        self.max
    }

    fn exp(&self, power: u32) -> u32 {
        self.exps[power as usize]
    }

    fn log(&self, value: u32) -> u32 {
        self.logs[value as usize]
    }

    /// Field multiplication
    pub fn mul(&self, a: u32, b: u32) -> u32 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.exp((self.log(a) + self.log(b)) % self.max)
    }

    /// Field division
    pub fn div(&self, a: u32, b: u32) -> MultisigResult<u32> {
        if b == 0 {
            return Err(MultisigError::DivisionByZero(self.bits));
        }
        if a == 0 {
            return Ok(0);
        }
        Ok(self.exp((self.log(a) + self.max - self.log(b)) % self.max))
    }

    /// Evaluate a polynomial at `x`; `coeffs[0]` is the constant term
    pub fn horner(&self, x: u32, coeffs: &[u32]) -> u32 {
        let log_x = self.log(x);
        let mut fx = 0u32;
        for &coeff in coeffs.iter().rev() {
            if fx == 0 {
                fx = coeff;
            } else {
                fx = self.exp((log_x + self.log(fx)) % self.max) ^ coeff;
            }
        }
        fx
    }

    /// Evaluate the polynomial through `(xs[i], ys[i])` at `at`.
    ///
    /// Evaluating at one of the known `xs` returns that point's `y`.
    pub fn lagrange(&self, at: u32, xs: &[u32], ys: &[u32]) -> u32 {
        let mut sum = 0u32;

        'terms: for (i, (&xi, &yi)) in xs.iter().zip(ys).enumerate() {
            if yi == 0 {
                continue;
            }

            let mut product = self.log(yi);
            for (j, &xj) in xs.iter().enumerate() {
                if i == j {
                    continue;
                }
                if at == xj {
                    // Basis polynomial for i vanishes at another known point
                    continue 'terms;
                }
                product = (product + self.log(at ^ xj) + self.max - self.log(xi ^ xj)) % self.max;
            }

            sum ^= self.exp(product);
        }

        sum
    }
}

impl Default for GaloisField {
    fn default() -> Self {
        Self::build(DEFAULT_BITS)
    }
}

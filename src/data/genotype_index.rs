//! # Genotype Index Arithmetic
//!
//! Maps allele pairs to the integer genotype codes used to address PGP
//! (phased) and GP (unphased) probability vectors.
//!
//! ## Conventions
//! - Phased: `index = a1 * n_alleles + a2`. Row is the strand-1 allele, so a
//!   biallelic PGP field lists `0|0, 0|1, 1|0, 1|1`.
//! - Unphased: triangular, `a2`-major with `a1 <= a2`, so `index = a2*(a2+1)/2 + a1`.
//!   A biallelic GP field lists `0/0, 0/1, 1/1`; a triallelic one
//!   `0/0, 0/1, 1/1, 0/2, 1/2, 2/2`.
//!
//! Decoding an input PGP vector and re-encoding an emission query must go
//! through the same function, so every caller uses these.

/// Largest allele count a marker may have; allele indices are stored as `u8`.
pub const MAX_ALLELES: usize = 255;

/// Bits needed to store allele indices `0..n_alleles`, never less than 1.
#[inline]
pub fn bits_per_allele(n_alleles: usize) -> usize {
    if n_alleles <= 2 {
        1
    } else {
        (usize::BITS - (n_alleles - 1).leading_zeros()) as usize
    }
}

/// Number of ordered allele pairs.
#[inline]
pub fn n_phased_genotypes(n_alleles: usize) -> usize {
    n_alleles * n_alleles
}

/// Number of unordered allele pairs.
#[inline]
pub fn n_unphased_genotypes(n_alleles: usize) -> usize {
    n_alleles * (n_alleles + 1) / 2
}

/// Index of the ordered pair `(a1, a2)`.
#[inline]
pub fn phased_index(a1: u8, a2: u8, n_alleles: usize) -> usize {
    debug_assert!((a1 as usize) < n_alleles && (a2 as usize) < n_alleles);
    a1 as usize * n_alleles + a2 as usize
}

/// Index of the unordered pair `{a1, a2}`. Argument order does not matter.
#[inline]
pub fn unphased_index(a1: u8, a2: u8) -> usize {
    let (lo, hi) = if a1 <= a2 { (a1, a2) } else { (a2, a1) };
    let hi = hi as usize;
    hi * (hi + 1) / 2 + lo as usize
}

//! # Bit-Packed Allele Panel
//!
//! Phased diploid calls for every sample at one marker, stored as two
//! fixed-width bit-packed strands. Each allele occupies
//! `bits_per_allele(n_alleles)` bits at offset `sample * bits_per_allele`.

use bitvec::prelude::*;

use crate::data::genotype_index::{bits_per_allele, MAX_ALLELES};
use crate::data::haplotype::Samples;
use crate::data::marker::Marker;
use crate::error::{GenotypeFault, PgpError, Result};

/// A genotype as read from a GT subfield. `None` is a missing allele.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenotypeCall {
    pub a1: Option<u8>,
    pub a2: Option<u8>,
    pub phased: bool,
}

impl GenotypeCall {
    pub fn phased(a1: u8, a2: u8) -> Self {
        Self {
            a1: Some(a1),
            a2: Some(a2),
            phased: true,
        }
    }

    pub fn unphased(a1: u8, a2: u8) -> Self {
        Self {
            a1: Some(a1),
            a2: Some(a2),
            phased: false,
        }
    }

    /// Both alleles of a phased, fully-observed call below `n_alleles`
    pub fn checked(&self, n_alleles: usize) -> std::result::Result<(u8, u8), GenotypeFault> {
        if !self.phased {
            return Err(GenotypeFault::Unphased);
        }
        let (a1, a2) = match (self.a1, self.a2) {
            (Some(a1), Some(a2)) => (a1, a2),
            _ => return Err(GenotypeFault::MissingAllele),
        };
        if a1 as usize >= n_alleles || a2 as usize >= n_alleles {
            return Err(GenotypeFault::AlleleOutOfRange(a1.max(a2)));
        }
        Ok((a1, a2))
    }
}

/// Immutable two-strand allele store for one marker
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedAllelePanel {
    allele1: BitVec<u64, Lsb0>,
    allele2: BitVec<u64, Lsb0>,
    bits_per_allele: u8,
    n_samples: u32,
}

impl PackedAllelePanel {
    /// Validate and pack one call per sample.
    ///
    /// Fails on the first sample whose call is unphased, has a missing allele,
    /// or has an allele index not below `marker.n_alleles()`.
    pub fn from_calls(marker: &Marker, samples: &Samples, calls: &[GenotypeCall]) -> Result<Self> {
        if calls.len() != samples.len() {
            return Err(PgpError::inconsistent_samples(format!(
                "{} genotype calls for {} samples at marker {}",
                calls.len(),
                samples.len(),
                marker
            )));
        }
        let n_alleles = marker.n_alleles();
        check_n_alleles(n_alleles)?;
        let mut pairs = Vec::with_capacity(calls.len());
        for (s, call) in calls.iter().enumerate() {
            let pair = call
                .checked(n_alleles)
                .map_err(|kind| PgpError::malformed_genotype(samples.id(s), marker, kind))?;
            pairs.push(pair);
        }
        Ok(Self::pack(&pairs, n_alleles))
    }

    /// Pack already-decoded phased pairs.
    pub fn from_pairs(pairs: &[(u8, u8)], n_alleles: usize) -> Result<Self> {
        check_n_alleles(n_alleles)?;
        if let Some(&(a1, a2)) = pairs
            .iter()
            .find(|&&(a1, a2)| a1 as usize >= n_alleles || a2 as usize >= n_alleles)
        {
            return Err(PgpError::invalid_data(format!(
                "allele pair {}|{} out of range for {} alleles",
                a1, a2, n_alleles
            )));
        }
        Ok(Self::pack(pairs, n_alleles))
    }

    fn pack(pairs: &[(u8, u8)], n_alleles: usize) -> Self {
        let width = bits_per_allele(n_alleles);
        let total_bits = pairs.len() * width;
        let mut allele1 = bitvec![u64, Lsb0; 0; total_bits];
        let mut allele2 = bitvec![u64, Lsb0; 0; total_bits];

        for (s, &(a1, a2)) in pairs.iter().enumerate() {
            let start = s * width;
            allele1[start..start + width].store_le(a1);
            allele2[start..start + width].store_le(a2);
        }

        Self {
            allele1,
            allele2,
            bits_per_allele: width as u8,
            n_samples: pairs.len() as u32,
        }
    }

    #[inline]
    fn read(bits: &BitSlice<u64, Lsb0>, sample: usize, width: usize) -> u8 {
        let start = sample * width;
        bits[start..start + width].load_le::<u8>()
    }

    /// Strand-1 allele for a sample
    #[inline]
    pub fn allele1(&self, sample: usize) -> u8 {
        debug_assert!(sample < self.n_samples as usize);
        Self::read(&self.allele1, sample, self.bits_per_allele as usize)
    }

    /// Strand-2 allele for a sample
    #[inline]
    pub fn allele2(&self, sample: usize) -> u8 {
        debug_assert!(sample < self.n_samples as usize);
        Self::read(&self.allele2, sample, self.bits_per_allele as usize)
    }

    /// Allele on `strand` (0 or 1)
    #[inline]
    pub fn allele(&self, strand: usize, sample: usize) -> u8 {
        if strand == 0 {
            self.allele1(sample)
        } else {
            self.allele2(sample)
        }
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples as usize
    }

    pub fn bits_per_allele(&self) -> u8 {
        self.bits_per_allele
    }

    /// Fails with `InconsistentMarkers` unless the panel was packed for an
    /// allele count of `marker` and every stored allele is below it.
    pub fn check_marker(&self, marker: &Marker) -> Result<()> {
        let n_alleles = marker.n_alleles();
        if n_alleles > MAX_ALLELES || self.bits_per_allele as usize != bits_per_allele(n_alleles) {
            return Err(PgpError::inconsistent_markers(format!(
                "{}-bit allele panel does not fit {} alleles at marker {}",
                self.bits_per_allele, n_alleles, marker
            )));
        }
        if let Some(s) = (0..self.n_samples()).find(|&s| {
            self.allele1(s) as usize >= n_alleles || self.allele2(s) as usize >= n_alleles
        }) {
            return Err(PgpError::inconsistent_markers(format!(
                "allele pair {}|{} of sample {} out of range for marker {}",
                self.allele1(s),
                self.allele2(s),
                s,
                marker
            )));
        }
        Ok(())
    }
}

fn check_n_alleles(n_alleles: usize) -> Result<()> {
    if n_alleles > MAX_ALLELES {
        return Err(PgpError::invalid_data(format!(
            "{} alleles exceeds maximum supported count {}",
            n_alleles, MAX_ALLELES
        )));
    }
    Ok(())
}

//! # Genotype Emission Interface
//!
//! The per-marker view an HMM consumer queries for the likelihood of an
//! allele pair. Implementations are immutable and shared across threads.

use crate::data::haplotype::Samples;
use crate::data::marker::Marker;

/// Emission probabilities for every sample at one marker
pub trait GenotypeEmission: Send + Sync {
    fn marker(&self) -> &Marker;

    fn samples(&self) -> &Samples;

    fn n_samples(&self) -> usize {
        self.samples().len()
    }

    /// True if no sample carries data at this marker
    fn is_missing_data(&self) -> bool;

    /// True if the data is a phased, non-missing reference panel
    fn is_ref_data(&self) -> bool;

    /// Probability of observing the ordered pair `a1|a2` for `sample`.
    ///
    /// Total over all allele pairs; never panics for `a1`, `a2` outside the
    /// stored call.
    fn gl(&self, sample: usize, a1: u8, a2: u8) -> f32;

    fn is_phased(&self, sample: usize) -> bool;

    fn allele1(&self, sample: usize) -> u8;

    fn allele2(&self, sample: usize) -> u8;
}

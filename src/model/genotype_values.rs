//! # Genotype Values
//!
//! Per-sample phased (`n²`) and unphased (`n(n+1)/2`) genotype values for a
//! block of markers. Phased values are the ones the PGP matrix is printed
//! from; unphased values drive DS, GP and the INFO statistics.
//!
//! Adding a phased value also folds it into the unphased slot of the same
//! unordered pair, so the two views always agree on a sample's total.

use std::sync::Arc;

use crate::data::genotype_index::unphased_index;
use crate::data::haplotype::Samples;
use crate::data::marker::{Marker, MarkerIdx, Markers};
use crate::error::{PgpError, Result};

#[derive(Clone, Debug)]
pub struct GenotypeValues {
    markers: Arc<Markers>,
    samples: Arc<Samples>,
    /// Per marker, sample-major `n_samples * n_unphased`
    unphased: Vec<Vec<f32>>,
    /// Per marker, sample-major `n_samples * n_phased`
    phased: Vec<Vec<f32>>,
}

impl GenotypeValues {
    /// All values start at zero
    pub fn new(markers: Arc<Markers>, samples: Arc<Samples>) -> Self {
        let n_samples = samples.len();
        let unphased = markers
            .iter()
            .map(|m| vec![0.0; n_samples * m.n_unphased_genotypes()])
            .collect();
        let phased = markers
            .iter()
            .map(|m| vec![0.0; n_samples * m.n_phased_genotypes()])
            .collect();
        Self {
            markers,
            samples,
            unphased,
            phased,
        }
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn marker(&self, m: usize) -> &Marker {
        self.markers.marker(MarkerIdx::from(m))
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn n_markers(&self) -> usize {
        self.markers.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn unphased_value(&self, m: usize, sample: usize, gt: usize) -> f32 {
        self.unphased_values(m, sample)[gt]
    }

    #[inline]
    pub fn phased_value(&self, m: usize, sample: usize, gt: usize) -> f32 {
        self.phased_values(m, sample)[gt]
    }

    /// A sample's unphased values in triangular order
    pub fn unphased_values(&self, m: usize, sample: usize) -> &[f32] {
        let n = self.marker(m).n_unphased_genotypes();
        &self.unphased[m][sample * n..(sample + 1) * n]
    }

    /// A sample's phased values, row-major by strand-1 allele
    pub fn phased_values(&self, m: usize, sample: usize) -> &[f32] {
        let n = self.marker(m).n_phased_genotypes();
        &self.phased[m][sample * n..(sample + 1) * n]
    }

    pub fn add_unphased(&mut self, m: usize, sample: usize, gt: usize, value: f32) -> Result<()> {
        check_value(value)?;
        let n = self.marker(m).n_unphased_genotypes();
        if gt >= n {
            return Err(PgpError::invalid_data(format!(
                "unphased genotype {} out of range ({} genotypes)",
                gt, n
            )));
        }
        self.unphased[m][sample * n + gt] += value;
        Ok(())
    }

    /// Add to phased genotype `a1|a2` and to unphased `a1/a2`
    pub fn add_phased(&mut self, m: usize, sample: usize, a1: u8, a2: u8, value: f32) -> Result<()> {
        check_value(value)?;
        let marker = self.marker(m);
        let n_alleles = marker.n_alleles();
        if a1 as usize >= n_alleles || a2 as usize >= n_alleles {
            return Err(PgpError::invalid_data(format!(
                "allele pair {}|{} out of range for {} alleles",
                a1, a2, n_alleles
            )));
        }
        let n_ph = marker.n_phased_genotypes();
        let n_unph = marker.n_unphased_genotypes();
        let gt = marker.phased_genotype(a1, a2);
        self.phased[m][sample * n_ph + gt] += value;
        self.unphased[m][sample * n_unph + unphased_index(a1, a2)] += value;
        Ok(())
    }

    /// Replace one marker's phased values with `values` (sample-major) and
    /// recompute its unphased values from them.
    pub fn set_marker_phased(&mut self, m: usize, values: Vec<f32>) -> Result<()> {
        let marker = self.marker(m);
        let n_alleles = marker.n_alleles();
        let n_ph = marker.n_phased_genotypes();
        let n_unph = marker.n_unphased_genotypes();
        if values.len() != n_ph * self.n_samples() {
            return Err(PgpError::malformed_probs(
                "*",
                marker,
                format!(
                    "expected {} phased values but found {}",
                    n_ph * self.n_samples(),
                    values.len()
                ),
            ));
        }
        if let Some(&v) = values.iter().find(|v| check_value(**v).is_err()) {
            return Err(PgpError::malformed_probs(
                "*",
                marker,
                format!("phased value {} is not a finite non-negative number", v),
            ));
        }

        let unphased = &mut self.unphased[m];
        unphased.iter_mut().for_each(|v| *v = 0.0);
        for (s, sample_values) in values.chunks_exact(n_ph).enumerate() {
            for a1 in 0..n_alleles {
                for a2 in 0..n_alleles {
                    let v = sample_values[a1 * n_alleles + a2];
                    unphased[s * n_unph + unphased_index(a1 as u8, a2 as u8)] += v;
                }
            }
        }
        self.phased[m] = values;
        Ok(())
    }
}

fn check_value(value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PgpError::invalid_data(format!(
            "genotype value must be finite and non-negative: {}",
            value
        )))
    }
}

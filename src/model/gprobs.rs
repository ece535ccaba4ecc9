//! # Posterior Genotype Statistics
//!
//! Per-marker INFO statistics computed from unphased genotype values:
//! estimated allele frequencies (AF), allelic R² (AR2) and dose R² (DR2).
//!
//! Genotypes are collapsed to an ALT dose class: `0` for REF/REF, `1` for
//! REF/ALT, `2` for any pair without REF.
//!
//! ```text
//! AR2 = cov(call, E[dose])² / (var(call) * var(E[dose]))
//! DR2 = var(E[dose]) / E[var(dose)]   (numerator clamped at 0)
//! ```
//! where `call` is the most probable dose class.

use crate::model::genotype_values::GenotypeValues;

#[derive(Clone, Debug)]
pub struct GprobsStatistics {
    n_samples: usize,
    allele_freq: Vec<f32>,
    sum_call: f32,
    sum_square_call: f32,
    sum_expected: f32,
    sum_expected_square: f32,
    sum_square_expected: f32,
    sum_call_expected: f32,
}

impl GprobsStatistics {
    pub fn new(gv: &GenotypeValues, m: usize) -> Self {
        let n_alleles = gv.marker(m).n_alleles();
        let mut stats = Self {
            n_samples: 0,
            allele_freq: vec![0.0; n_alleles],
            sum_call: 0.0,
            sum_square_call: 0.0,
            sum_expected: 0.0,
            sum_expected_square: 0.0,
            sum_square_expected: 0.0,
            sum_call_expected: 0.0,
        };

        let mut al_probs = vec![0.0f32; n_alleles];
        for s in 0..gv.n_samples() {
            let Some(gt_probs) = sample_probs(gv.unphased_values(m, s), &mut al_probs) else {
                continue;
            };
            stats.n_samples += 1;
            for (freq, p) in stats.allele_freq.iter_mut().zip(&al_probs) {
                *freq += p;
            }
            let call = max_index(&gt_probs) as f32;
            let exp = gt_probs[1] + 2.0 * gt_probs[2];
            let exp_square = gt_probs[1] + 4.0 * gt_probs[2];
            stats.sum_call += call;
            stats.sum_square_call += call * call;
            stats.sum_expected += exp;
            stats.sum_expected_square += exp_square;
            stats.sum_square_expected += exp * exp;
            stats.sum_call_expected += call * exp;
        }

        let total: f32 = stats.allele_freq.iter().sum();
        if total > 0.0 {
            stats.allele_freq.iter_mut().for_each(|f| *f /= total);
        }
        stats
    }

    /// Estimated frequency of each allele, REF first
    pub fn allele_freq(&self) -> &[f32] {
        &self.allele_freq
    }

    /// Squared correlation between most probable and expected ALT dose
    pub fn allelic_r2(&self) -> f32 {
        if self.n_samples == 0 {
            return 0.0;
        }
        let f = 1.0 / self.n_samples as f32;
        let cov = self.sum_call_expected - self.sum_call * self.sum_expected * f;
        let var_best = self.sum_square_call - self.sum_call * self.sum_call * f;
        let var_exp = self.sum_square_expected - self.sum_expected * self.sum_expected * f;
        let den = var_best * var_exp;
        if den == 0.0 {
            0.0
        } else {
            ((cov * cov) / den).abs()
        }
    }

    /// Estimated squared correlation between expected and true ALT dose
    pub fn dose_r2(&self) -> f32 {
        if self.n_samples == 0 {
            return 0.0;
        }
        let f = 1.0 / self.n_samples as f32;
        let num = (self.sum_square_expected - self.sum_expected * self.sum_expected * f).max(0.0);
        let den = self.sum_expected_square - self.sum_expected * self.sum_expected * f;
        if den == 0.0 {
            0.0
        } else {
            (num / den).abs()
        }
    }
}

/// Normalised dose-class probabilities for one sample, and per-allele
/// probabilities written into `al_probs`. `None` when the values sum to 0.
fn sample_probs(unphased: &[f32], al_probs: &mut [f32]) -> Option<[f32; 3]> {
    let mut gt_probs = [0.0f32; 3];
    al_probs.iter_mut().for_each(|p| *p = 0.0);
    let mut gt = 0;
    for a2 in 0..al_probs.len() {
        for a1 in 0..=a2 {
            let p = unphased[gt];
            gt += 1;
            al_probs[a1] += p;
            al_probs[a2] += p;
            let class = if a2 == 0 {
                0
            } else if a1 == 0 {
                1
            } else {
                2
            };
            gt_probs[class] += p;
        }
    }
    let sum: f32 = gt_probs.iter().sum();
    if sum == 0.0 {
        return None;
    }
    gt_probs.iter_mut().for_each(|p| *p /= sum);
    al_probs.iter_mut().for_each(|p| *p /= 2.0 * sum);
    Some(gt_probs)
}

fn max_index(probs: &[f32; 3]) -> usize {
    let mut best = 0;
    for (j, &p) in probs.iter().enumerate().skip(1) {
        if p > probs[best] {
            best = j;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::haplotype::Samples;
    use crate::data::marker::{Allele, Marker, Markers};
    use std::sync::Arc;

    fn gv_with(unphased: &[[f32; 3]]) -> GenotypeValues {
        let marker = Marker::new("1", 1, None, Allele::parse("A"), vec![Allele::parse("G")]);
        let ids = (0..unphased.len()).map(|i| format!("S{}", i)).collect();
        let mut gv = GenotypeValues::new(
            Arc::new(Markers::new(vec![marker])),
            Arc::new(Samples::from_ids(ids)),
        );
        for (s, probs) in unphased.iter().enumerate() {
            for (gt, &p) in probs.iter().enumerate() {
                gv.add_unphased(0, s, gt, p).unwrap();
            }
        }
        gv
    }

    #[test]
    fn test_certain_genotypes() {
        let gv = gv_with(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]]);
        let stats = GprobsStatistics::new(&gv, 0);
        assert!((stats.allele_freq()[1] - 3.0 / 8.0).abs() < 1e-6);
        assert!((stats.allele_freq()[0] - 5.0 / 8.0).abs() < 1e-6);
        assert!((stats.allelic_r2() - 1.0).abs() < 1e-5);
        assert!((stats.dose_r2() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_uninformative_genotypes() {
        let gv = gv_with(&[[0.25, 0.5, 0.25], [0.25, 0.5, 0.25]]);
        let stats = GprobsStatistics::new(&gv, 0);
        assert_eq!(stats.dose_r2(), 0.0);
        assert_eq!(stats.allelic_r2(), 0.0);
        assert!((stats.allele_freq()[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_sum_sample_skipped() {
        let gv = gv_with(&[[0.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let stats = GprobsStatistics::new(&gv, 0);
        assert_eq!(stats.allele_freq()[1], 1.0);
        let empty = gv_with(&[[0.0, 0.0, 0.0]]);
        let stats = GprobsStatistics::new(&empty, 0);
        assert_eq!(stats.allele_freq(), &[0.0, 0.0]);
        assert_eq!(stats.dose_r2(), 0.0);
    }
}

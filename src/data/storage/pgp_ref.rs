//! # PGP Reference Genotypes
//!
//! Reference panel genotypes for one marker whose emission probabilities come
//! from the VCF `PGP` (phased genotype probability) field.
//!
//! Every call must be phased with no missing allele. Of each sample's
//! `n_alleles²` PGP vector only the entry for the stored orientation `a1|a2`
//! is kept as `p`; the flipped orientation `a2|a1` is implicitly `1 - p` and
//! every other pair has probability 0.

use std::fmt;
use std::sync::Arc;

use crate::data::haplotype::Samples;
use crate::data::marker::Marker;
use crate::data::storage::packed::PackedAllelePanel;
use crate::error::{PgpError, Result};
use crate::io::vcf::VcfRecord;
use crate::model::emission::GenotypeEmission;

/// FORMAT code of the genotype field
pub const GT_FORMAT: &str = "GT";
/// FORMAT code of the phased genotype probability field
pub const PGP_FORMAT: &str = "PGP";

/// Immutable PGP-backed reference genotypes for one marker
#[derive(Clone, Debug)]
pub struct PgpRefGt {
    marker: Marker,
    samples: Arc<Samples>,
    alleles: PackedAllelePanel,
    /// Probability of the stored `allele1|allele2` orientation, per sample
    phase1_probs: Vec<f32>,
}

impl PgpRefGt {
    /// Build from a VCF record carrying `GT` and `PGP` FORMAT fields.
    pub fn from_record(rec: &VcfRecord) -> Result<Self> {
        if rec.n_samples() == 0 {
            return Err(PgpError::invalid_data(format!(
                "missing sample data: {}",
                rec.marker()
            )));
        }
        if !rec.has_format(GT_FORMAT) {
            return Err(PgpError::vcf(format!("missing GT FORMAT: {}", rec.marker())));
        }
        let pgp_data = rec
            .format_data(PGP_FORMAT)
            .ok_or_else(|| PgpError::vcf(format!("missing PGP FORMAT: {}", rec.marker())))?;

        let marker = rec.marker();
        let samples = rec.samples();
        let alleles = PackedAllelePanel::from_calls(marker, samples, rec.genotypes())?;

        let n_pgp = marker.n_phased_genotypes();
        let mut phase1_probs = Vec::with_capacity(rec.n_samples());
        for (s, field) in pgp_data.iter().enumerate() {
            let tokens: Vec<&str> = field.split(',').collect();
            if tokens.len() != n_pgp {
                return Err(PgpError::malformed_probs(
                    samples.id(s),
                    marker,
                    format!(
                        "expected {} tokens in PGP FORMAT field but found {}",
                        n_pgp,
                        tokens.len()
                    ),
                ));
            }
            let gt = marker.phased_genotype(alleles.allele1(s), alleles.allele2(s));
            let p = tokens[gt].parse::<f32>().map_err(|_| {
                PgpError::malformed_probs(
                    samples.id(s),
                    marker,
                    format!("unparsable PGP value: {:?}", tokens[gt]),
                )
            })?;
            phase1_probs.push(check_prob(p, samples.id(s), marker)?);
        }

        Ok(Self {
            marker: marker.clone(),
            samples: Arc::clone(samples),
            alleles,
            phase1_probs,
        })
    }

    /// Build from packed calls and each sample's full PGP vector, ordered by
    /// [`Marker::phased_genotype`]. The calls must have been packed for
    /// `marker`, else `InconsistentMarkers`.
    pub fn from_phased_probs<V: AsRef<[f32]>>(
        marker: Marker,
        samples: Arc<Samples>,
        alleles: PackedAllelePanel,
        pgp: &[V],
    ) -> Result<Self> {
        if alleles.n_samples() != samples.len() || pgp.len() != samples.len() {
            return Err(PgpError::inconsistent_samples(format!(
                "{} samples, {} genotype calls, {} PGP vectors at marker {}",
                samples.len(),
                alleles.n_samples(),
                pgp.len(),
                marker
            )));
        }
        alleles.check_marker(&marker)?;
        let n_pgp = marker.n_phased_genotypes();
        let mut phase1_probs = Vec::with_capacity(samples.len());
        for (s, probs) in pgp.iter().enumerate() {
            let probs = probs.as_ref();
            if probs.len() != n_pgp {
                return Err(PgpError::malformed_probs(
                    samples.id(s),
                    &marker,
                    format!("expected {} PGP values but found {}", n_pgp, probs.len()),
                ));
            }
            let gt = marker.phased_genotype(alleles.allele1(s), alleles.allele2(s));
            phase1_probs.push(check_prob(probs[gt], samples.id(s), &marker)?);
        }
        Ok(Self {
            marker,
            samples,
            alleles,
            phase1_probs,
        })
    }

    /// Probability of the stored orientation for a sample
    pub fn phase1_prob(&self, sample: usize) -> f32 {
        self.phase1_probs[sample]
    }

    pub fn alleles(&self) -> &PackedAllelePanel {
        &self.alleles
    }

    pub fn samples_arc(&self) -> Arc<Samples> {
        Arc::clone(&self.samples)
    }
}

fn check_prob(p: f32, sample: &str, marker: &Marker) -> Result<f32> {
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(PgpError::malformed_probs(
            sample,
            marker,
            format!("PGP value {} outside [0, 1]", p),
        ))
    }
}

impl GenotypeEmission for PgpRefGt {
    fn marker(&self) -> &Marker {
        &self.marker
    }

    fn samples(&self) -> &Samples {
        &self.samples
    }

    fn is_missing_data(&self) -> bool {
        false
    }

    fn is_ref_data(&self) -> bool {
        true
    }

    #[inline]
    fn gl(&self, sample: usize, a1: u8, a2: u8) -> f32 {
        let b1 = self.alleles.allele1(sample);
        let b2 = self.alleles.allele2(sample);
        if a1 == b1 && a2 == b2 {
            self.phase1_probs[sample]
        } else if a1 == b2 && a2 == b1 {
            1.0 - self.phase1_probs[sample]
        } else {
            0.0
        }
    }

    fn is_phased(&self, _sample: usize) -> bool {
        true
    }

    fn allele1(&self, sample: usize) -> u8 {
        self.alleles.allele1(sample)
    }

    fn allele2(&self, sample: usize) -> u8 {
        self.alleles.allele2(sample)
    }
}

/// A GT-only VCF record
impl fmt::Display for PgpRefGt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t.\tPASS\t.\tGT", self.marker)?;
        for s in 0..self.samples.len() {
            write!(f, "\t{}|{}", self.alleles.allele1(s), self.alleles.allele2(s))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::marker::Allele;
    use crate::error::GenotypeFault;

    const HEADER_SAMPLES: [&str; 3] = ["S0", "S1", "S2"];

    fn samples() -> Arc<Samples> {
        Arc::new(Samples::from_ids(
            HEADER_SAMPLES.iter().map(|s| s.to_string()).collect(),
        ))
    }

    fn record(line: &str) -> Result<VcfRecord> {
        VcfRecord::parse(line, 1, samples())
    }

    fn panel(line: &str) -> PgpRefGt {
        PgpRefGt::from_record(&record(line).unwrap()).unwrap()
    }

    const BIALLELIC: &str = "1\t100\trs1\tA\tG\t.\tPASS\t.\tGT:PGP\t\
        0|1:0.1,0.8,0.1,0\t1|0:0,0.3,0.7,0\t1|1:0,0,0,1";

    #[test]
    fn test_keeps_stored_orientation_prob() {
        let gt = panel(BIALLELIC);
        assert_eq!(gt.n_samples(), 3);
        assert_eq!(gt.phase1_prob(0), 0.8);
        assert_eq!(gt.phase1_prob(1), 0.7);
        assert_eq!(gt.phase1_prob(2), 1.0);
        assert_eq!((gt.allele1(1), gt.allele2(1)), (1, 0));
    }

    #[test]
    fn test_gl_two_point_model() {
        let gt = panel(BIALLELIC);
        assert_eq!(gt.gl(0, 0, 1), 0.8);
        assert!((gt.gl(0, 1, 0) - 0.2).abs() < 1e-6);
        assert_eq!(gt.gl(0, 0, 0), 0.0);
        assert_eq!(gt.gl(0, 1, 1), 0.0);
        // alleles beyond the marker are still answered
        assert_eq!(gt.gl(0, 7, 9), 0.0);

        for s in 0..2 {
            let (a1, a2) = (gt.allele1(s), gt.allele2(s));
            let total = gt.gl(s, a1, a2) + gt.gl(s, a2, a1);
            assert!((total - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_phased_and_present() {
        let gt = panel(BIALLELIC);
        assert!(gt.is_phased(0));
        assert!(!gt.is_missing_data());
        assert!(gt.is_ref_data());
    }

    #[test]
    fn test_display_gt_record() {
        let gt = panel(BIALLELIC);
        assert_eq!(
            gt.to_string(),
            "1\t100\trs1\tA\tG\t.\tPASS\t.\tGT\t0|1\t1|0\t1|1"
        );
    }

    #[test]
    fn test_rejects_unphased_sample() {
        let line = "1\t100\trs1\tA\tG\t.\tPASS\t.\tGT:PGP\t\
            0|1:0,1,0,0\t0/1:0,1,0,0\t0|0:1,0,0,0";
        let err = PgpRefGt::from_record(&record(line).unwrap()).unwrap_err();
        match err {
            PgpError::MalformedGenotype { sample, kind, .. } => {
                assert_eq!(sample, "S1");
                assert_eq!(kind, GenotypeFault::Unphased);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_missing_allele() {
        let line = "1\t100\trs1\tA\tG\t.\tPASS\t.\tGT:PGP\t\
            0|1:0,1,0,0\t0|0:1,0,0,0\t.|1:0,1,0,0";
        let err = PgpRefGt::from_record(&record(line).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            PgpError::MalformedGenotype { ref sample, kind: GenotypeFault::MissingAllele, .. }
                if sample == "S2"
        ));
    }

    #[test]
    fn test_rejects_short_pgp() {
        let line = "1\t100\trs1\tA\tG\t.\tPASS\t.\tGT:PGP\t\
            0|1:0,1,0\t0|0:1,0,0,0\t0|0:1,0,0,0";
        let err = PgpRefGt::from_record(&record(line).unwrap()).unwrap_err();
        match err {
            PgpError::MalformedProbabilityVector { sample, reason, .. } => {
                assert_eq!(sample, "S0");
                assert!(reason.contains("expected 4"));
                assert!(reason.contains("found 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_out_of_range_prob() {
        let line = "1\t100\trs1\tA\tG\t.\tPASS\t.\tGT:PGP\t\
            0|1:0,1.5,0,0\t0|0:1,0,0,0\t0|0:1,0,0,0";
        assert!(matches!(
            PgpRefGt::from_record(&record(line).unwrap()),
            Err(PgpError::MalformedProbabilityVector { .. })
        ));
        let line = "1\t100\trs1\tA\tG\t.\tPASS\t.\tGT:PGP\t\
            0|1:0,x,0,0\t0|0:1,0,0,0\t0|0:1,0,0,0";
        assert!(matches!(
            PgpRefGt::from_record(&record(line).unwrap()),
            Err(PgpError::MalformedProbabilityVector { .. })
        ));
    }

    #[test]
    fn test_requires_pgp_format() {
        let line = "1\t100\trs1\tA\tG\t.\tPASS\t.\tGT\t0|1\t0|0\t1|1";
        assert!(matches!(
            PgpRefGt::from_record(&record(line).unwrap()),
            Err(PgpError::Vcf { .. })
        ));
    }

    #[test]
    fn test_from_phased_probs_triallelic() {
        let marker = Marker::new(
            "2",
            50,
            None,
            Allele::parse("A"),
            vec![Allele::parse("C"), Allele::parse("T")],
        );
        let alleles = PackedAllelePanel::from_pairs(&[(2, 0), (1, 1), (0, 2)], 3).unwrap();
        let mut v0 = vec![0.0f32; 9];
        v0[marker.phased_genotype(2, 0)] = 0.6;
        v0[marker.phased_genotype(0, 2)] = 0.4;
        let v1 = {
            let mut v = vec![0.0f32; 9];
            v[4] = 1.0;
            v
        };
        let mut v2 = vec![0.0f32; 9];
        v2[marker.phased_genotype(0, 2)] = 0.25;
        v2[marker.phased_genotype(2, 0)] = 0.75;

        let gt = PgpRefGt::from_phased_probs(marker, samples(), alleles, &[v0, v1, v2]).unwrap();
        assert_eq!(gt.gl(0, 2, 0), 0.6);
        assert!((gt.gl(0, 0, 2) - 0.4).abs() < 1e-6);
        assert_eq!(gt.gl(1, 1, 1), 1.0);
        assert_eq!(gt.gl(2, 0, 2), 0.25);
        assert_eq!(gt.gl(2, 2, 0), 0.75);
        assert_eq!(gt.gl(2, 1, 2), 0.0);
    }

    #[test]
    fn test_from_phased_probs_rejects_foreign_panel() {
        let marker = Marker::new("2", 50, None, Allele::parse("A"), vec![Allele::parse("C")]);
        let one = Arc::new(Samples::from_ids(vec!["S0".to_string()]));
        let alleles = PackedAllelePanel::from_pairs(&[(2, 2)], 3).unwrap();
        let pgp = [vec![0.25f32; 4]];
        let err = PgpRefGt::from_phased_probs(marker.clone(), Arc::clone(&one), alleles, &pgp)
            .unwrap_err();
        assert!(matches!(err, PgpError::InconsistentMarkers { .. }));

        let alleles = PackedAllelePanel::from_pairs(&[(0, 1)], 2).unwrap();
        let pgp = [vec![0.1f32, 0.6, 0.3, 0.0]];
        let gt = PgpRefGt::from_phased_probs(marker, one, alleles, &pgp).unwrap();
        assert_eq!(gt.phase1_prob(0), 0.6);
    }
}

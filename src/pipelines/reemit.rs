//! # Re-emit Pipeline
//!
//! Reads a reference VCF carrying phased `GT` and `PGP` fields, validates
//! every record into a [`PgpRefGt`], and writes the panel back out as
//! `GT:DS:GP[:PGP]` records (or GT only).
//!
//! Records are processed in batches: each batch is parsed and validated in
//! parallel, then written in input order before the next batch is read.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::info_span;

use crate::config::Config;
use crate::data::storage::hap_pairs::SampleHapPairs;
use crate::data::storage::pgp_ref::{PgpRefGt, PGP_FORMAT};
use crate::error::{PgpError, Result};
use crate::io::vcf::{VcfReader, VcfRecord};
use crate::io::vcf_writer::{FormatFields, VcfWriter};
use crate::model::genotype_values::GenotypeValues;

/// Counts reported at the end of a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReemitSummary {
    pub n_samples: usize,
    pub n_records: usize,
    pub n_written: usize,
}

pub struct ReemitPipeline {
    config: Config,
}

impl ReemitPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&mut self) -> Result<ReemitSummary> {
        let mut reader = VcfReader::open(&self.config.r#ref)?;
        let samples = reader.samples_arc();
        let out_path = self.config.output_path();
        eprintln!("Samples: {}", samples.len());
        eprintln!("Output: {:?}", out_path);

        let gt_only = self.config.gt_only;
        let fields = if gt_only {
            FormatFields::gt_only()
        } else {
            FormatFields::with_probs()
        };
        let mut writer = VcfWriter::create(&out_path)?;
        writer.write_meta_lines(samples.ids(), self.config.source.as_deref(), fields)?;

        let write_snps = self.config.write_snps();
        let mut summary = ReemitSummary {
            n_samples: samples.len(),
            ..Default::default()
        };
        loop {
            let batch = reader.read_batch(self.config.batch)?;
            if batch.is_empty() {
                break;
            }
            let built = info_span!("build_panels", n_records = batch.len()).in_scope(|| {
                batch
                    .par_iter()
                    .map(|rec| {
                        let panel = PgpRefGt::from_record(rec)?;
                        let pgp = if gt_only {
                            Vec::new()
                        } else {
                            pgp_values(rec)?
                        };
                        Ok((panel, pgp))
                    })
                    .collect::<Result<Vec<_>>>()
            })?;
            let (panels, values): (Vec<PgpRefGt>, Vec<Vec<f32>>) = built.into_iter().unzip();

            let haps = SampleHapPairs::from_ref_panels(&panels)?;
            let n = haps.n_markers();
            if gt_only {
                writer.append_gt_records(&haps, 0, n, write_snps)?;
            } else {
                let mut gv = GenotypeValues::new(haps.markers_arc(), Arc::clone(&samples));
                for (m, pgp) in values.into_iter().enumerate() {
                    gv.set_marker_phased(m, pgp)?;
                }
                writer.append_records(&haps, &gv, 0, n, write_snps)?;
            }

            summary.n_records += n;
            summary.n_written += haps
                .markers()
                .iter()
                .filter(|m| write_snps || !m.is_snp())
                .count();
            tracing::debug!(n_records = summary.n_records, "batch written");
        }
        writer.flush()?;

        tracing::info!(
            n_records = summary.n_records,
            n_written = summary.n_written,
            "re-emitted reference panel"
        );
        eprintln!(
            "Records: {} read, {} written",
            summary.n_records, summary.n_written
        );
        Ok(summary)
    }
}

/// Every sample's PGP vector, concatenated in sample order
fn pgp_values(rec: &VcfRecord) -> Result<Vec<f32>> {
    let marker = rec.marker();
    let n_pgp = marker.n_phased_genotypes();
    let data = rec
        .format_data(PGP_FORMAT)
        .ok_or_else(|| PgpError::vcf(format!("missing PGP FORMAT: {}", marker)))?;
    let mut values = Vec::with_capacity(n_pgp * data.len());
    for (s, field) in data.iter().enumerate() {
        let start = values.len();
        for token in field.split(',') {
            let v = token.parse::<f32>().map_err(|_| {
                PgpError::malformed_probs(
                    rec.samples().id(s),
                    marker,
                    format!("unparsable PGP value: {:?}", token),
                )
            })?;
            if !v.is_finite() || v < 0.0 {
                return Err(PgpError::malformed_probs(
                    rec.samples().id(s),
                    marker,
                    format!("PGP value {} is not a finite non-negative number", token),
                ));
            }
            values.push(v);
        }
        if values.len() - start != n_pgp {
            return Err(PgpError::malformed_probs(
                rec.samples().id(s),
                marker,
                format!(
                    "expected {} tokens in PGP FORMAT field but found {}",
                    n_pgp,
                    values.len() - start
                ),
            ));
        }
    }
    Ok(values)
}

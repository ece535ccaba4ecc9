//! # VCF Writing
//!
//! Writes phased haplotypes with posterior genotype probabilities as VCF 4.1
//! records: `GT:DS:GP`, plus `PGP` at markers that carry an annotated START.
//!
//! Probabilities are divided by the sample's total unphased value and
//! printed with at most three fractional digits. A sample whose values sum
//! to zero gets `.` for every probability subfield.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;
use tracing::info_span;

use crate::data::marker::Marker;
use crate::data::storage::hap_pairs::SampleHapPairs;
use crate::error::{PgpError, Result};
use crate::model::genotype_values::GenotypeValues;
use crate::model::gprobs::GprobsStatistics;
use crate::model::orientation::PgpOrientation;

const PASS: &str = "PASS";
const MISSING: char = '.';

/// Samples rendered per rayon task within one record
const SAMPLE_CHUNK: usize = 512;

const FILEFORMAT: &str = "##fileformat=VCFv4.1";
const AF_INFO: &str = "##INFO=<ID=AF,Number=A,Type=Float,\
    Description=\"Estimated Allele Frequencies\">";
const AR2_INFO: &str = "##INFO=<ID=AR2,Number=1,Type=Float,\
    Description=\"Allelic R-Squared: estimated correlation between \
    most probable ALT dose and true ALT dose\">";
const DR2_INFO: &str = "##INFO=<ID=DR2,Number=1,Type=Float,\
    Description=\"Dosage R-Squared: estimated correlation between \
    estimated ALT dose [P(RA) + 2*P(AA)] and true ALT dose\">";
const START_INFO: &str = "##INFO=<ID=START,Number=1,Type=Integer,\
    Description=\"Start coordinate for original annotated region\">";
const END_INFO: &str = "##INFO=<ID=END,Number=1,Type=Integer,\
    Description=\"End coordinate for original annotated region\">";
const GT_FORMAT: &str = "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">";
const DS_FORMAT: &str = "##FORMAT=<ID=DS,Number=1,Type=Float,\
    Description=\"estimated ALT dose [P(RA) + P(AA)]\">";
const GL_FORMAT: &str = "##FORMAT=<ID=GL,Number=G,Type=Float,\
    Description=\"Log10-scaled Genotype Likelihood\">";
const GP_FORMAT: &str = "##FORMAT=<ID=GP,Number=G,Type=Float,\
    Description=\"Estimated Genotype Probability\">";
const PGP_FORMAT: &str = "##FORMAT=<ID=PGP,Number=.,Type=Float,\
    Description=\"Estimated Genotype Probability for each Phased Genotype\">";
const CHROM_PREFIX: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT";

/// Which FORMAT fields the meta-information lines declare
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatFields {
    pub gt: bool,
    pub gp: bool,
    pub gl: bool,
}

impl FormatFields {
    /// GT only
    pub fn gt_only() -> Self {
        Self {
            gt: true,
            gp: false,
            gl: false,
        }
    }

    /// GT with DS, GP and PGP
    pub fn with_probs() -> Self {
        Self {
            gt: true,
            gp: true,
            gl: false,
        }
    }
}

/// Format with at most three fractional digits, rounding half to even and
/// dropping trailing zeros (`1.3`, `0`, `0.125`).
pub fn format_df3(value: f64) -> String {
    let mut s = String::new();
    push_df3(&mut s, value);
    s
}

fn push_df3(buf: &mut String, value: f64) {
    let start = buf.len();
    let _ = write!(buf, "{:.3}", value);
    if buf[start..].contains('.') {
        let trimmed = buf.trim_end_matches('0').trim_end_matches('.').len();
        buf.truncate(trimmed);
    }
    if &buf[start..] == "-0" {
        buf.truncate(start);
        buf.push('0');
    }
}

/// Total of a sample's unphased values and its expected ALT allele count
fn sum_and_alt_dose(unphased: &[f32], n_alleles: usize) -> (f32, f32) {
    let mut sum = 0.0f32;
    let mut alt_sum = 0.0f32;
    let mut gt = 0;
    for a2 in 0..n_alleles {
        for a1 in 0..=a2 {
            let f = unphased[gt];
            gt += 1;
            sum += f;
            let n_alt = (a1 != 0) as u8 + (a2 != 0) as u8;
            alt_sum += n_alt as f32 * f;
        }
    }
    debug_assert_eq!(gt, unphased.len());
    (sum, alt_sum)
}

/// VCF file writer
pub struct VcfWriter<W: Write> {
    writer: W,
}

impl VcfWriter<Box<dyn Write + Send>> {
    /// Create a writer for `path`, BGZF-compressed if it ends in `.gz`/`.bgz`
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;

        let is_gzipped = path
            .extension()
            .map(|e| e == "gz" || e == "bgz")
            .unwrap_or(false);

        let writer: Box<dyn Write + Send> = if is_gzipped {
            Box::new(BufWriter::new(noodles::bgzf::Writer::new(file)))
        } else {
            Box::new(BufWriter::new(file))
        };

        Ok(Self { writer })
    }
}

impl<W: Write> VcfWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write meta-information lines dated today
    pub fn write_meta_lines<S: AsRef<str>>(
        &mut self,
        sample_ids: &[S],
        source: Option<&str>,
        fields: FormatFields,
    ) -> Result<()> {
        let today = chrono::Local::now().format("%Y%m%d").to_string();
        self.write_meta_lines_dated(sample_ids, source, fields, &today)
    }

    /// Write meta-information lines with an explicit `##filedate`
    pub fn write_meta_lines_dated<S: AsRef<str>>(
        &mut self,
        sample_ids: &[S],
        source: Option<&str>,
        fields: FormatFields,
        filedate: &str,
    ) -> Result<()> {
        info_span!("vcf_write_header").in_scope(|| {
            if let Some(j) = sample_ids.iter().position(|id| id.as_ref().is_empty()) {
                return Err(PgpError::invalid_data(format!("empty sample id at column {}", j)));
            }
            let w = &mut self.writer;
            writeln!(w, "{}", FILEFORMAT)?;
            writeln!(w, "##filedate={}", filedate)?;
            if let Some(source) = source {
                writeln!(w, "##source=\"{}\"", source)?;
            }
            if fields.gp {
                writeln!(w, "{}", AF_INFO)?;
                writeln!(w, "{}", AR2_INFO)?;
                writeln!(w, "{}", DR2_INFO)?;
            }
            writeln!(w, "{}", START_INFO)?;
            writeln!(w, "{}", END_INFO)?;
            if fields.gt {
                writeln!(w, "{}", GT_FORMAT)?;
            }
            if fields.gl {
                writeln!(w, "{}", GL_FORMAT)?;
            }
            if fields.gp {
                writeln!(w, "{}", DS_FORMAT)?;
                writeln!(w, "{}", GP_FORMAT)?;
                writeln!(w, "{}", PGP_FORMAT)?;
            }
            write!(w, "{}", CHROM_PREFIX)?;
            for id in sample_ids {
                write!(w, "\t{}", id.as_ref())?;
            }
            writeln!(w)?;
            Ok(())
        })
    }

    /// Write GT-only fixed fields: `marker . PASS . GT`
    pub fn print_fixed_fields_gt(&mut self, marker: &Marker) -> Result<()> {
        let mut buf = String::with_capacity(64);
        push_fixed_fields_gt(&mut buf, marker);
        self.writer.write_all(buf.as_bytes())?;
        Ok(())
    }

    /// Write GT-only records for markers `start..end`
    pub fn append_gt_records(
        &mut self,
        haps: &SampleHapPairs,
        start: usize,
        end: usize,
        write_snps: bool,
    ) -> Result<()> {
        check_range(start, end, haps.n_markers())?;
        info_span!("vcf_write_gt", n_markers = end - start).in_scope(|| {
            let mut line_buf = String::with_capacity(haps.n_samples() * 4 + 64);
            for m in start..end {
                let marker = haps.marker(m);
                if !write_snps && marker.is_snp() {
                    continue;
                }
                line_buf.clear();
                push_fixed_fields_gt(&mut line_buf, marker);
                for s in 0..haps.n_samples() {
                    let _ = write!(line_buf, "\t{}|{}", haps.allele1(m, s), haps.allele2(m, s));
                }
                line_buf.push('\n');
                self.writer.write_all(line_buf.as_bytes())?;
            }
            Ok(())
        })
    }

    /// Write `GT:DS:GP[:PGP]` records for markers `start..end`.
    ///
    /// Markers that are SNPs are skipped unless `write_snps`.
    pub fn append_records(
        &mut self,
        haps: &SampleHapPairs,
        gv: &GenotypeValues,
        start: usize,
        end: usize,
        write_snps: bool,
    ) -> Result<()> {
        check_range(start, end, haps.n_markers())?;
        if haps.markers() != gv.markers() {
            return Err(PgpError::inconsistent_markers(
                "haplotype pairs and genotype values have different markers",
            ));
        }
        let sample_map = haps
            .samples()
            .ids()
            .iter()
            .map(|id| {
                gv.samples()
                    .index_of(id)
                    .map(|idx| idx.as_usize())
                    .ok_or_else(|| {
                        PgpError::inconsistent_samples(format!(
                            "sample {} has no genotype values",
                            id
                        ))
                    })
            })
            .collect::<Result<Vec<usize>>>()?;

        info_span!("vcf_write_records", n_markers = end - start).in_scope(|| {
            let mut written = 0usize;
            for m in start..end {
                if !write_snps && gv.marker(m).is_snp() {
                    continue;
                }
                let mut line_buf = fixed_fields(gv, m);
                let chunks: Vec<String> = sample_map
                    .par_chunks(SAMPLE_CHUNK)
                    .enumerate()
                    .map(|(c, chunk)| {
                        let mut buf = String::with_capacity(chunk.len() * 32);
                        for (k, &gv_sample) in chunk.iter().enumerate() {
                            let hap_sample = c * SAMPLE_CHUNK + k;
                            push_sample(&mut buf, haps, gv, m, hap_sample, gv_sample);
                        }
                        buf
                    })
                    .collect();
                for chunk in &chunks {
                    line_buf.push_str(chunk);
                }
                line_buf.push('\n');
                self.writer.write_all(line_buf.as_bytes())?;
                written += 1;
            }
            tracing::debug!(written, skipped = end - start - written, "wrote VCF records");
            Ok(())
        })
    }

    /// Flush the writer
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying sink
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.writer)
    }
}

fn check_range(start: usize, end: usize, n_markers: usize) -> Result<()> {
    if start > end || end > n_markers {
        return Err(PgpError::invalid_data(format!(
            "invalid marker range: start={} end={} n_markers={}",
            start, end, n_markers
        )));
    }
    Ok(())
}

/// `marker . PASS . GT`
fn push_fixed_fields_gt(buf: &mut String, marker: &Marker) {
    let _ = write!(buf, "{}\t{}\t{}\t{}\tGT", marker, MISSING, PASS, MISSING);
}

/// `marker . PASS AR2=..;DR2=..;AF=..[;START=..][;END=..] GT:DS:GP[:PGP]`
fn fixed_fields(gv: &GenotypeValues, m: usize) -> String {
    let marker = gv.marker(m);
    let stats = GprobsStatistics::new(gv, m);
    let mut buf = String::with_capacity(gv.n_samples() * 32 + 128);
    let _ = write!(buf, "{}\t{}\t{}\tAR2=", marker, MISSING, PASS);
    push_df3(&mut buf, stats.allelic_r2() as f64);
    buf.push_str(";DR2=");
    push_df3(&mut buf, stats.dose_r2() as f64);
    for (j, &freq) in stats.allele_freq().iter().enumerate().skip(1) {
        buf.push_str(if j == 1 { ";AF=" } else { "," });
        push_df3(&mut buf, freq as f64);
    }
    if let Some(start) = marker.start {
        let _ = write!(buf, ";START={}", start);
    }
    if let Some(end) = marker.end {
        let _ = write!(buf, ";END={}", end);
    }
    buf.push_str(if marker.has_region() {
        "\tGT:DS:GP:PGP"
    } else {
        "\tGT:DS:GP"
    });
    buf
}

/// `\ta1|a2:DS:GP[:PGP]` for one sample
fn push_sample(
    buf: &mut String,
    haps: &SampleHapPairs,
    gv: &GenotypeValues,
    m: usize,
    hap_sample: usize,
    gv_sample: usize,
) {
    let marker = gv.marker(m);
    let h1 = haps.allele1(m, hap_sample);
    let h2 = haps.allele2(m, hap_sample);
    let _ = write!(buf, "\t{}|{}", h1, h2);

    let unphased = gv.unphased_values(m, gv_sample);
    let (sum, alt_dose) = sum_and_alt_dose(unphased, marker.n_alleles());
    if sum == 0.0 {
        let n_missing = if marker.has_region() { 3 } else { 2 };
        for _ in 0..n_missing {
            buf.push(':');
            buf.push(MISSING);
        }
        return;
    }

    buf.push(':');
    push_df3(buf, (alt_dose / sum) as f64);
    for (gt, &v) in unphased.iter().enumerate() {
        buf.push(if gt == 0 { ':' } else { ',' });
        push_df3(buf, (v / sum) as f64);
    }

    if marker.has_region() {
        let pgp = gv.phased_values(m, gv_sample);
        let orientation = PgpOrientation::resolve(marker, pgp, h1, h2);
        for (j, v) in orientation.matrix(marker, pgp).enumerate() {
            buf.push(if j == 0 { ':' } else { ',' });
            push_df3(buf, (v / sum) as f64);
        }
    }
}

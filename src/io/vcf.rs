//! # VCF Reading
//!
//! Line-oriented reader producing one [`VcfRecord`] per data line. The header
//! is parsed with `noodles`; data lines are split by hand so that only the
//! FORMAT subfields a caller asks for are ever materialised.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use noodles::vcf::Header;
use tracing::info_span;

use crate::data::genotype_index::MAX_ALLELES;
use crate::data::haplotype::Samples;
use crate::data::marker::{Allele, Marker};
use crate::data::storage::packed::GenotypeCall;
use crate::error::{PgpError, Result};

/// Maximum supported allele index (u8 storage)
pub const MAX_ALLELE_INDEX: u16 = 254;

/// One parsed VCF data line
#[derive(Clone, Debug)]
pub struct VcfRecord {
    marker: Marker,
    samples: Arc<Samples>,
    format: Vec<String>,
    sample_fields: Vec<String>,
    /// Parsed GT subfields, empty if the record has no GT field
    calls: Vec<GenotypeCall>,
}

impl VcfRecord {
    /// Parse a tab-delimited data line. `line_no` is 1-based and only used
    /// in error messages.
    pub fn parse(line: &str, line_no: usize, samples: Arc<Samples>) -> Result<Self> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() < 8 {
            return Err(PgpError::parse(
                line_no,
                format!("Expected at least 8 fields, got {}", fields.len()),
            ));
        }
        let sample_fields: Vec<String> = fields.iter().skip(9).map(|s| s.to_string()).collect();
        if sample_fields.len() != samples.len() {
            return Err(PgpError::parse(
                line_no,
                format!(
                    "Expected {} sample columns, got {}",
                    samples.len(),
                    sample_fields.len()
                ),
            ));
        }

        let pos = fields[1]
            .parse::<u32>()
            .map_err(|_| PgpError::parse(line_no, format!("Invalid POS: {}", fields[1])))?;
        let id = (fields[2] != ".").then_some(fields[2]);
        let alts = if fields[4] == "." {
            Vec::new()
        } else {
            fields[4].split(',').map(Allele::parse).collect()
        };
        if alts.len() + 1 > MAX_ALLELES {
            return Err(PgpError::parse(
                line_no,
                format!(
                    "{} alleles exceeds maximum supported count {}",
                    alts.len() + 1,
                    MAX_ALLELES
                ),
            ));
        }
        let (start, end) = parse_region(fields[7], line_no)?;
        let marker = Marker::new(fields[0], pos, id, Allele::parse(fields[3]), alts)
            .with_region(start, end);

        let format: Vec<String> = fields
            .get(8)
            .map(|f| f.split(':').map(str::to_string).collect())
            .unwrap_or_default();

        let mut record = Self {
            marker,
            samples,
            format,
            sample_fields,
            calls: Vec::new(),
        };
        if let Some(gt_data) = record.format_data("GT") {
            let calls = gt_data
                .iter()
                .map(|gt| parse_genotype(gt, line_no))
                .collect::<Result<Vec<_>>>()?;
            record.calls = calls;
        }
        Ok(record)
    }

    pub fn marker(&self) -> &Marker {
        &self.marker
    }

    pub fn samples(&self) -> &Arc<Samples> {
        &self.samples
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn has_format(&self, code: &str) -> bool {
        self.format.iter().any(|f| f == code)
    }

    /// Per-sample subfield for a FORMAT code, `.` where a sample omits
    /// trailing subfields. `None` if the code is not in the FORMAT column.
    pub fn format_data(&self, code: &str) -> Option<Vec<&str>> {
        let k = self.format.iter().position(|f| f == code)?;
        Some(
            self.sample_fields
                .iter()
                .map(|field| field.split(':').nth(k).unwrap_or("."))
                .collect(),
        )
    }

    /// Parsed GT calls, one per sample
    pub fn genotypes(&self) -> &[GenotypeCall] {
        &self.calls
    }

    /// Allele on `strand` (0 or 1), `None` if missing
    pub fn gt(&self, sample: usize, strand: usize) -> Option<u8> {
        let call = self.calls.get(sample)?;
        if strand == 0 {
            call.a1
        } else {
            call.a2
        }
    }

    pub fn is_phased(&self, sample: usize) -> bool {
        self.calls.get(sample).is_some_and(|c| c.phased)
    }
}

/// Extract INFO `START` and `END`
fn parse_region(info: &str, line_no: usize) -> Result<(Option<i64>, Option<i64>)> {
    let mut start = None;
    let mut end = None;
    if info == "." {
        return Ok((start, end));
    }
    for entry in info.split(';') {
        let (raw, slot) = match entry.split_once('=') {
            Some(("START", v)) => (v, &mut start),
            Some(("END", v)) => (v, &mut end),
            _ => continue,
        };
        let value = raw
            .parse::<i64>()
            .map_err(|_| PgpError::parse(line_no, format!("Invalid INFO value: {}", entry)))?;
        *slot = (value != -1).then_some(value);
    }
    Ok((start, end))
}

/// Parse a genotype field (e.g., "0|1", "0/1", ".")
///
/// - `.` and `.|.` are phased calls with both alleles missing
/// - a haploid call keeps its allele in `a1` with `a2` missing
/// - more than two alleles is a parse error
fn parse_genotype(gt: &str, line_no: usize) -> Result<GenotypeCall> {
    if gt == "." {
        return Ok(GenotypeCall {
            a1: None,
            a2: None,
            phased: true,
        });
    }

    let phased = !gt.contains('/');
    let mut parts = gt.split(['|', '/']);
    let a1 = parse_allele(parts.next().unwrap_or("."), line_no)?;
    let a2 = match parts.next() {
        Some(s) => parse_allele(s, line_no)?,
        None => None,
    };
    if parts.next().is_some() {
        return Err(PgpError::parse(
            line_no,
            format!("Unsupported ploidy in genotype: {}", gt),
        ));
    }
    Ok(GenotypeCall { a1, a2, phased })
}

/// Parse a single allele; `None` for missing (.)
#[inline]
fn parse_allele(s: &str, line_no: usize) -> Result<Option<u8>> {
    if s == "." || s.is_empty() {
        return Ok(None);
    }

    // Fast path for single digit alleles (most common case)
    if let [c @ b'0'..=b'9'] = s.as_bytes() {
        return Ok(Some(c - b'0'));
    }

    match s.parse::<u16>() {
        Ok(val) if val <= MAX_ALLELE_INDEX => Ok(Some(val as u8)),
        Ok(val) => Err(PgpError::parse(
            line_no,
            format!(
                "Allele index {} exceeds maximum supported value {}",
                val, MAX_ALLELE_INDEX
            ),
        )),
        Err(_) => Err(PgpError::parse(line_no, format!("Invalid allele: {}", s))),
    }
}

/// Streaming VCF reader
pub struct VcfReader {
    samples: Arc<Samples>,
    reader: Box<dyn BufRead + Send>,
    line_no: usize,
    buf: String,
}

impl VcfReader {
    /// Open a VCF file (plain or BGZF) and read the header
    pub fn open(path: &Path) -> Result<Self> {
        info_span!("vcf_open", path = ?path).in_scope(|| {
            if !path.exists() {
                return Err(PgpError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            let file = File::open(path)?;

            // Check if gzipped
            let is_gzipped = path
                .extension()
                .map(|e| e == "gz" || e == "bgz")
                .unwrap_or(false);

            let reader: Box<dyn BufRead + Send> = if is_gzipped {
                Box::new(BufReader::new(noodles::bgzf::Reader::new(file)))
            } else {
                Box::new(BufReader::new(file))
            };

            Self::from_reader(reader)
        })
    }

    /// Create from a reader positioned at the start of the header
    pub fn from_reader(mut reader: Box<dyn BufRead + Send>) -> Result<Self> {
        let mut header_str = String::new();
        let mut line_no = 0;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Err(PgpError::vcf("missing #CHROM header line"));
            }
            line_no += 1;
            if !line.starts_with('#') {
                return Err(PgpError::parse(line_no, "data line before #CHROM header line"));
            }
            let is_chrom = line.starts_with("#CHROM");
            header_str.push_str(&line);
            if is_chrom {
                break;
            }
        }

        let header: Header = header_str.parse()?;
        let sample_names: Vec<String> = header
            .sample_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        tracing::debug!(n_samples = sample_names.len(), "read VCF header");

        Ok(Self {
            samples: Arc::new(Samples::from_ids(sample_names)),
            reader,
            line_no,
            buf: String::new(),
        })
    }

    pub fn samples_arc(&self) -> Arc<Samples> {
        Arc::clone(&self.samples)
    }

    /// Next data record, `None` at end of input
    pub fn next_record(&mut self) -> Result<Option<VcfRecord>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            if self.buf.trim().is_empty() {
                continue;
            }
            let record = VcfRecord::parse(&self.buf, self.line_no, Arc::clone(&self.samples))?;
            return Ok(Some(record));
        }
    }

    /// Read up to `max` records
    pub fn read_batch(&mut self, max: usize) -> Result<Vec<VcfRecord>> {
        let mut batch = Vec::with_capacity(max);
        while batch.len() < max {
            match self.next_record()? {
                Some(rec) => batch.push(rec),
                None => break,
            }
        }
        Ok(batch)
    }
}

impl Iterator for VcfReader {
    type Item = Result<VcfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

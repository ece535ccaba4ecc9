//! # Marker Definitions
//!
//! Genomic marker (variant site) representation, including the optional
//! `START`/`END` annotated region carried over from the reference VCF.

use std::fmt;
use std::sync::Arc;

use crate::data::genotype_index;

/// Zero-cost newtype for marker indices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MarkerIdx(pub u32);

impl MarkerIdx {
    pub fn new(idx: u32) -> Self {
        Self(idx)
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for MarkerIdx {
    fn from(idx: usize) -> Self {
        Self(idx as u32)
    }
}

/// A REF or ALT allele
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Allele {
    /// Single nucleotide, stored as its uppercase ASCII byte
    Base(u8),
    /// Indel, symbolic or other multi-character allele
    Seq(Arc<str>),
}

impl Allele {
    pub fn parse(s: &str) -> Self {
        match s.as_bytes() {
            [b] if matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'N') => {
                Allele::Base(b.to_ascii_uppercase())
            }
            _ => Allele::Seq(s.into()),
        }
    }

    pub fn is_base(&self) -> bool {
        matches!(self, Allele::Base(_))
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Allele::Base(b) => write!(f, "{}", *b as char),
            Allele::Seq(s) => f.write_str(s),
        }
    }
}

/// A single genomic locus with a fixed, ordered allele list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Marker {
    pub chrom: Arc<str>,
    /// 1-based genomic position
    pub pos: u32,
    pub id: Option<Arc<str>>,
    pub ref_allele: Allele,
    pub alt_alleles: Vec<Allele>,
    /// Start of the original annotated region (INFO `START`)
    pub start: Option<i64>,
    /// End of the original annotated region (INFO `END`)
    pub end: Option<i64>,
}

impl Marker {
    pub fn new(
        chrom: impl Into<Arc<str>>,
        pos: u32,
        id: Option<&str>,
        ref_allele: Allele,
        alt_alleles: Vec<Allele>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            id: id.map(Into::into),
            ref_allele,
            alt_alleles,
            start: None,
            end: None,
        }
    }

    /// Attach an annotated `[start, end)` region
    pub fn with_region(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Total number of alleles (REF + ALTs)
    pub fn n_alleles(&self) -> usize {
        1 + self.alt_alleles.len()
    }

    pub fn n_phased_genotypes(&self) -> usize {
        genotype_index::n_phased_genotypes(self.n_alleles())
    }

    pub fn n_unphased_genotypes(&self) -> usize {
        genotype_index::n_unphased_genotypes(self.n_alleles())
    }

    /// Index of the ordered pair `a1|a2` in a PGP vector
    #[inline]
    pub fn phased_genotype(&self, a1: u8, a2: u8) -> usize {
        genotype_index::phased_index(a1, a2, self.n_alleles())
    }

    /// Index of the unordered pair `a1/a2` in a GP vector
    #[inline]
    pub fn unphased_genotype(&self, a1: u8, a2: u8) -> usize {
        genotype_index::unphased_index(a1, a2)
    }

    /// True if REF and every ALT are single nucleotides
    pub fn is_snp(&self) -> bool {
        self.ref_allele.is_base() && self.alt_alleles.iter().all(Allele::is_base)
    }

    pub fn has_region(&self) -> bool {
        self.start.is_some()
    }
}

/// Renders `CHROM POS ID REF ALT`
impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t",
            self.chrom,
            self.pos,
            self.id.as_deref().unwrap_or("."),
            self.ref_allele
        )?;
        if self.alt_alleles.is_empty() {
            return f.write_str(".");
        }
        for (j, alt) in self.alt_alleles.iter().enumerate() {
            if j > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", alt)?;
        }
        Ok(())
    }
}

/// Ordered list of markers
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Markers {
    markers: Vec<Marker>,
}

impl Markers {
    pub fn new(markers: Vec<Marker>) -> Self {
        Self { markers }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn marker(&self, idx: MarkerIdx) -> &Marker {
        &self.markers[idx.as_usize()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }
}

impl std::ops::Index<usize> for Markers {
    type Output = Marker;

    fn index(&self, idx: usize) -> &Marker {
        &self.markers[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snv(pos: u32) -> Marker {
        Marker::new("chr1", pos, Some("rs1"), Allele::parse("A"), vec![Allele::parse("g")])
    }

    #[test]
    fn test_display() {
        assert_eq!(snv(100).to_string(), "chr1\t100\trs1\tA\tG");
        let m = Marker::new("2", 5, None, Allele::parse("AT"), vec![]);
        assert_eq!(m.to_string(), "2\t5\t.\tAT\t.");
    }

    #[test]
    fn test_is_snp() {
        assert!(snv(1).is_snp());
        let indel = Marker::new("1", 1, None, Allele::parse("A"), vec![Allele::parse("AC")]);
        assert!(!indel.is_snp());
    }

    #[test]
    fn test_genotype_counts() {
        let m = Marker::new(
            "1",
            1,
            None,
            Allele::parse("A"),
            vec![Allele::parse("C"), Allele::parse("G")],
        );
        assert_eq!(m.n_alleles(), 3);
        assert_eq!(m.n_phased_genotypes(), 9);
        assert_eq!(m.n_unphased_genotypes(), 6);
        assert_eq!(m.phased_genotype(1, 2), 5);
        assert_eq!(m.unphased_genotype(2, 1), 4);
    }

    #[test]
    fn test_region() {
        let m = snv(10).with_region(Some(5), Some(20));
        assert!(m.has_region());
        assert!(!snv(10).has_region());
    }
}

//! # Sample Haplotype Pairs
//!
//! The phased allele pair assigned to each sample at each marker of a block,
//! one [`PackedAllelePanel`] per marker.

use std::sync::Arc;

use crate::data::haplotype::Samples;
use crate::data::marker::{Marker, MarkerIdx, Markers};
use crate::data::storage::packed::PackedAllelePanel;
use crate::data::storage::pgp_ref::PgpRefGt;
use crate::error::{PgpError, Result};
use crate::model::emission::GenotypeEmission;

#[derive(Clone, Debug)]
pub struct SampleHapPairs {
    markers: Arc<Markers>,
    samples: Arc<Samples>,
    columns: Vec<PackedAllelePanel>,
}

impl SampleHapPairs {
    pub fn from_panels(
        markers: Arc<Markers>,
        samples: Arc<Samples>,
        columns: Vec<PackedAllelePanel>,
    ) -> Result<Self> {
        if columns.len() != markers.len() {
            return Err(PgpError::inconsistent_markers(format!(
                "{} allele columns for {} markers",
                columns.len(),
                markers.len()
            )));
        }
        if let Some((m, col)) = columns
            .iter()
            .enumerate()
            .find(|(_, col)| col.n_samples() != samples.len())
        {
            return Err(PgpError::inconsistent_samples(format!(
                "{} samples in allele column for marker {} but {} expected",
                col.n_samples(),
                markers[m],
                samples.len()
            )));
        }
        for (m, col) in columns.iter().enumerate() {
            col.check_marker(&markers[m])?;
        }
        Ok(Self {
            markers,
            samples,
            columns,
        })
    }

    /// Haplotype pairs holding each panel's stored calls
    pub fn from_ref_panels(panels: &[PgpRefGt]) -> Result<Self> {
        let Some(first) = panels.first() else {
            return Ok(Self {
                markers: Arc::new(Markers::default()),
                samples: Arc::new(Samples::default()),
                columns: Vec::new(),
            });
        };
        let samples = first.samples_arc();
        if let Some(p) = panels.iter().find(|p| p.samples() != samples.as_ref()) {
            return Err(PgpError::inconsistent_samples(format!(
                "samples at marker {} differ from samples at marker {}",
                p.marker(),
                first.marker()
            )));
        }
        let markers = Markers::new(panels.iter().map(|p| p.marker().clone()).collect());
        let columns = panels.iter().map(|p| p.alleles().clone()).collect();
        Self::from_panels(Arc::new(markers), samples, columns)
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn markers_arc(&self) -> Arc<Markers> {
        Arc::clone(&self.markers)
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
    pub fn allele1(&self, m: usize, sample: usize) -> u8 {
        self.columns[m].allele1(sample)
    }

    #[inline]
    pub fn allele2(&self, m: usize, sample: usize) -> u8 {
        self.columns[m].allele2(sample)
    }
}

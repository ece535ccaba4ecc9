//! # Model Module
//!
//! Emission probabilities and per-genotype values for PGP reference panels.
//!
//! - `emission`: the genotype-emission interface
//! - `orientation`: which strand order a stored PGP matrix refers to
//! - `genotype_values`: phased and unphased genotype values per marker
//! - `gprobs`: allele frequency and imputation quality statistics

pub mod emission;
pub mod genotype_values;
pub mod gprobs;
pub mod orientation;

pub use emission::GenotypeEmission;
pub use genotype_values::GenotypeValues;
pub use gprobs::GprobsStatistics;
pub use orientation::PgpOrientation;

//! # I/O Module
//!
//! VCF reading and writing boundaries.

pub mod vcf;
pub mod vcf_writer;

//! # pgpref Library Root
//!
//! Compact storage and emission probabilities for reference panels whose
//! phased genotypes carry PGP (phased genotype probability) values, and a
//! VCF writer that re-emits them with correct strand orientation.
//!
//! ## Module Structure
//! ```text
//! pgpref
//! ├── data        # Markers, samples, genotype index arithmetic
//! │   └── storage # Bit-packed allele panels, PGP reference genotypes
//! ├── io          # VCF reading and writing
//! ├── model       # Emission interface, orientation, genotype values, statistics
//! ├── pipelines   # Read-validate-write orchestration
//! └── utils       # Thread pool setup
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod pipelines;
pub mod utils;

pub use error::{PgpError, Result};

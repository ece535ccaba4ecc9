//! # Data Module
//!
//! In-memory representations of reference panel data.
//!
//! - **Zero-cost newtypes:** `MarkerIdx` and `SampleIdx` keep marker and
//!   sample indices apart.
//! - **Bit packing:** allele calls use the fewest bits their marker allows.

pub mod genotype_index;
pub mod haplotype;
pub mod marker;
pub mod storage;

// Re-export commonly used types
pub use haplotype::{SampleIdx, Samples};
pub use marker::{Allele, Marker, MarkerIdx, Markers};
pub use storage::{GenotypeCall, PackedAllelePanel, PgpRefGt, SampleHapPairs};

//! # Genotype Storage
//!
//! - `packed`: two bit-packed allele strands per marker
//! - `pgp_ref`: packed calls plus one stored-orientation probability per sample
//! - `hap_pairs`: packed calls for a block of markers

pub mod hap_pairs;
pub mod packed;
pub mod pgp_ref;

pub use hap_pairs::SampleHapPairs;
pub use packed::{GenotypeCall, PackedAllelePanel};
pub use pgp_ref::PgpRefGt;

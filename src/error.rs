//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a stored genotype cannot be held in a PGP reference panel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenotypeFault {
    /// One or both alleles are `.`
    MissingAllele,
    /// Genotype uses the `/` separator
    Unphased,
    /// Allele index is not below the marker's allele count
    AlleleOutOfRange(u8),
}

impl fmt::Display for GenotypeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenotypeFault::MissingAllele => write!(f, "genotype has a missing allele"),
            GenotypeFault::Unphased => write!(f, "genotype is not phased"),
            GenotypeFault::AlleleOutOfRange(a) => write!(f, "invalid allele index ({})", a),
        }
    }
}

/// Main error type for pgpref operations
#[derive(Error, Debug)]
pub enum PgpError {
    /// I/O errors (file missing, permission denied, read/write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// VCF structure errors (missing FORMAT fields, malformed header)
    #[error("VCF error: {message}")]
    Vcf { message: String },

    /// Invalid data errors (empty sample set, bad marker range)
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Configuration errors (invalid CLI arguments)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File not found errors
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Parse errors
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A reference genotype that is missing, unphased or out of range
    #[error("Reference {kind} for sample: {sample} marker: {marker}")]
    MalformedGenotype {
        sample: String,
        marker: String,
        kind: GenotypeFault,
    },

    /// A PGP subfield of the wrong length or with a bad value
    #[error("Malformed PGP field for sample: {sample} marker: {marker}: {reason}")]
    MalformedProbabilityVector {
        sample: String,
        marker: String,
        reason: String,
    },

    /// Haplotypes and genotype values were built against different markers
    #[error("Inconsistent markers: {message}")]
    InconsistentMarkers { message: String },

    /// A sample in one structure is absent from the other
    #[error("Inconsistent samples: {message}")]
    InconsistentSamples { message: String },
}

/// Type alias for Results using PgpError
pub type Result<T> = std::result::Result<T, PgpError>;

impl PgpError {
    /// Create a VCF error with a message
    pub fn vcf(message: impl Into<String>) -> Self {
        Self::Vcf {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn malformed_genotype(
        sample: impl Into<String>,
        marker: impl fmt::Display,
        kind: GenotypeFault,
    ) -> Self {
        Self::MalformedGenotype {
            sample: sample.into(),
            marker: marker.to_string(),
            kind,
        }
    }

    pub fn malformed_probs(
        sample: impl Into<String>,
        marker: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedProbabilityVector {
            sample: sample.into(),
            marker: marker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn inconsistent_markers(message: impl Into<String>) -> Self {
        Self::InconsistentMarkers {
            message: message.into(),
        }
    }

    pub fn inconsistent_samples(message: impl Into<String>) -> Self {
        Self::InconsistentSamples {
            message: message.into(),
        }
    }
}

// Convert noodles VCF header errors to PgpError
impl From<noodles::vcf::header::ParseError> for PgpError {
    fn from(err: noodles::vcf::header::ParseError) -> Self {
        Self::Vcf {
            message: err.to_string(),
        }
    }
}

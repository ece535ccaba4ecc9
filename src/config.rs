//! # Configuration Logic
//!
//! CLI argument parsing and validation.
//!
//! ```bash
//! pgpref --ref panel.vcf.gz --out reemitted --nthreads 8
//! ```

use std::path::PathBuf;

use clap::Parser;

use crate::error::{PgpError, Result};

/// Re-emit a PGP reference panel as GT:DS:GP:PGP VCF records
#[derive(Parser, Debug, Clone)]
#[command(name = "pgpref", version, about)]
pub struct Config {
    /// Reference VCF with phased GT and PGP FORMAT fields
    #[arg(long = "ref")]
    pub r#ref: PathBuf,

    /// Output prefix; records are written to `<out>.vcf.gz`
    #[arg(long)]
    pub out: PathBuf,

    /// Omit SNP markers from the output
    #[arg(long)]
    pub nosnps: bool,

    /// Write GT-only records
    #[arg(long)]
    pub gt_only: bool,

    /// Value of the `##source` meta-information line
    #[arg(long)]
    pub source: Option<String>,

    /// Number of threads (default: all cores)
    #[arg(long)]
    pub nthreads: Option<usize>,

    /// Records parsed per parallel batch
    #[arg(long, default_value_t = 1000)]
    pub batch: usize,

    /// Print span timings to stderr
    #[arg(long)]
    pub profile: bool,
}

impl Config {
    /// Parse command-line arguments and validate them
    pub fn parse_and_validate() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.r#ref.exists() {
            return Err(PgpError::FileNotFound {
                path: self.r#ref.clone(),
            });
        }
        if self.nthreads == Some(0) {
            return Err(PgpError::config("nthreads must be at least 1"));
        }
        if self.batch == 0 {
            return Err(PgpError::config("batch must be at least 1"));
        }
        Ok(())
    }

    pub fn nthreads(&self) -> usize {
        self.nthreads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn write_snps(&self) -> bool {
        !self.nosnps
    }

    /// `<out>.vcf.gz`
    pub fn output_path(&self) -> PathBuf {
        let mut name = self.out.clone().into_os_string();
        name.push(".vcf.gz");
        PathBuf::from(name)
    }
}

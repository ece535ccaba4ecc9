//! # pgpref: PGP Reference Panel Re-emitter
//!
//! ## Usage
//! ```bash
//! # GT:DS:GP:PGP records
//! pgpref --ref panel.vcf.gz --out reemitted
//!
//! # GT-only records, indels and other non-SNP markers only
//! pgpref --ref panel.vcf.gz --out reemitted --gt-only --nosnps
//!
//! # With profiling output
//! pgpref --ref panel.vcf.gz --out reemitted --profile
//! ```

use std::time::Instant;

use pgpref::config::Config;
use pgpref::pipelines::ReemitPipeline;
use pgpref::utils::threading::build_global_pool;
use pgpref::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing subscriber for hierarchical profiling output
fn init_profiling() {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run() -> Result<()> {
    let start = Instant::now();

    let config = Config::parse_and_validate()?;

    if config.profile {
        init_profiling();
        eprintln!("=== Profiling enabled ===\n");
    }

    let n_threads = config.nthreads();
    build_global_pool(n_threads)?;

    eprintln!("pgpref v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Threads: {}", n_threads);
    eprintln!("Reference: {:?}", config.r#ref);

    let mut pipeline = ReemitPipeline::new(config);
    pipeline.run()?;

    let elapsed = start.elapsed();
    eprintln!("\nCompleted in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

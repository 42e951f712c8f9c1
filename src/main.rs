//! CTR_DRBG CLI
//!
//! Command-line interface for generating pseudorandom output from an
//! OS-seeded, health-tested CTR_DRBG instance.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use ctr_drbg::{
    config::{ConfigError, FileConfig, NonceKind, OutputFormat},
    drbg::{CtrDrbg, DrbgError, DrbgMechanism},
    metrics::{MetricsError, MetricsRegistry, MetricsSnapshot},
    rng::DrbgRng,
    source::{
        EntropyError, EntropyInput, EntropySource, HealthMetrics, HealthTestedEntropy, NoNonce,
        NonceSource, OsEntropy, TimestampNonce,
    },
};
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Generate pseudorandom bytes with NIST SP 800-90A CTR_DRBG (AES-256, no df).
#[derive(Parser)]
#[command(name = "ctr-drbg")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Bytes per request.
    #[arg(short, long)]
    bytes: Option<usize>,
    /// Number of requests.
    #[arg(short = 'n', long)]
    requests: Option<u64>,
    /// Requested security strength in bits.
    #[arg(short, long)]
    strength: Option<u32>,
    /// Reseed before every request.
    #[arg(long)]
    prediction_resistance: bool,
    /// Personalization string.
    #[arg(short, long)]
    personalization: Option<String>,
    /// Write raw bytes instead of hex lines.
    #[arg(long)]
    raw: bool,
    /// Run until interrupted.
    #[arg(long)]
    continuous: bool,
    /// Print Prometheus metrics to stderr before exiting.
    #[arg(long)]
    metrics: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Drbg(#[from] DrbgError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// OS entropy, optionally behind the continuous health tests.
enum CliEntropy {
    Tested(HealthTestedEntropy<OsEntropy>),
    Untested(OsEntropy),
}

impl CliEntropy {
    fn health(&self) -> Option<&HealthMetrics> {
        match self {
            CliEntropy::Tested(source) => Some(source.metrics()),
            CliEntropy::Untested(_) => None,
        }
    }
}

impl EntropySource for CliEntropy {
    fn get_entropy(
        &mut self,
        min_bits: usize,
        max_bits: usize,
        prediction_resistance: bool,
    ) -> Result<EntropyInput, EntropyError> {
        match self {
            CliEntropy::Tested(source) => source.get_entropy(min_bits, max_bits, prediction_resistance),
            CliEntropy::Untested(source) => source.get_entropy(min_bits, max_bits, prediction_resistance),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the generated output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<FileConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    // Command-line flags take precedence over the file.
    if let Some(bytes) = cli.bytes {
        config.output.bytes_per_request = bytes;
    }
    if let Some(requests) = cli.requests {
        config.output.requests = requests;
    }
    if let Some(strength) = cli.strength {
        config.drbg.security_strength = strength;
    }
    if let Some(personalization) = &cli.personalization {
        config.drbg.personalization = personalization.clone();
    }
    config.drbg.prediction_resistance |= cli.prediction_resistance;
    config.output.continuous |= cli.continuous;
    if cli.raw {
        config.output.format = OutputFormat::Raw;
    }

    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli)?;

    info!("CTR_DRBG v{}", ctr_drbg::VERSION);

    let entropy = if config.health.enabled {
        CliEntropy::Tested(HealthTestedEntropy::with_thresholds(
            OsEntropy::new(),
            config.health.thresholds(),
        ))
    } else {
        warn!("Entropy health tests disabled");
        CliEntropy::Untested(OsEntropy::new())
    };
    let nonce: Box<dyn NonceSource + Send> = match config.drbg.nonce {
        NonceKind::Timestamp => Box::new(TimestampNonce::new()),
        NonceKind::None => Box::new(NoNonce),
    };

    let mechanism = DrbgMechanism::new(CtrDrbg::new(), entropy, nonce);
    let mut rng = DrbgRng::new(
        mechanism,
        config.drbg.security_strength,
        config.drbg.prediction_resistance,
        config.drbg.personalization.as_bytes(),
    )?;

    let running = Arc::new(AtomicBool::new(true));
    if config.output.continuous {
        let flag = Arc::clone(&running);
        ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;
        info!("Generating until interrupted (Ctrl-C to stop)");
    }

    let result = generate_output(&mut rng, &config, &running);

    if cli.metrics {
        let mechanism = rng.mechanism();
        let health = mechanism.inspect_entropy(|e| e.health().cloned())?;
        let registry = MetricsRegistry::new()?;
        registry.update(&MetricsSnapshot::from_stats(&mechanism.stats()?, health.as_ref()));
        eprint!("{}", registry.encode()?);
    }

    // Dropping the generator uninstantiates it.
    drop(rng);
    result
}

fn generate_output<A, E, N>(
    rng: &mut DrbgRng<A, E, N>,
    config: &FileConfig,
    running: &AtomicBool,
) -> Result<(), CliError>
where
    A: ctr_drbg::DrbgAlgorithm,
    E: EntropySource,
    N: NonceSource,
{
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut buf = Zeroizing::new(vec![0u8; config.output.bytes_per_request]);
    let mut produced = 0u64;

    while running.load(Ordering::SeqCst)
        && (config.output.continuous || produced < config.output.requests)
    {
        rng.fill_with_input(&mut buf, &[])?;
        match config.output.format {
            OutputFormat::Hex => writeln!(out, "{}", hex::encode(&*buf))?,
            OutputFormat::Raw => out.write_all(&buf)?,
        }
        out.flush()?;
        produced += 1;
    }

    info!(
        requests = produced,
        bytes = produced * config.output.bytes_per_request as u64,
        "Done"
    );
    Ok(())
}

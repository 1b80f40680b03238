use anyhow::bail;
use clap::{Parser, ValueEnum};
use domainstats::ParserConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Command line configuration for the `domainstats` binary.
///
/// Every flag can also be supplied through the environment (or a `.env`
/// file), which is how batch schedulers usually configure it.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "domainstats",
    version,
    about = "Count customers per email domain in a CSV export"
)]
pub struct CliArgs {
    /// Path to the customer CSV file. The first record must be a header and
    /// the email must be the third column.
    ///
    /// Environment variable: `INPUT_FILE`
    #[arg(env = "INPUT_FILE")]
    pub input: PathBuf,

    /// Number of concurrent extractor workers.
    ///
    /// Environment variable: `WORKER_COUNT`
    #[arg(long, env = "WORKER_COUNT", default_value_t = num_cpus::get())]
    pub worker_count: usize,

    /// Capacity of each intermediary queue. Lower values reduce memory and
    /// tighten backpressure; `0` asks for a synchronous handoff.
    ///
    /// Environment variable: `BUFFER_SIZE`
    #[arg(long, env = "BUFFER_SIZE", default_value_t = 10)]
    pub buffer_size: usize,

    /// Abort the run if it has not finished after this many seconds.
    ///
    /// Environment variable: `TIMEOUT_SECS`
    #[arg(long, env = "TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Output format written to stdout.
    ///
    /// Environment variable: `OUTPUT_FORMAT`
    #[arg(long, env = "OUTPUT_FORMAT", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One `domain<TAB>count` line per domain.
    Text,
    /// A JSON array of `{"domain", "number_of_users"}` objects.
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub input: PathBuf,
    pub parser: ParserConfig,
    pub timeout: Option<Duration>,
    pub format: OutputFormat,
}

impl TryFrom<CliArgs> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.worker_count == 0 {
            bail!("WORKER_COUNT must be greater than 0");
        }

        if args.timeout_secs == Some(0) {
            bail!("TIMEOUT_SECS must be greater than 0 when set");
        }

        let parser = ParserConfig::new(args.worker_count, args.buffer_size)?;

        Ok(Self {
            input: args.input,
            parser,
            timeout: args.timeout_secs.map(Duration::from_secs),
            format: args.format,
        })
    }
}

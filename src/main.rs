use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use fanout::config::Config;
use fanout::fetch::HttpFetcher;
use fanout::orchestration::{compute, compute_fixed, sum};
use fanout::{flog, flog_error, Context, Recommender, Result};

/// fanout - concurrent fan-out/fan-in with shared cancellation
#[derive(Parser, Debug)]
#[command(name = "fanout")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    FANOUT_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.fanout/fanout.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Config file (defaults to ~/.fanout/fanout.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Fetch a customer and a product concurrently under one deadline
    Recommend {
        #[arg(long, default_value_t = 1)]
        customer_id: u64,

        /// Overall deadline in milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,

        /// Delay before the customer request, in milliseconds
        #[arg(long)]
        customer_delay_ms: Option<u64>,
    },

    /// Run the 2s computation under a caller deadline
    Compute {
        #[arg(long, default_value_t = 3000)]
        deadline_ms: u64,
    },

    /// Run the 2s computation against a fixed 1s timer
    ComputeFixed,

    /// Sum numbers in parallel partitions (defaults to 1..=20)
    Sum {
        /// Number of partitions
        #[arg(short = 'k', long)]
        concurrency: Option<usize>,

        numbers: Vec<i64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    fanout::log::init(cli.debug);

    let result = run(cli);
    if let Err(err) = &result {
        flog_error!("fanout failed: {}", err);
    }
    result
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    flog!("fanout starting: {:?}", cli.command);

    match cli.command {
        Command::Recommend {
            customer_id,
            deadline_ms,
            customer_delay_ms,
        } => run_recommend(&config, customer_id, deadline_ms, customer_delay_ms, cli.json),
        Command::Compute { deadline_ms } => run_compute(deadline_ms, cli.json),
        Command::ComputeFixed => run_compute_fixed(cli.json),
        Command::Sum {
            concurrency,
            numbers,
        } => run_sum(&config, concurrency, numbers, cli.json),
    }
}

fn run_recommend(
    config: &Config,
    customer_id: u64,
    deadline_ms: Option<u64>,
    customer_delay_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    let fetcher = Arc::new(HttpFetcher::new(config.request_timeout())?);
    let mut recommender = Recommender::new(fetcher, config);
    if let Some(ms) = deadline_ms {
        recommender = recommender.with_deadline(Duration::from_millis(ms));
    }
    if let Some(ms) = customer_delay_ms {
        recommender = recommender.with_customer_delay(Duration::from_millis(ms));
    }

    let rt = tokio::runtime::Runtime::new()?;
    let (customer, product) = rt.block_on(recommender.recommend(customer_id))?;

    if json {
        let output = serde_json::json!({
            "customer": customer,
            "product": product,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("result: {}, {}", customer, product);
    }
    Ok(())
}

fn run_compute(deadline_ms: u64, json: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let value = rt.block_on(async {
        let ctx = Context::with_timeout(&Context::background(), Duration::from_millis(deadline_ms));
        compute(&ctx).await
    })?;
    print_value(value, json)
}

fn run_compute_fixed(json: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let value = rt.block_on(compute_fixed())?;
    print_value(value, json)
}

fn run_sum(config: &Config, concurrency: Option<usize>, numbers: Vec<i64>, json: bool) -> Result<()> {
    let numbers = if numbers.is_empty() {
        (1..=20).collect()
    } else {
        numbers
    };
    let total = sum(&numbers, concurrency.unwrap_or(config.concurrency))?;
    print_value(total, json)
}

fn print_value(value: i64, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "result": value }));
    } else {
        println!("result: {}", value);
    }
    Ok(())
}

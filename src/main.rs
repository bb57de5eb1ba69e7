use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;
use web_tester::scenario::generator::{expected_samples, seed_from_clock};
use web_tester::{
    store, AggregateResult, HttpTransport, Payload, Scenario, ScenarioExecutor, ScenarioGenerator,
};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "web-tester")]
#[command(about = "Plan jittered HTTP request scenarios and replay them", long_about = None)]
struct Config {
    /// Scenario file to write or replay
    #[arg(
        long,
        global = true,
        env = "WT_SCENARIO_FILE",
        default_value = "test_scenario.tsc"
    )]
    scenario_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan a new scenario and write it to the scenario file
    Generate(GenerateArgs),

    /// Replay the scenario file against a target
    Execute(ExecuteArgs),

    /// Reuse the scenario file if present, otherwise generate it, then replay it
    Run {
        #[command(flatten)]
        generate: GenerateArgs,

        #[command(flatten)]
        execute: ExecuteArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct GenerateArgs {
    /// Scenario length in seconds (fractions allowed)
    #[arg(long, env = "WT_DURATION", default_value = "10", value_parser = parse_seconds)]
    duration: Duration,

    /// Target requests per second
    #[arg(long, env = "WT_RATE", default_value = "1")]
    rate: u32,

    /// JSON payload attached to every sample
    #[arg(long, env = "WT_PAYLOAD", default_value = "1")]
    payload: String,

    /// Leave every sample without a payload
    #[arg(long, env = "WT_NO_PAYLOAD", conflicts_with = "payload")]
    no_payload: bool,

    /// Random seed, defaults to the current time
    #[arg(long, env = "WT_SEED")]
    seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
struct ExecuteArgs {
    /// Endpoint every request is sent to
    #[arg(long, env = "WT_TARGET", default_value = "http://localhost:8080")]
    target: Url,

    /// HTTP method
    #[arg(long, env = "WT_METHOD", default_value = "POST")]
    method: reqwest::Method,

    /// Per-request timeout in milliseconds, unbounded when unset
    #[arg(long, env = "WT_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Maximum outstanding requests, unbounded when unset
    #[arg(long, env = "WT_MAX_IN_FLIGHT")]
    max_in_flight: Option<usize>,
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number of seconds: '{}'", s))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("Invalid duration '{}': {}", s, e))
}

// =============================================================================
// Generation
// =============================================================================

fn generate(args: &GenerateArgs, path: &Path) -> Result<()> {
    let seed = args.seed.unwrap_or_else(seed_from_clock);

    info!("Duration: {:?}", args.duration);
    info!("Rate: {}/s", args.rate);
    info!("Seed: {}", seed);
    info!(
        "Expected samples: {}",
        expected_samples(args.duration, args.rate)
    );

    let mut generator = ScenarioGenerator::new(StdRng::seed_from_u64(seed));
    let scenario: Scenario = if args.no_payload {
        generator.generate(args.duration, args.rate)
    } else {
        let payload: Payload =
            sonic_rs::from_str(&args.payload).context("Failed to parse payload JSON")?;
        generator.generate_with(args.duration, args.rate, || payload.clone())
    };

    store::save(&scenario, path)
        .with_context(|| format!("Failed to write scenario file: {:?}", path))?;
    info!("Wrote {} samples to {:?}", scenario.len(), path);

    Ok(())
}

// =============================================================================
// Execution
// =============================================================================

async fn execute(args: &ExecuteArgs, path: &Path) -> Result<AggregateResult> {
    info!("Target: {} {}", args.method, args.target);
    match args.timeout_ms {
        Some(ms) => info!("Request timeout: {}ms", ms),
        None => info!("Request timeout: none"),
    }
    if let Some(limit) = args.max_in_flight {
        info!("Max in flight: {}", limit);
    }

    let transport = Arc::new(
        HttpTransport::new(args.timeout_ms.map(Duration::from_millis))
            .context("Failed to set up HTTP transport")?,
    );
    let requests = transport.json_requests(args.method.clone(), args.target.clone());

    let mut builder = ScenarioExecutor::builder().transport(Arc::clone(&transport));
    if let Some(limit) = args.max_in_flight {
        builder = builder.max_in_flight(limit);
    }
    let executor = builder.build().context("Invalid executor configuration")?;

    let result = executor
        .execute_file::<Payload, _>(path, |payload| requests.build(payload))
        .await
        .with_context(|| format!("Failed to execute scenario {:?}", path))?;

    Ok(result)
}

fn print_summary(result: &AggregateResult) {
    info!("╔════════════════════════════════════════════════════════════╗");
    info!("║                      RUN SUMMARY                           ║");
    info!("╚════════════════════════════════════════════════════════════╝");

    info!("");
    info!("Samples:");
    info!("  Total:         {}", result.total_samples);
    info!("  Errors:        {}", result.error_count);
    info!("  Non-success:   {}", result.non_success_count);

    info!("");
    info!("Response Time:");
    info!("  Average: {:?}", result.average_elapsed);
    match &result.latency {
        Some(latency) => {
            info!("  Min:     {:?}", latency.min);
            info!("  Mean:    {:?}", latency.mean);
            info!("  p50:     {:?}", latency.p50);
            info!("  p95:     {:?}", latency.p95);
            info!("  p99:     {:?}", latency.p99);
            info!("  Max:     {:?}", latency.max);
        }
        None => info!("  No data"),
    }

    info!("");
    info!("═══════════════════════════════════════════════════════════");
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    let path = config.scenario_file.as_path();

    info!("════════════════════════════════════════════════════════════");
    info!("                    WEB TESTER");
    info!("════════════════════════════════════════════════════════════");
    info!("Scenario file: {:?}", path);

    let result = match &config.command {
        Command::Generate(args) => {
            generate(args, path)?;
            None
        }
        Command::Execute(args) => Some(execute(args, path).await?),
        Command::Run {
            generate: plan,
            execute: replay,
        } => {
            if path.exists() {
                info!("Reusing existing scenario file {:?}", path);
            } else {
                generate(plan, path)?;
            }
            Some(execute(replay, path).await?)
        }
    };

    if let Some(result) = result {
        print_summary(&result);
    }

    info!("════════════════════════════════════════════════════════════");
    info!("                      COMPLETE");
    info!("════════════════════════════════════════════════════════════");

    Ok(())
}

use anyhow::Context;
use circuit_guard::{
    circuit_breaker::{init_circuit_breaker_metrics, CircuitBreakerManager},
    config::{BreakerSettings, Config},
    simulation::{self, SimulationPlan},
};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "circuit-guard")]
#[command(version, about = "Inspect and exercise circuit breaker configurations", long_about = None)]
struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config/circuit-guard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved breaker configuration as TOML
    Config {
        /// Dependency name; all configured profiles when omitted
        #[arg(value_name = "DEPENDENCY")]
        name: Option<String>,
    },

    /// Drive a breaker with synthetic calls and print the outcome as JSON
    Simulate {
        /// Dependency name used to resolve the breaker profile
        #[arg(value_name = "DEPENDENCY")]
        name: String,

        #[arg(short = 'n', long, default_value = "20")]
        calls: u32,

        /// Share of calls that fail, between 0 and 1
        #[arg(short, long, default_value = "0.5")]
        failure_ratio: f64,

        /// Latency of every synthetic call
        #[arg(short, long, default_value = "10")]
        latency_ms: u64,

        /// Pause between calls
        #[arg(short, long, default_value = "0")]
        spacing_ms: u64,

        /// Also print the Prometheus exposition text
        #[arg(short, long)]
        metrics: bool,
    },

    /// Register every configured breaker and print the statuses and health summary
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    init_tracing(&config);
    tracing::debug!(config_path = %cli.config.display(), "Configuration loaded");

    match cli.command {
        Commands::Config { name } => {
            let names: Vec<String> = match name {
                Some(name) => vec![name],
                None => config.breakers.keys().cloned().collect(),
            };

            let mut resolved = BTreeMap::new();
            for name in names {
                let breaker_config = config.breaker_config(&name)?;
                resolved.insert(name, BreakerSettings::from(&breaker_config));
            }

            println!("{}", toml::to_string_pretty(&resolved)?);
        }

        Commands::Simulate {
            name,
            calls,
            failure_ratio,
            latency_ms,
            spacing_ms,
            metrics,
        } => {
            let registry = prometheus::Registry::new();
            if config.observability.prometheus_enabled {
                init_circuit_breaker_metrics(&registry)?;
            }

            let manager = CircuitBreakerManager::new();
            let plan = SimulationPlan {
                calls,
                failure_ratio,
                latency: Duration::from_millis(latency_ms),
                spacing: Duration::from_millis(spacing_ms),
            };

            let breaker_config = config.breaker_config(&name)?;
            let report = simulation::run(&manager, &name, breaker_config, &plan).await;
            println!("{}", serde_json::to_string_pretty(&report)?);

            if metrics && config.observability.prometheus_enabled {
                let encoder = prometheus::TextEncoder::new();
                println!("{}", encoder.encode_to_string(&registry.gather())?);
            }
        }

        Commands::Health => {
            let manager = CircuitBreakerManager::new();
            config.register_breakers(&manager)?;

            let body = serde_json::json!({
                "statuses": manager.get_all_statuses(),
                "summary": manager.get_health_summary(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("circuit_guard={}", config.observability.log_level).into()
    });

    // Logs go to stderr so stdout stays machine-readable
    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use sequencer_core::wire::{RunFunctionRequest, Severity};
use sequencer_core::Input;
use sequencer_engine::{compile_rules, Function};

mod io;

#[derive(Parser, Debug)]
#[command(name = "sequencerctl", version, about = "Sequencer function CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json, Yaml }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a RunFunctionRequest (JSON or YAML) and print the response
    Run {
        /// Request file; reads stdin when omitted
        #[arg(long = "file", short = 'f')]
        file: Option<PathBuf>,
        /// Response TTL in seconds
        #[arg(long = "ttl", env = "SEQUENCER_RESPONSE_TTL_SECS", default_value_t = 60)]
        ttl_secs: u64,
    },
    /// Compile every rule pattern of a function Input (or of a request's input)
    Check {
        #[arg(long = "file", short = 'f')]
        file: Option<PathBuf>,
    },
    /// Print the bounded name generated for BASE
    Name {
        base: String,
        #[arg(long = "suffix", default_value = sequencer_usage::USAGE_NAME_SUFFIX)]
        suffix: String,
    },
}

fn init_tracing() {
    let env = std::env::var("SEQUENCER_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // stdout carries the response only
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("SEQUENCER_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid SEQUENCER_METRICS_ADDR; expected host:port");
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, ttl_secs } => {
            let doc = io::read_document(file.as_deref())?;
            let req: RunFunctionRequest = serde_json::from_value(doc).context("decoding RunFunctionRequest")?;
            info!(tag = %req.meta.tag, resources = req.desired.resources.len(), "run invoked");
            let rsp = Function::new(Duration::from_secs(ttl_secs)).run(&req);
            match cli.output {
                Output::Human => {
                    for r in &rsp.results {
                        let sev = match r.severity { Severity::Normal => "NORMAL", Severity::Warning => "WARNING", Severity::Fatal => "FATAL" };
                        println!("{:<8} {}", sev, r.message);
                    }
                    println!("NAME                           READY");
                    for (name, r) in &rsp.desired.resources {
                        println!("{:<30} {}", name, io::ready_label(r.ready));
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&rsp)?),
                Output::Yaml => print!("{}", serde_yaml::to_string(&rsp)?),
            }
            if rsp.is_fatal() {
                error!("function returned a fatal result");
                std::process::exit(1);
            }
        }
        Commands::Check { file } => {
            let doc = io::read_document(file.as_deref())?;
            let input = Input::from_value(io::input_of(&doc))?;
            let compiled = compile_rules(&input.rules)?;
            let patterns: usize = compiled.iter().map(|r| r.len()).sum();
            info!(rules = compiled.len(), patterns, "check invoked");
            match cli.output {
                Output::Human => println!("ok: {} rule(s), {} pattern(s)", compiled.len(), patterns),
                Output::Json => println!("{}", serde_json::json!({ "rules": compiled.len(), "patterns": patterns })),
                Output::Yaml => println!("rules: {}\npatterns: {}", compiled.len(), patterns),
            }
        }
        Commands::Name { base, suffix } => {
            let name = sequencer_usage::generate_name(&base, &suffix);
            match cli.output {
                Output::Json => println!("{}", serde_json::json!({ "name": name })),
                _ => println!("{}", name),
            }
        }
    }

    Ok(())
}

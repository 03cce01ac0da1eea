use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use poll_audit::rpc::{JsonRpcClient, LivepeerChain, SubgraphIndexer};
use poll_audit::{Address, AuditConfig, AuditError, AuditReport, PollAuditor, VoteChoice};

#[derive(Parser)]
#[command(author, version, about = "Audit a Livepeer poll tally against chain state")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute the poll tally and compare it with the subgraph
    Audit {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, env = "WEB3_PROVIDER")]
        rpc_url: Option<String>,
        #[arg(long, env = "SUBGRAPH_URL")]
        subgraph_url: Option<String>,
        #[arg(long, env = "POLL_ADDRESS")]
        poll: Option<Address>,
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Print per-voter contributions
        #[arg(long, default_value_t = false)]
        verbose: bool,
        /// Print the full report as JSON instead of the table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write a default configuration file
    GenerateConfig {
        #[arg(short, long, default_value = "config/audit.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Audit {
            config,
            rpc_url,
            subgraph_url,
            poll,
            concurrency,
            timeout_secs,
            verbose,
            json,
        } => {
            let overrides = Overrides {
                rpc_url,
                subgraph_url,
                poll,
                concurrency,
                timeout_secs,
            };
            run_audit(config, overrides, Output { verbose, json }).await
        }
        Commands::GenerateConfig { path } => generate_config(path),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            let code = err
                .downcast_ref::<AuditError>()
                .map(AuditError::exit_code)
                .unwrap_or(2);
            ExitCode::from(code)
        }
    }
}

#[derive(Clone, Copy)]
struct Output {
    verbose: bool,
    json: bool,
}

struct Overrides {
    rpc_url: Option<String>,
    subgraph_url: Option<String>,
    poll: Option<Address>,
    concurrency: Option<usize>,
    timeout_secs: Option<u64>,
}

impl Overrides {
    fn apply(self, config: &mut AuditConfig) {
        if let Some(rpc_url) = self.rpc_url {
            config.rpc_url = rpc_url;
        }
        if let Some(subgraph_url) = self.subgraph_url {
            config.subgraph_url = subgraph_url;
        }
        if let Some(poll) = self.poll {
            config.poll = Some(poll);
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.lookup_timeout_secs = timeout_secs;
        }
    }
}

async fn run_audit(path: Option<PathBuf>, overrides: Overrides, output: Output) -> Result<ExitCode> {
    let mut config = match path {
        Some(path) => AuditConfig::load(&path)?,
        None => AuditConfig::default(),
    };
    overrides.apply(&mut config);
    let poll = config.validate()?;

    let http = reqwest::Client::builder()
        .build()
        .context("unable to build http client")?;
    let chain = LivepeerChain::new(
        JsonRpcClient::new(http.clone(), config.rpc_url.clone()),
        config.contracts(),
    );
    let indexer = SubgraphIndexer::new(http, config.subgraph_url.clone());
    let auditor = PollAuditor::new(chain, indexer, config.options());

    let report = auditor.audit(poll).await?;
    if output.json {
        let rendered = serde_json::to_string_pretty(&report).context("unable to encode report")?;
        println!("{rendered}");
    } else {
        print_report(&report, output.verbose);
    }
    Ok(ExitCode::from(report.exit_code()))
}

fn generate_config(path: PathBuf) -> Result<ExitCode> {
    AuditConfig::default().save(&path)?;
    println!("wrote default configuration to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &AuditReport, verbose: bool) {
    let rows = [
        ("Subgraph", report.reported.yes.clone(), report.reported.no.clone()),
        (
            "Node",
            report.computed.decimal(VoteChoice::Yes),
            report.computed.decimal(VoteChoice::No),
        ),
    ];
    let yes_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(0).max(3);
    let no_width = rows.iter().map(|r| r.2.len()).max().unwrap_or(0).max(2);

    println!("poll {} ({})", report.poll, report.window);
    println!("{:<8}  {:>yes_width$}  {:>no_width$}", "", "Yes", "No");
    for (label, yes, no) in &rows {
        println!("{label:<8}  {yes:>yes_width$}  {no:>no_width$}");
    }

    if verbose {
        println!();
        for c in &report.contributions {
            let role = if c.is_registered_delegate { "delegate" } else { "delegator" };
            println!(
                "{} {:<9} {:<3} base={} overrides={} net={}",
                c.voter, role, c.choice, c.base_stake, c.override_stake, c.net_stake
            );
        }
    }

    for voter in &report.registration_mismatches {
        println!("warning: subgraph registration flag for {voter} disagrees with chain");
    }

    match report.verdict.discrepancies() {
        [] => println!("OK: subgraph tally matches chain state"),
        found => {
            for discrepancy in found {
                println!("MISMATCH: {discrepancy}");
            }
        }
    }
}

use anyhow::{bail, Context, Result};
use cgs_kernel::config::LedgerConfig;
use cgs_kernel::export::to_dot;
use cgs_kernel::harness::{run_stress, StressConfig};
use cgs_kernel::journal::EventJournal;
use cgs_kernel::ledger::{build_ledger, ExecutionSample};
use cgs_kernel::mutator::normalize_command_graph;
use cgs_kernel::synthesis::synthesize;
use cgs_kernel::topology::plan_graph;
use cgs_kernel::types::CommandGraph;
use cgs_kernel::validation::{GraphValidator, ReferenceValidator};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn graph_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("graph")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            .help("Path to a command graph JSON document"),
    )
    .arg(
        Arg::new("skip-validation")
            .long("skip-validation")
            .action(ArgAction::SetTrue)
            .help("Analyse the graph without checking node ids and edge endpoints"),
    )
    .arg(
        Arg::new("pretty")
            .long("pretty")
            .action(ArgAction::SetTrue)
            .help("Pretty-print JSON output"),
    )
}

fn cli() -> Command {
    Command::new("cgs-kernel")
        .version(cgs_kernel::VERSION)
        .about("Command graph synthesis: ordering, waves, forecasts and ledger snapshots")
        .subcommand_required(true)
        .subcommand(graph_args(
            Command::new("synthesize")
                .about("Compute the go/no-go synthesis result")
                .arg(
                    Arg::new("report")
                        .long("report")
                        .action(ArgAction::SetTrue)
                        .help("Include topology, forecast breakdown and audit findings"),
                ),
        ))
        .subcommand(graph_args(
            Command::new("ledger")
                .about("Capture a snapshot ledger record")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Ledger configuration (TOML)"),
                )
                .arg(
                    Arg::new("samples")
                        .long("samples")
                        .value_parser(value_parser!(PathBuf))
                        .help("Execution samples (JSON array)"),
                ),
        ))
        .subcommand(graph_args(
            Command::new("normalize").about("Sort nodes and edges canonically"),
        ))
        .subcommand(graph_args(
            Command::new("plan").about("Populate the graph's waves"),
        ))
        .subcommand(graph_args(
            Command::new("dot").about("Render the graph in Graphviz DOT format"),
        ))
        .subcommand(
            Command::new("stress")
                .about("Check topology invariants over random DAGs")
                .arg(
                    Arg::new("graphs")
                        .long("graphs")
                        .default_value("100")
                        .value_parser(value_parser!(usize))
                        .help("Number of graphs to generate"),
                )
                .arg(
                    Arg::new("nodes")
                        .long("nodes")
                        .default_value("50")
                        .value_parser(value_parser!(usize))
                        .help("Nodes per graph"),
                )
                .arg(
                    Arg::new("edge-probability")
                        .long("edge-probability")
                        .default_value("0.1")
                        .value_parser(value_parser!(f64))
                        .help("Chance of an edge between any forward pair of nodes"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop at the first failing graph"),
                ),
        )
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_graph(args: &ArgMatches) -> Result<CommandGraph> {
    let path = args
        .get_one::<PathBuf>("graph")
        .context("missing graph path")?;
    let graph: CommandGraph = read_json(path)?;

    if !args.get_flag("skip-validation") {
        let errors = ReferenceValidator.validate(&graph);
        if !errors.is_empty() {
            for err in &errors {
                tracing::error!("{err}");
            }
            bail!("graph {} failed validation with {} errors", graph.id, errors.len());
        }
    }

    Ok(graph)
}

fn emit<T: Serialize>(value: &T, args: &ArgMatches) -> Result<()> {
    let out = if args.get_flag("pretty") {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cgs_kernel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("synthesize", args)) => {
            let graph = load_graph(args)?;
            let report = synthesize(&graph);
            if args.get_flag("report") {
                emit(&report, args)?;
            } else {
                emit(&report.result, args)?;
            }
            if !report.result.ready {
                std::process::exit(2);
            }
        }
        Some(("ledger", args)) => {
            let graph = load_graph(args)?;
            let config = match args.get_one::<PathBuf>("config") {
                Some(path) => LedgerConfig::load(path)
                    .with_context(|| format!("failed to load {}", path.display()))?,
                None => LedgerConfig::default(),
            };
            let samples: Vec<ExecutionSample> = match args.get_one::<PathBuf>("samples") {
                Some(path) => read_json(path)?,
                None => Vec::new(),
            };
            let record = build_ledger(&graph, &config, samples)?;

            let journal = EventJournal::new();
            let sequence = journal.append(record.event.clone());
            journal.verify_integrity()?;
            if let Some(entry) = journal.entries().last() {
                tracing::info!(sequence, hash = %entry.hash_hex(), "snapshot event journaled");
            }

            emit(&record, args)?;
        }
        Some(("normalize", args)) => {
            let graph = load_graph(args)?;
            emit(&normalize_command_graph(&graph), args)?;
        }
        Some(("plan", args)) => {
            let graph = load_graph(args)?;
            emit(&plan_graph(&graph), args)?;
        }
        Some(("dot", args)) => {
            let graph = load_graph(args)?;
            println!("{}", to_dot(&graph));
        }
        Some(("stress", args)) => {
            let config = StressConfig {
                seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
                graphs: args.get_one::<usize>("graphs").copied().unwrap_or(100),
                nodes_per_graph: args.get_one::<usize>("nodes").copied().unwrap_or(50),
                edge_probability: args
                    .get_one::<f64>("edge-probability")
                    .copied()
                    .unwrap_or(0.1),
                stop_on_first_violation: args.get_flag("stop-on-violation"),
            };

            let report = run_stress(config);
            println!("{}", report.generate_text());
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        _ => {}
    }

    Ok(())
}

// PetriFlow CLI - verify, build, simulate and project workflow nets
// Run with: cargo run --bin petriflow -- verify ci.yml

//! # PetriFlow CLI
//!
//! Thin command-line adapter over the library's pure operations:
//!
//! - `verify <workflow.yml>` - parse, build and validate; exits 0 on
//!   pass, 1 on fail, 2 on inconclusive, 3 on parse or build errors.
//! - `build <workflow.yml>` - print (or write) the net JSON.
//! - `simulate <net.json>` - print the trace JSON; `--interactive`
//!   prompts for each firing.
//! - `project <net.json>` - print the DAG JSON.
//!
//! All JSON leaves on stdout; human-readable rendering and progress go to
//! stderr, so pipes stay clean.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::Select;
use dotenv::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use petriflow::{
    parse_workflow_yaml_with_warnings, project, BuildConfig, CheckStatus, IntentSpec, Marking,
    NetBuilder, PetriNet, ReportStatus, Selection, SimulationConfig, SimulationMode, Simulator,
    TransitionId, TransitionSelector, ValidationConfig, ValidationReport, Validator,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "petriflow")]
#[command(about = "Workflow-to-Petri-net compiler, verifier, simulator and projector")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, build and statically verify a workflow
    Verify {
        /// Path to the workflow YAML
        workflow: PathBuf,

        /// Maximum distinct markings to explore
        #[arg(long, env = "PETRIFLOW_K_BOUND", default_value_t = 200)]
        k_bound: u32,

        /// Wall-clock budget for the exploration, milliseconds
        #[arg(long, env = "PETRIFLOW_MAX_MILLIS", default_value_t = 30_000)]
        max_millis: u64,

        /// Emit the raw report JSON instead of the rendered summary
        #[arg(long)]
        json: bool,
    },

    /// Compile a workflow into a net and print its JSON
    Build {
        /// Path to the workflow YAML
        workflow: PathBuf,

        /// Write the net here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Simulate a net and print the trace JSON
    Simulate {
        /// Path to the net JSON
        net: PathBuf,

        /// Seed for the deterministic selection stream
        #[arg(long, env = "PETRIFLOW_SEED", default_value_t = 0)]
        seed: u64,

        /// Firing budget
        #[arg(long, default_value_t = 1000)]
        max_steps: u32,

        /// Pick each firing interactively instead of by seed
        #[arg(long)]
        interactive: bool,

        /// Pause between firings, milliseconds
        #[arg(long)]
        step_delay_ms: Option<u64>,
    },

    /// Project a net onto its causal DAG and print the JSON
    Project {
        /// Path to the net JSON
        net: PathBuf,
    },
}

/// Exit codes of the `verify` subcommand
const EXIT_PASS: i32 = 0;
const EXIT_FAIL: i32 = 1;
const EXIT_INCONCLUSIVE: i32 = 2;
const EXIT_INPUT_ERROR: i32 = 3;

fn main() {
    // .env is optional; flags and real environment variables win.
    dotenv().ok();

    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match run(cli.command) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {:#}", "error:".red().bold(), error);
            EXIT_INPUT_ERROR
        }
    };
    std::process::exit(code);
}

fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Verify {
            workflow,
            k_bound,
            max_millis,
            json,
        } => verify(&workflow, k_bound, max_millis, json),
        Commands::Build { workflow, output } => build(&workflow, output.as_deref()),
        Commands::Simulate {
            net,
            seed,
            max_steps,
            interactive,
            step_delay_ms,
        } => simulate(&net, seed, max_steps, interactive, step_delay_ms),
        Commands::Project { net } => project_cmd(&net),
    }
}

/// Parse a workflow file into an intent, printing warnings to stderr
fn load_intent(path: &Path) -> Result<IntentSpec> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let (intent, warnings) =
        parse_workflow_yaml_with_warnings(&text, &path.display().to_string())?;
    for warning in &warnings {
        warn!(line = warning.line, "{}", warning.message);
    }
    Ok(intent)
}

/// Load a net JSON document
fn load_net(path: &Path) -> Result<PetriNet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let net: PetriNet =
        serde_json::from_str(&text).with_context(|| format!("invalid net JSON in {}", path.display()))?;
    Ok(net)
}

fn verify(workflow: &Path, k_bound: u32, max_millis: u64, json: bool) -> Result<i32> {
    let intent = load_intent(workflow)?;
    let net = NetBuilder::from_intent(&intent, &BuildConfig::default()).build()?;
    debug!(
        places = net.places.len(),
        transitions = net.transitions.len(),
        "net built"
    );

    let spinner = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} exploring state space ({elapsed})")
            .expect("static template"),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));

    let config = ValidationConfig {
        k_bound,
        max_millis,
        ..ValidationConfig::default()
    };
    let report = Validator::new(&config).validate(&net);
    spinner.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_report(&report);
    }

    Ok(match report.status {
        ReportStatus::Pass => EXIT_PASS,
        ReportStatus::Fail => EXIT_FAIL,
        ReportStatus::Inconclusive => EXIT_INCONCLUSIVE,
    })
}

fn render_report(report: &ValidationReport) {
    let status = match report.status {
        ReportStatus::Pass => "PASS".green().bold(),
        ReportStatus::Fail => "FAIL".red().bold(),
        ReportStatus::Inconclusive => "INCONCLUSIVE".yellow().bold(),
    };
    eprintln!(
        "{} {} ({} states, {} ms)",
        status, report.net_id, report.states_explored, report.elapsed_ms
    );

    for check in &report.checks {
        let mark = match check.status {
            CheckStatus::Pass => "✓".green(),
            CheckStatus::Fail => "✗".red(),
            CheckStatus::Inconclusive => "?".yellow(),
        };
        eprintln!("  {} {:?}: {}", mark, check.kind, check.detail);
    }
    for hint in &report.hints {
        eprintln!("  {} {}", "hint:".cyan(), hint);
    }
    if let Some(witness) = &report.witness {
        eprintln!(
            "  {} {}",
            "witness:".cyan(),
            serde_json::to_string(witness).unwrap_or_default()
        );
    }
}

fn build(workflow: &Path, output: Option<&Path>) -> Result<i32> {
    let intent = load_intent(workflow)?;
    let net = NetBuilder::from_intent(&intent, &BuildConfig::default()).build()?;
    let json = serde_json::to_string_pretty(&net)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!(
                "{} {} ({} places, {} transitions)",
                "wrote".green(),
                path.display(),
                net.places.len(),
                net.transitions.len()
            );
        }
        None => println!("{}", json),
    }
    Ok(EXIT_PASS)
}

/// Terminal prompt backing interactive simulation
struct PromptSelector;

impl TransitionSelector for PromptSelector {
    fn select(&mut self, step: u32, enabled: &[TransitionId], marking: &Marking) -> Selection {
        eprintln!("step {} at {}", step, marking);
        let mut items: Vec<String> = enabled.iter().map(|t| t.as_str().to_string()).collect();
        items.push("(stop)".to_string());

        match Select::new()
            .with_prompt("fire transition")
            .items(&items)
            .default(0)
            .interact()
        {
            Ok(index) if index < enabled.len() => Selection::Fire(enabled[index].clone()),
            _ => Selection::Stop,
        }
    }
}

fn simulate(
    net_path: &Path,
    seed: u64,
    max_steps: u32,
    interactive: bool,
    step_delay_ms: Option<u64>,
) -> Result<i32> {
    let net = load_net(net_path)?;
    let config = SimulationConfig {
        mode: if interactive {
            SimulationMode::Interactive
        } else {
            SimulationMode::Deterministic
        },
        seed,
        max_steps,
        step_delay_ms,
        ..SimulationConfig::default()
    };
    let simulator = Simulator::new(&config);
    let trace = if interactive {
        simulator.run_with(&net, &mut PromptSelector)?
    } else {
        simulator.run(&net)?
    };

    eprintln!(
        "{} {} firings, terminated by {:?}",
        "simulated".green(),
        trace.steps,
        trace.termination
    );
    println!("{}", serde_json::to_string_pretty(&trace)?);
    Ok(EXIT_PASS)
}

fn project_cmd(net_path: &Path) -> Result<i32> {
    let net = load_net(net_path)?;
    let dag = project(&net)?;
    eprintln!(
        "{} {} nodes, {} edges",
        "projected".green(),
        dag.nodes.len(),
        dag.edges.len()
    );
    println!("{}", serde_json::to_string_pretty(&dag)?);
    Ok(EXIT_PASS)
}

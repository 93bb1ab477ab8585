mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::uat::UatSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ms-tools",
    about = "Planning-context scanner and UAT bookkeeping for .planning/ projects",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: auto-detect from .planning/ or .git/)
    #[arg(long, global = true, env = "MS_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score prior planning artifacts for relevance to a phase
    ScanContext {
        /// Target phase number (e.g. 5, 05, 2.1)
        #[arg(long)]
        phase: String,

        /// Phase name; words longer than two characters become keywords
        #[arg(long, default_value = "")]
        phase_name: String,

        /// Subsystem to match (repeatable)
        #[arg(long = "subsystem")]
        subsystems: Vec<String>,

        /// Comma-separated keywords matched against summary tags
        #[arg(long, default_value = "")]
        keywords: String,
    },

    /// Manage a phase's UAT tracking file
    Uat {
        #[command(subcommand)]
        subcommand: UatSubcommand,
    },

    /// Find a phase directory and check it against ROADMAP.md
    FindPhase { phase: String },

    /// Count plans, summaries, and other artifacts for a phase
    ListArtifacts { phase: String },

    /// Check whether one artifact type exists for a phase
    CheckArtifact {
        phase: String,
        /// CONTEXT, DESIGN, RESEARCH, UAT, VERIFICATION, PLAN, SUMMARY, or EXECUTION-ORDER
        artifact: String,
    },

    /// List phase directories in an inclusive range (decimal phases included)
    ListPhases {
        #[arg(long)]
        from: u32,
        #[arg(long)]
        to: u32,
    },

    /// Report subsystem values used across planning artifacts
    Subsystems {
        /// Print bare values instead of path/value pairs
        #[arg(long)]
        values_only: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let provider = root::WalkUpRoot::new(cli.root.as_deref());

    let result = match cli.command {
        Commands::ScanContext {
            phase,
            phase_name,
            subsystems,
            keywords,
        } => cmd::scan::run(&provider, &phase, &phase_name, &subsystems, &keywords, cli.json),
        Commands::Uat { subcommand } => cmd::uat::run(&provider, subcommand, cli.json),
        Commands::FindPhase { phase } => cmd::phase::find(&provider, &phase),
        Commands::ListArtifacts { phase } => cmd::phase::list_artifacts(&provider, &phase),
        Commands::CheckArtifact { phase, artifact } => {
            cmd::phase::check_artifact(&provider, &phase, &artifact)
        }
        Commands::ListPhases { from, to } => cmd::phase::list_phases(&provider, from, to, cli.json),
        Commands::Subsystems { values_only } => {
            cmd::subsystems::run(&provider, values_only, cli.json)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

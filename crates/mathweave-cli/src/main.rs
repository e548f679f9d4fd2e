use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use mathweave_common::telemetry::{self, TelemetryConfig};
use mathweave_common::{EditorConfig, parse_json};
use mathweave_editor_core::{
    MathMode, MathNode, MathRenderer, MathSession, PulldownRenderer, split_lines,
};

#[derive(Parser)]
#[command(version, about = "Mathweave - inspect and render persisted math nodes", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Editor config (JSON). Defaults plus MATHWEAVE_* environment overrides otherwise.
    #[arg(long, global = true, env = "MATHWEAVE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the node's LaTeX with matrix placeholders expanded
    Expand {
        /// Path to node JSON
        node: PathBuf,
    },
    /// Render the node to MathML
    Render {
        /// Path to node JSON
        node: PathBuf,

        /// Render in inline mode even for block nodes
        #[arg(long)]
        inline: bool,
    },
    /// Print the editor lines the stored LaTeX splits into
    Lines {
        /// Path to node JSON
        node: PathBuf,
    },
    /// Drop matrices no line references and print the resulting node
    Prune {
        /// Path to node JSON
        node: PathBuf,
    },
}

fn main() -> Result<()> {
    init_miette();
    telemetry::init(TelemetryConfig::from_env("mathweave-cli"));

    let cli = Cli::parse();

    match cli.command {
        Commands::Expand { node } => {
            let node = read_node(&node)?;
            println!("{}", node.expanded_latex());
        }
        Commands::Render { node, inline } => {
            let node = read_node(&node)?;
            let result = if inline {
                PulldownRenderer.render(&node.expanded_latex(), MathMode::Inline)
            } else {
                node.render(&PulldownRenderer)
            };
            if result.is_error() {
                tracing::warn!(id = %node.id, "node did not render cleanly");
            }
            println!("{}", result.html());
        }
        Commands::Lines { node } => {
            let node = read_node(&node)?;
            for (i, line) in split_lines(&node.latex).iter().enumerate() {
                println!("{i}\t{line}");
            }
        }
        Commands::Prune { node } => {
            let config = load_config(cli.config.as_deref())?;
            let mut node = read_node(&node)?;
            let before = node.matrices.len();
            let mut session = MathSession::open(&config, &node.latex, node.matrices.clone());
            let payload = session.save()?;
            node.apply_save(payload);
            tracing::info!(
                id = %node.id,
                pruned = before - node.matrices.len(),
                "pruned node"
            );
            let json = serde_json::to_string_pretty(&node).into_diagnostic()?;
            println!("{json}");
        }
    }

    Ok(())
}

fn read_node(path: &Path) -> Result<MathNode> {
    let src = std::fs::read_to_string(path).into_diagnostic()?;
    let node = parse_json(&path.display().to_string(), &src)?;
    Ok(node)
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let config = match path {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::from_env()?,
    };
    Ok(config)
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use amdoc::module::ModuleGraph;
use amdoc::report;
use amdoc::source::module_id_from_path;
use amdoc::{Diagnostic, Interpreter, JsonSource, Severity};

#[derive(Parser)]
#[command(name = "amdoc", version, about = "Static API documentation extractor for AMD-style modules")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the module graph from a tree of parsed sources
    Extract {
        /// Directory of parsed module trees; module `a/b` lives at
        /// `<root>/a/b.json`
        root: PathBuf,

        /// Entry-point module ids; defaults to every module under the root
        ids: Vec<String>,

        /// Write the JSON report to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Recursion budget for the tree walk
        #[arg(long, default_value_t = 200)]
        max_depth: usize,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Extract {
            root,
            ids,
            out,
            max_depth,
        } => extract(&root, ids, out.as_deref(), max_depth),
    }
}

fn extract(root: &Path, mut ids: Vec<String>, out: Option<&Path>, max_depth: usize) -> ExitCode {
    if ids.is_empty() {
        if let Err(err) = collect_ids(root, root, &mut ids) {
            eprintln!("{} cannot scan '{}': {}", "error:".red().bold(), root.display(), err);
            return ExitCode::FAILURE;
        }
        ids.sort();
    }
    if ids.is_empty() {
        eprintln!("{} no module sources under '{}'", "error:".red().bold(), root.display());
        return ExitCode::FAILURE;
    }

    let mut interpreter = Interpreter::new(Box::new(JsonSource::new(root)));
    interpreter.set_max_depth(max_depth);

    for id in &ids {
        if let Err(err) = interpreter.run(id) {
            eprintln!("{} {}", "error:".red().bold(), err);
            return ExitCode::FAILURE;
        }
    }

    print_summary(&interpreter.graph, &interpreter.diagnostics);

    let json = report::report_to_json(&interpreter.graph, &interpreter.diagnostics);
    let rendered = match serde_json::to_string_pretty(&json) {
        Ok(rendered) => rendered,
        Err(err) => {
            eprintln!("{} cannot render report: {}", "error:".red().bold(), err);
            return ExitCode::FAILURE;
        }
    };
    match out {
        Some(path) => {
            if let Err(err) = std::fs::write(path, rendered) {
                eprintln!("{} cannot write '{}': {}", "error:".red().bold(), path.display(), err);
                return ExitCode::FAILURE;
            }
        }
        None => println!("{}", rendered),
    }

    ExitCode::SUCCESS
}

fn print_summary(graph: &ModuleGraph, diagnostics: &[Diagnostic]) {
    eprintln!(
        "{} {} module(s) extracted",
        "ok:".green().bold(),
        graph.len()
    );
    for diagnostic in diagnostics {
        let tag = match diagnostic.severity {
            Severity::Info => "info:".dimmed(),
            Severity::Warning => "warning:".yellow().bold(),
            Severity::Error => "error:".red().bold(),
        };
        eprintln!("{} {}", tag, diagnostic);
    }
}

fn collect_ids(root: &Path, dir: &Path, ids: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_ids(root, &path, ids)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            if let Some(id) = module_id_from_path(root, &path) {
                ids.push(id);
            }
        }
    }
    Ok(())
}

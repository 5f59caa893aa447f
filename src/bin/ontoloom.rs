//! Ontoloom CLI: run a merge session offline over fragment files.
//!
//! Usage:
//!   ontoloom run --topic <T> --fragments <DIR> [--export out.jsonld] [--command prog args..]
//!   ontoloom check --fragments <DIR>

use clap::{Parser, Subcommand};
use ontoloom::{
    CommandExtractor, EnrichmentSubject, Extractor, Filters, Fragment, IngestionQueue, NodeKind,
    ReplayExtractor, Session, SessionConfig, SessionHandle,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;

/// Upper bound on layout ticks after ingestion.
const MAX_SETTLE_TICKS: usize = 10_000;

#[derive(Parser)]
#[command(
    name = "ontoloom",
    version,
    about = "Incremental knowledge-graph merge engine"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every fragment file into one session and settle the layout
    Run {
        /// Session topic
        #[arg(long)]
        topic: String,
        /// Directory of *.json fragment files, one subject each
        #[arg(long)]
        fragments: PathBuf,
        /// YAML config file (defaults to <config_dir>/ontoloom/config.yaml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the JSON-LD export here
        #[arg(long)]
        export: Option<PathBuf>,
        /// Show only instances of this kind
        #[arg(long = "type")]
        kind: Option<String>,
        /// Hide Class nodes and ontology links
        #[arg(long)]
        hide_ontology: bool,
        /// Highlight nodes whose label contains this term
        #[arg(long)]
        search: Option<String>,
        /// Override the delay between subjects
        #[arg(long)]
        pacing_ms: Option<u64>,
        /// External extractor: program and arguments; fragment text goes to its stdin
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Parse fragment files and report what each contains
    Check {
        /// Directory of *.json fragment files
        #[arg(long)]
        fragments: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

/// `*.json` files in `dir`, sorted by name.
fn fragment_files(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("Failed to read {}: {}", dir.display(), e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

fn subject_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_subjects(files: &[PathBuf]) -> Result<Vec<EnrichmentSubject>, String> {
    files
        .iter()
        .map(|path| {
            std::fs::read_to_string(path)
                .map(|text| EnrichmentSubject::new(subject_id(path), text))
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))
        })
        .collect()
}

struct RunArgs {
    topic: String,
    fragments: PathBuf,
    config: Option<PathBuf>,
    export: Option<PathBuf>,
    kind: Option<String>,
    hide_ontology: bool,
    search: Option<String>,
    pacing_ms: Option<u64>,
    command: Vec<String>,
}

fn cmd_run(args: RunArgs) -> i32 {
    let mut config = match SessionConfig::resolve(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if let Some(pacing_ms) = args.pacing_ms {
        config.queue.pacing_ms = pacing_ms;
    }

    let type_filter = match args.kind.as_deref().map(str::parse::<NodeKind>).transpose() {
        Ok(kind) => kind,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let subjects = match fragment_files(&args.fragments).and_then(|files| read_subjects(&files)) {
        Ok(subjects) => subjects,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let subject_count = subjects.len();

    let extractor: Arc<dyn Extractor> = match args.command.split_first() {
        Some((program, rest)) => Arc::new(CommandExtractor::new(program.clone(), rest.to_vec())),
        None => Arc::new(ReplayExtractor),
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return 1;
        }
    };

    let queue_config = config.queue.clone();
    let mut session = Session::new(args.topic, config);
    session.set_filters(Filters {
        type_filter,
        show_ontology_layer: !args.hide_ontology,
        search_term: args.search.clone().unwrap_or_default(),
    });
    let handle = SessionHandle::new(session);

    let enqueued = runtime.block_on(async {
        let queue = IngestionQueue::spawn(extractor, Arc::new(handle.clone()), queue_config);
        let result = queue.enqueue(subjects);
        queue.wait_idle().await;
        queue.shutdown().await;
        result
    });
    if let Err(e) = enqueued {
        eprintln!("Error: {}", e);
        return 1;
    }

    let ticks = handle.update(|session| {
        let mut ticks = 0;
        while ticks < MAX_SETTLE_TICKS && session.tick().is_some() {
            ticks += 1;
        }
        ticks
    });

    let session = handle.lock();
    let store = session.store();
    let counts = session.view().counts();
    println!("Topic: {}", session.topic());
    println!("Subjects: {}", subject_count);
    println!(
        "Graph: {} nodes ({} classes), {} links",
        store.node_count(),
        store.class_ids().len(),
        store.link_count()
    );
    println!(
        "View: {} nodes, {} links, {} highlighted",
        counts.nodes, counts.links, counts.highlighted
    );
    println!(
        "Layout: {:?} after {} ticks (alpha {:.4})",
        session.layout().state(),
        ticks,
        session.layout().alpha()
    );
    if let Some(term) = args.search.as_deref() {
        for (id, score) in session.view().ranked_matches(term, 5) {
            println!("  match {} (score {})", id, score);
        }
    }

    if let Some(path) = args.export {
        let text = match session.export_json_ld_string() {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Error: failed to serialize export: {}", e);
                return 1;
            }
        };
        if let Err(e) = std::fs::write(&path, text) {
            eprintln!("Error: failed to write {}: {}", path.display(), e);
            return 1;
        }
        println!("Exported JSON-LD to {}", path.display());
    }
    0
}

fn cmd_check(fragments: &Path) -> i32 {
    let files = match fragment_files(fragments) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let mut failures = 0;
    for path in &files {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("{}: unreadable: {}", path.display(), e);
                failures += 1;
                continue;
            }
        };
        match Fragment::from_response_text(&text) {
            Ok(fragment) => println!(
                "{}: {} nodes, {} links, {} dropped",
                path.display(),
                fragment.nodes.len(),
                fragment.links.len(),
                fragment.rejections.len()
            ),
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    println!("{} files, {} failed", files.len(), failures);
    if failures > 0 {
        1
    } else {
        0
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match cli.command {
        Commands::Run {
            topic,
            fragments,
            config,
            export,
            kind,
            hide_ontology,
            search,
            pacing_ms,
            command,
        } => cmd_run(RunArgs {
            topic,
            fragments,
            config,
            export,
            kind,
            hide_ontology,
            search,
            pacing_ms,
            command,
        }),
        Commands::Check { fragments } => cmd_check(&fragments),
    };
    std::process::exit(code);
}

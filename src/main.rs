//! noteweave - personal knowledge-base daemon
//!
//! Thin CLI/daemon shell around `noteweave-core`: parses arguments, builds
//! a `Config`, constructs one `KnowledgeGraph`, and either runs a single
//! library operation or starts the continuous file watcher. Prompt
//! construction, tool dispatch, the HTTP surface and authentication are
//! out of scope here (`spec.md` §1) — this binary is a CLI driver over
//! the same library contract an external agent/HTTP layer would use.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use noteweave_core::config::Config;
use noteweave_core::{logging, KnowledgeGraph};

/// noteweave - a local personal knowledge-base engine
#[derive(Parser, Debug)]
#[command(name = "noteweave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Notes directory to watch/index (overrides the config file)
    #[arg(long, global = true, env = "NOTEWEAVE_NOTES_DIR")]
    notes_dir: Option<PathBuf>,

    /// Knowledge-base state directory (defaults to `<notes_dir>/.knowledge_base`)
    #[arg(long, global = true, env = "NOTEWEAVE_KB_DIR")]
    kb_dir: Option<PathBuf>,

    /// Path to a `config.toml` to load before CLI overrides are applied
    #[arg(long, global = true, env = "NOTEWEAVE_CONFIG")]
    config: Option<PathBuf>,

    /// Emit debug-level logs
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Explicit log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Print results as JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the category folders and knowledge-base directory, then reconcile once
    Init,
    /// Reconcile the in-memory graph and vector store with the notes directory
    Sync {
        /// Reprocess every file regardless of cached hash
        #[arg(long)]
        force: bool,
    },
    /// Watch the notes directory and keep the graph in sync continuously
    Watch,
    /// Create a new note
    Add {
        title: String,
        body: String,
        #[arg(long, default_value = "Quick Notes")]
        category: String,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Append a dated update section to an existing note
    Update {
        path: PathBuf,
        text: String,
    },
    /// Semantic (embedding) search
    SearchSemantic {
        query: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
    /// Lexical (grep) search across note files
    SearchContent {
        query: String,
        #[arg(long)]
        case_sensitive: bool,
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
    /// Unified search across semantic, grep, title and tag sub-queries
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
    /// Decide whether new content should create a note or update an existing one
    Decide {
        content: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// Print aggregate graph statistics
    Stats,
    /// List nodes with no incoming links
    Orphans,
    /// List edges whose target does not resolve to a node
    BrokenLinks,
    /// Dump the graph projection used for visualization
    GraphData,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_tracing(cli.verbose, cli.log_level.as_deref(), cli.log_json) {
        eprintln!("warning: failed to initialize logging: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> noteweave_core::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(notes_dir) = &cli.notes_dir {
        config.notes_directory = notes_dir.to_string_lossy().to_string();
    }
    config.knowledge_base_directory = match &cli.kb_dir {
        Some(kb_dir) => kb_dir.to_string_lossy().to_string(),
        None => PathBuf::from(&config.notes_directory)
            .join(".knowledge_base")
            .to_string_lossy()
            .to_string(),
    };
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> noteweave_core::Result<()> {
    let json = cli.json;
    let config = build_config(&cli)?;

    match &cli.command {
        Commands::Init => run_init(config, json).await,
        Commands::Sync { force } => run_sync(config, *force, json).await,
        Commands::Watch => run_watch(config).await,
        Commands::Add { title, body, category, tags } => run_add(config, title, body, category, tags, json).await,
        Commands::Update { path, text } => run_update(config, path, text, json).await,
        Commands::SearchSemantic { query, k } => run_search_semantic(config, query, *k, json).await,
        Commands::SearchContent { query, case_sensitive, k } => {
            run_search_content(config, query, *case_sensitive, *k, json).await
        }
        Commands::Search { query, k } => run_unified_search(config, query, *k, json).await,
        Commands::Decide { content, category } => run_decide(content, category.as_deref(), json),
        Commands::Stats => run_stats(config, json).await,
        Commands::Orphans => run_orphans(config, json).await,
        Commands::BrokenLinks => run_broken_links(config, json).await,
        Commands::GraphData => run_graph_data(config, json).await,
    }
}

async fn run_init(config: Config, json: bool) -> noteweave_core::Result<()> {
    let graph = KnowledgeGraph::init(config).await?;
    let stats = graph.get_statistics().await;
    print_json_or(json, &stats, || {
        println!(
            "initialized {} with {} nodes, {} edges",
            graph.notes_root().display(),
            stats.total_nodes,
            stats.total_edges
        );
    });
    Ok(())
}

async fn run_sync(config: Config, force: bool, json: bool) -> noteweave_core::Result<()> {
    let graph = KnowledgeGraph::init(config).await?;
    let report = graph.sync(force).await?;
    print_json_or(json, &report, || {
        println!(
            "sync complete in {}ms: {} added, {} updated, {} removed ({} stale hash entries, {} orphaned vectors pruned)",
            report.duration_ms,
            report.added,
            report.updated,
            report.removed,
            report.orphaned_hash_entries_removed,
            report.orphaned_vectors_removed
        );
        for err in &report.errors {
            eprintln!("  error: {err}");
        }
    });
    Ok(())
}

async fn run_watch(config: Config) -> noteweave_core::Result<()> {
    let graph = Arc::new(KnowledgeGraph::init(config).await?);
    graph.sync(false).await?;
    tracing::info!(root = %graph.notes_root().display(), "starting file watcher");
    let watcher = noteweave_core::watcher::spawn(graph.clone())?;
    wait_for_shutdown_signal().await;
    tracing::info!("shutting down file watcher");
    watcher.stop().await;
    Ok(())
}

async fn run_add(
    config: Config,
    title: &str,
    body: &str,
    category: &str,
    tags: &[String],
    json: bool,
) -> noteweave_core::Result<()> {
    let graph = KnowledgeGraph::init(config).await?;
    let id = graph.add_note_from_content(title, body, category, tags).await?;
    print_json_or(json, &id, || println!("created note {id}"));
    Ok(())
}

async fn run_update(config: Config, path: &std::path::Path, text: &str, json: bool) -> noteweave_core::Result<()> {
    let graph = KnowledgeGraph::init(config).await?;
    let index = noteweave_core::notes::NotesIndex::new();
    let changed = noteweave_core::notes::update_note(path, text, &index)?;
    if changed {
        graph.process_path(path).await?;
    }
    print_json_or(json, &changed, || {
        println!("{}", if changed { "note updated" } else { "no-op: section already present" });
    });
    Ok(())
}

async fn run_search_semantic(config: Config, query: &str, k: usize, json: bool) -> noteweave_core::Result<()> {
    let graph = KnowledgeGraph::init(config).await?;
    let results = graph.search_semantic(query, k).await?;
    print_json_or(json, &results, || {
        for r in &results {
            println!("{:.3}  {}  ({})", r.similarity, r.title, r.category);
            println!("    {}", r.snippet);
        }
    });
    Ok(())
}

async fn run_search_content(
    config: Config,
    query: &str,
    case_sensitive: bool,
    k: usize,
    json: bool,
) -> noteweave_core::Result<()> {
    let graph = KnowledgeGraph::init(config).await?;
    let results = graph.search_content(query, Some(case_sensitive), k).await?;
    print_json_or(json, &results, || {
        for file in &results {
            println!("{} ({} matches)", file.file_path, file.total_matches);
            for m in &file.matches {
                println!("  {}: {}", m.line_number, m.context.replace('\n', " | "));
            }
        }
    });
    Ok(())
}

async fn run_unified_search(config: Config, query: &str, k: usize, json: bool) -> noteweave_core::Result<()> {
    let graph = KnowledgeGraph::init(config).await?;
    let results = graph.unified_search(query, k).await?;
    print_json_or(json, &results, || {
        for r in &results {
            println!(
                "{:.3} [{}]  {}  ({})",
                r.relevance_score,
                r.source_type.as_str(),
                r.title,
                r.category
            );
            println!("    {}", r.snippet);
        }
    });
    Ok(())
}

fn run_decide(content: &str, category: Option<&str>, json: bool) -> noteweave_core::Result<()> {
    let index = noteweave_core::notes::NotesIndex::new();
    let decision = noteweave_core::decide::decide_note_action(content, category, &index);
    print_json_or(json, &decision, || {
        println!("{:?} (confidence {:.2})", decision.action, decision.confidence);
        for reason in &decision.reasoning {
            println!("  - {reason}");
        }
    });
    Ok(())
}

async fn run_stats(config: Config, json: bool) -> noteweave_core::Result<()> {
    let graph = KnowledgeGraph::init(config).await?;
    let stats = graph.get_statistics().await;
    print_json_or(json, &stats, || {
        println!("{} nodes, {} edges", stats.total_nodes, stats.total_edges);
        println!("{} orphans, {} broken links", stats.orphan_count, stats.broken_link_count);
    });
    Ok(())
}

async fn run_orphans(config: Config, json: bool) -> noteweave_core::Result<()> {
    let graph = KnowledgeGraph::init(config).await?;
    let orphans = graph.find_orphans().await;
    print_json_or(json, &orphans, || {
        for id in &orphans {
            println!("{id}");
        }
    });
    Ok(())
}

async fn run_broken_links(config: Config, json: bool) -> noteweave_core::Result<()> {
    let graph = KnowledgeGraph::init(config).await?;
    let broken = graph.find_broken_links().await;
    print_json_or(json, &broken, || {
        for (source, target) in &broken {
            println!("{source} -> {target}");
        }
    });
    Ok(())
}

async fn run_graph_data(config: Config, json: bool) -> noteweave_core::Result<()> {
    let graph = KnowledgeGraph::init(config).await?;
    let data = graph.get_graph_data().await;
    print_json_or(json, &data, || {
        println!("{} nodes, {} edges", data.nodes.len(), data.edges.len());
    });
    Ok(())
}

fn print_json_or<T: serde::Serialize>(json: bool, value: &T, human: impl FnOnce()) {
    if json {
        match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("error: failed to serialize output: {e}"),
        }
    } else {
        human();
    }
}

/// Wait for Ctrl+C so `watch` exits cleanly instead of being killed
/// mid-write. `ctrlc` (rather than `tokio::signal`) handles the signal
/// registration; the handler bridges back into the async world through a
/// one-shot channel.
async fn wait_for_shutdown_signal() {
    let (tx, rx) = tokio::sync::oneshot::channel();
    let tx = std::sync::Mutex::new(Some(tx));
    let handler_result = ctrlc::set_handler(move || {
        if let Some(tx) = tx.lock().unwrap().take() {
            let _ = tx.send(());
        }
    });
    if handler_result.is_err() {
        tracing::warn!("failed to register Ctrl+C handler; watch will not exit cleanly on signal");
        std::future::pending::<()>().await;
    }
    let _ = rx.await;
}

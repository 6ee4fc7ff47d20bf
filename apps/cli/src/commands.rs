//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use tripleloop_core::{Answer, Assistant, load_document};
use tripleloop_retrieval::{ChunkStrategy, Retriever};
use tripleloop_shared::{AppConfig, ChunkStrategyKind, init_config, load_config};

/// Characters of chunk text shown in listings.
const PREVIEW_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Triple Loop: a change-management expert grounded in the Triple Loop of Change framework.
#[derive(Parser)]
#[command(
    name = "tripleloop",
    version,
    about = "Ask questions about the Triple Loop of Change framework.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Plain-text knowledge document (defaults to the bundled framework text).
    #[arg(long, global = true, env = "TRIPLELOOP_DOCUMENT")]
    pub document: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Chunking strategy as accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum StrategyArg {
    SlidingWindow,
    ParagraphPacking,
}

impl From<StrategyArg> for ChunkStrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::SlidingWindow => Self::SlidingWindow,
            StrategyArg::ParagraphPacking => Self::ParagraphPacking,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Ask a single question and print the answer.
    Ask {
        /// The question (words are joined with spaces).
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Interactive question loop. Type `exit` or send EOF to leave.
    Chat,

    /// Show which chunks would be sent as context for a query.
    Search {
        /// The query (words are joined with spaces).
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Number of chunks to select.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Print the chunk sequence of the knowledge document.
    Chunks {
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Target chunk size in bytes.
        #[arg(long)]
        target_size: Option<usize>,

        /// Sliding-window overlap in bytes.
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tripleloop=info",
        1 => "tripleloop=debug",
        _ => "tripleloop=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ask { question } => {
            let config = resolve_config(cli.document)?;
            cmd_ask(&config, &question.join(" ")).await
        }
        Command::Chat => {
            let config = resolve_config(cli.document)?;
            cmd_chat(&config).await
        }
        Command::Search { query, top_k } => {
            let config = resolve_config(cli.document)?;
            cmd_search(&config, &query.join(" "), top_k)
        }
        Command::Chunks {
            strategy,
            target_size,
            overlap,
        } => {
            let mut config = resolve_config(cli.document)?;
            apply_chunking_overrides(&mut config, strategy, target_size, overlap);
            cmd_chunks(&config)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => {
                let config = resolve_config(cli.document)?;
                cmd_config_show(&config)
            }
        },
    }
}

/// Config file values with command-line overrides applied.
fn resolve_config(document: Option<PathBuf>) -> Result<AppConfig> {
    let mut config = load_config()?;
    if document.is_some() {
        config.knowledge.document_path = document;
    }
    Ok(config)
}

fn apply_chunking_overrides(
    config: &mut AppConfig,
    strategy: Option<StrategyArg>,
    target_size: Option<usize>,
    overlap: Option<usize>,
) {
    if let Some(strategy) = strategy {
        config.chunking.strategy = strategy.into();
    }
    if let Some(target_size) = target_size {
        config.chunking.target_size = target_size;
    }
    if let Some(overlap) = overlap {
        config.chunking.overlap = overlap;
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Spinner shown while waiting for the model.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new(message: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn ask_with_spinner(assistant: &Assistant, question: &str) -> tripleloop_shared::Result<Answer> {
    let progress = CliProgress::new("Denke nach...");
    let answer = assistant.answer(question).await;
    progress.finish();
    answer
}

fn print_answer(answer: &Answer) {
    println!();
    println!("{}", answer.text.trim());
    println!();
    info!(
        model = %answer.model,
        context_chunks = answer.context_chunks,
        fallback = answer.fallback,
        total_tokens = answer.usage.total_tokens,
        "answer printed"
    );
}

async fn cmd_ask(config: &AppConfig, question: &str) -> Result<()> {
    let assistant = Assistant::from_config(config)?;
    let answer = ask_with_spinner(&assistant, question).await?;
    print_answer(&answer);
    Ok(())
}

async fn cmd_chat(config: &AppConfig) -> Result<()> {
    let assistant = Assistant::from_config(config)?;

    println!("Triple Loop of Change Experte ({})", assistant.model());
    println!("Stellen Sie Ihre Frage. `exit` beendet das Gespräch.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        match ask_with_spinner(&assistant, question).await {
            Ok(answer) => print_answer(&answer),
            Err(e) => {
                warn!(error = %e, "question failed");
                eprintln!("Fehler: {e}");
            }
        }
    }

    Ok(())
}

fn cmd_search(config: &AppConfig, query: &str, top_k: Option<usize>) -> Result<()> {
    let document = load_document(config.knowledge.document_path.as_deref())?;
    let mut retriever = Retriever::from_config(document, config)?;
    if let Some(top_k) = top_k {
        if top_k == 0 {
            return Err(eyre!("--top-k must be at least 1"));
        }
        retriever = retriever.with_top_k(top_k);
    }

    let results = retriever.retrieve(query);
    if results.is_empty() {
        println!("Knowledge document is empty.");
        return Ok(());
    }
    if results.fallback {
        println!("No chunk matched; showing the leading chunks.");
    }

    for scored in &results.chunks {
        let chunk = scored.chunk;
        println!(
            "#{:<3} score {:>4}  [{}..{})  {}",
            chunk.index,
            scored.score,
            chunk.start,
            chunk.end,
            preview(&chunk.text)
        );
    }
    Ok(())
}

fn cmd_chunks(config: &AppConfig) -> Result<()> {
    let strategy = ChunkStrategy::try_from(&config.chunking)?;
    let document = load_document(config.knowledge.document_path.as_deref())?;
    let chunks = strategy.chunk(document.text());

    println!(
        "{} chunks ({}, {} bytes)",
        chunks.len(),
        strategy.name(),
        document.len()
    );
    for chunk in &chunks {
        println!(
            "#{:<3} [{}..{}) {:>5}  {}",
            chunk.index,
            chunk.start,
            chunk.end,
            chunk.text.len(),
            preview(&chunk.text)
        );
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

/// First line-folded characters of `text`, with an ellipsis when cut.
fn preview(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}…")
}

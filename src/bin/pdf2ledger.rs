//! CLI binary for pdf2ledger.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2ledger::display::{format_brl, format_date, format_document, render_invoice, render_plan, render_results};
use pdf2ledger::{
    analyze, process, BookkeepingApi, ExecutionProgressCallback, HttpBookkeeping, PipelineConfig,
    ProcessingMode, ProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while the model works, switching
/// to a bar with one log line per call once the plan is executed.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the call currently in flight.
    call_started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new_spinner(message: &str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Gemini");
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            call_started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} calls  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Executing");
        self.bar.reset_elapsed();
    }

    fn elapsed_secs(&self) -> f64 {
        self.call_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Clear the spinner if execution never started (analyze, plan-only).
    fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl ExecutionProgressCallback for CliProgressCallback {
    fn on_plan_start(&self, total_calls: usize) {
        self.activate_bar(total_calls);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Executing plan with {total_calls} calls…"))
        ));
    }

    fn on_call_start(&self, _index: usize, _total: usize, description: &str) {
        if let Ok(mut t) = self.call_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(description.to_string());
    }

    fn on_call_complete(&self, index: usize, total: usize) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} Call {:>2}/{:<2}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_call_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Call {:>2}/{:<2}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_call_skipped(&self, index: usize, total: usize, method: &str, endpoint: &str) {
        self.bar.println(format!(
            "  {} Call {:>2}/{:<2}  {}",
            yellow("–"),
            index,
            total,
            dim(&format!("skipped {method} {endpoint}")),
        ));
        self.bar.inc(1);
    }

    fn on_plan_complete(&self, total_calls: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);

        if failed == 0 {
            eprintln!(
                "{} {}/{} calls succeeded",
                green("✔"),
                bold(&success_count.to_string()),
                total_calls
            );
        } else {
            eprintln!(
                "{} {}/{} calls succeeded  ({} failed)",
                if success_count == 0 { red("✘") } else { yellow("⚠") },
                bold(&success_count.to_string()),
                total_calls,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract and show invoice data
  pdf2ledger analyze nota.pdf

  # Extract and show the reconciliation plan (reads /pessoas, writes nothing)
  pdf2ledger process nota.pdf

  # Extract, plan and record the movement in the backend
  pdf2ledger process nota.pdf --execute

  # Machine-readable output
  pdf2ledger process nota.pdf --execute --json > result.json

  # Browse backend records
  pdf2ledger list pessoas
  pdf2ledger list parcelas --movimento 42

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY       Google Gemini API key (required for analyze/process)
  GEMINI_MODEL         Model ID (default: gemini-2.5-flash)
  GEMINI_API_URL       Full generateContent URL, overrides GEMINI_MODEL
  FINANCEIRO_API_URL   Bookkeeping API root
                       (default: https://express-tarefa.onrender.com/api/financeiro)
  RUST_LOG             Override log filter (e.g. pdf2ledger=debug)

NOTES:
  --execute has no rollback. If a call fails midway, records created by
  earlier calls stay in the backend; check the per-call results.
"#;

/// Extract, classify and book PDF invoices using Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2ledger",
    version,
    about = "Extract, classify and book PDF invoices using Gemini",
    long_about = "Read a Brazilian purchase invoice (NF-e PDF) with Google Gemini, classify the \
expense, reconcile supplier and customer against the bookkeeping backend and record the \
movement with its installments.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Gemini API key.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model ID.
    #[arg(long, global = true, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Full Gemini generateContent URL.
    #[arg(long, global = true, env = "GEMINI_API_URL")]
    api_url: Option<String>,

    /// Bookkeeping API root URL.
    #[arg(long, global = true, env = "FINANCEIRO_API_URL")]
    backend_url: Option<String>,

    /// LLM temperature (0.0–2.0). Provider default when unset.
    #[arg(long, global = true, env = "PDF2LEDGER_TEMPERATURE")]
    temperature: Option<f32>,

    /// Per-request timeout in seconds for Gemini and the backend.
    #[arg(long, global = true, env = "PDF2LEDGER_TIMEOUT")]
    timeout: Option<u64>,

    /// Accept invoices whose installment count or amounts are inconsistent.
    #[arg(long, global = true, env = "PDF2LEDGER_LENIENT")]
    lenient: bool,

    /// Path to a text file replacing the built-in extraction prompt.
    #[arg(long, global = true, env = "PDF2LEDGER_EXTRACTION_PROMPT")]
    extraction_prompt: Option<PathBuf>,

    /// Path to a text file replacing the built-in planner prompt.
    #[arg(long, global = true, env = "PDF2LEDGER_PLANNER_PROMPT")]
    planner_prompt: Option<PathBuf>,

    /// Output structured JSON instead of formatted text.
    #[arg(long, global = true, env = "PDF2LEDGER_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDF2LEDGER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2LEDGER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, global = true, env = "PDF2LEDGER_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract invoice data from a PDF. Does not contact the backend.
    Analyze {
        /// Invoice PDF.
        pdf: PathBuf,
    },
    /// Extract, plan and optionally execute the bookkeeping calls.
    Process {
        /// Invoice PDF.
        pdf: PathBuf,

        /// Run the plan against the backend (default: show it only).
        #[arg(long)]
        execute: bool,
    },
    /// List records stored in the backend.
    List {
        #[command(subcommand)]
        resource: ListResource,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum ListResource {
    /// Registered suppliers and customers.
    Pessoas,
    /// Expense classifications.
    Classificacoes,
    /// Recorded movements.
    Movimentos,
    /// Installments of one movement.
    Parcelas {
        /// Movement ID.
        #[arg(long)]
        movimento: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Analyze { ref pdf } => run_analyze(&cli, pdf, show_progress).await,
        Command::Process { ref pdf, execute } => {
            let mode = if execute {
                ProcessingMode::Execute
            } else {
                ProcessingMode::Plan
            };
            run_process(&cli, pdf, mode, show_progress).await
        }
        Command::List { resource } => run_list(&cli, resource).await,
    }
}

async fn run_analyze(cli: &Cli, pdf: &Path, show_progress: bool) -> Result<()> {
    let spinner = show_progress.then(|| CliProgressCallback::new_spinner("Reading invoice…"));
    let config = build_config(cli, None).await?;

    let result = analyze(pdf, &config).await;
    if let Some(ref s) = spinner {
        s.finish();
    }
    let invoice = result.with_context(|| format!("Failed to analyze {}", pdf.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&invoice).context("Failed to serialise invoice")?;
        println!("{json}");
    } else {
        print!("{}", render_invoice(&invoice));
    }
    Ok(())
}

async fn run_process(cli: &Cli, pdf: &Path, mode: ProcessingMode, show_progress: bool) -> Result<()> {
    let spinner = show_progress.then(|| CliProgressCallback::new_spinner("Reading invoice…"));
    let progress = spinner
        .clone()
        .map(|cb| cb as Arc<dyn ExecutionProgressCallback>);
    let config = build_config(cli, progress).await?;

    let result = process(pdf, mode, &config).await;
    if let Some(ref s) = spinner {
        s.finish();
    }
    let output = result.with_context(|| format!("Failed to process {}", pdf.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", render_invoice(&output.invoice));
    if let Some(ref plan) = output.plan {
        println!("{}", render_plan(plan));
    }
    if mode == ProcessingMode::Execute {
        print!("{}", render_results(&output.results));
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "   {}ms extraction  /  {}ms planning  /  {}ms execution  —  {}ms total",
            dim(&stats.extraction_ms.to_string()),
            dim(&stats.planning_ms.to_string()),
            dim(&stats.execution_ms.to_string()),
            stats.total_ms,
        );
        if mode == ProcessingMode::Plan {
            eprintln!("{} Plan not executed. Re-run with --execute to apply it.", cyan("ℹ"));
        }
        if stats.calls_skipped > 0 {
            eprintln!(
                "{} {} planned calls were not recognised and were skipped",
                yellow("⚠"),
                stats.calls_skipped
            );
        }
    }
    Ok(())
}

async fn run_list(cli: &Cli, resource: ListResource) -> Result<()> {
    let config = build_config(cli, None).await?;
    let backend = HttpBookkeeping::new(config.resolved_backend_url(), config.request_timeout_secs)
        .context("Failed to create backend client")?;

    macro_rules! emit {
        ($records:expr, $what:literal, $line:expr) => {{
            let records = $records.with_context(|| format!("Failed to list {}", $what))?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&records).context("Failed to serialise records")?
                );
            } else {
                if !cli.quiet {
                    eprintln!("{} {} {}", cyan("◆"), bold(&records.len().to_string()), $what);
                }
                for r in &records {
                    println!("{}", $line(r));
                }
            }
        }};
    }

    match resource {
        ListResource::Pessoas => emit!(
            backend.list_pessoas().await,
            "pessoas",
            |p: &pdf2ledger::records::Pessoa| format!(
                "{:>5}  {}  {:<20}  {}",
                p.id.map(|id| id.to_string()).unwrap_or_default(),
                p.kind().map_or(p.tipo.as_str(), |k| k.as_str()),
                format_document(p.documento.as_deref().unwrap_or_default()),
                p.razaosocial.as_deref().unwrap_or("-")
            )
        ),
        ListResource::Classificacoes => emit!(
            backend.list_classificacoes().await,
            "classificacoes",
            |c: &pdf2ledger::records::Classificacao| format!(
                "{:>5}  {:<8}  {}",
                c.id.map(|id| id.to_string()).unwrap_or_default(),
                c.tipo,
                c.descricao
            )
        ),
        ListResource::Movimentos => emit!(
            backend.list_movimentos().await,
            "movimentos",
            |m: &pdf2ledger::records::Movimento| format!(
                "{:>5}  {:<8}  NF {:<10}  {}  {}",
                m.id.map(|id| id.to_string()).unwrap_or_default(),
                m.tipo,
                m.numero_notafiscal.as_deref().unwrap_or("-"),
                format_date(m.data_emissao.as_deref().unwrap_or_default()),
                format_brl(m.valor_total)
            )
        ),
        ListResource::Parcelas { movimento } => emit!(
            backend.list_parcelas(movimento).await,
            "parcelas",
            |p: &pdf2ledger::records::Parcela| format!(
                "{:>5}  {:<6}  {}  {}  {}",
                p.id.map(|id| id.to_string()).unwrap_or_default(),
                p.identificacao.as_deref().unwrap_or("-"),
                format_date(p.data_vencimento.as_deref().unwrap_or_default()),
                format_brl(p.valor_parcela.unwrap_or_default()),
                p.status_parcela.as_deref().unwrap_or_default()
            )
        ),
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder().strict_validation(!cli.lenient);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref url) = cli.api_url {
        builder = builder.provider_url(url);
    }
    if let Some(ref url) = cli.backend_url {
        builder = builder.backend_url(url);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(ref path) = cli.extraction_prompt {
        builder = builder.extraction_prompt(read_prompt(path).await?);
    }
    if let Some(ref path) = cli.planner_prompt {
        builder = builder.planner_prompt(read_prompt(path).await?);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_prompt(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read prompt from {:?}", path))
}

//! # University Catalog CLI (`unictl`)
//!
//! The `unictl` binary manages the catalog database and serves the API.
//!
//! ## Usage
//!
//! ```bash
//! unictl --config ./config/unictl.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `unictl init` | Create the SQLite database and run schema migrations |
//! | `unictl seed` | Load (or refresh) the demo dataset |
//! | `unictl list` | List universities with optional filters |
//! | `unictl get <id>` | Show one university with programs and requirements |
//! | `unictl meta` | Show available countries, programs, and exams |
//! | `unictl serve api` | Start the HTTP API server |
//! | `unictl chat "<question>"` | Ask the admissions assistant one question |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use uni_catalog::agent::ChatAgent;
use uni_catalog::config;
use uni_catalog::db;
use uni_catalog::filters::UniversityFilters;
use uni_catalog::migrate;
use uni_catalog::seed;
use uni_catalog::server;
use uni_catalog::service::UniversityService;

/// University Catalog CLI: manage and query the universities database.
#[derive(Parser)]
#[command(
    name = "unictl",
    about = "University catalog: filterable listings, admission requirements, and a chat assistant",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/unictl.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all tables (countries,
    /// universities, programs, exams, requirements). Idempotent.
    Init,

    /// Load the demo dataset.
    ///
    /// Upserts countries, exams, programs, universities, and requirements
    /// by their natural keys. Running it again refreshes scores and
    /// descriptions without creating duplicates.
    Seed,

    /// List universities with optional filters.
    List {
        /// Country code (case-insensitive exact match, e.g. KZ).
        #[arg(long)]
        country: Option<String>,

        /// Program name or numeric program ID.
        #[arg(long)]
        program: Option<String>,

        /// Exam name (case-insensitive exact match, e.g. SAT).
        #[arg(long)]
        exam: Option<String>,

        /// Only offerings demanding at least this score.
        #[arg(long)]
        min_score: Option<f64>,

        /// Case-insensitive substring match on the university name.
        #[arg(long)]
        query: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: i64,

        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Show one university with its programs and exam requirements.
    Get {
        /// University ID.
        id: i64,
    },

    /// Show the available countries, programs, and exams.
    Meta,

    /// Start a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },

    /// Ask the admissions assistant one question.
    ///
    /// Requires `OPENAI_API_KEY` in the environment.
    Chat {
        /// The question to ask.
        message: String,
    },
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the HTTP API server on the configured bind address.
    Api,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Seed => {
            seed::run_seed(&cfg).await?;
        }
        Commands::List {
            country,
            program,
            exam,
            min_score,
            query,
            page,
            limit,
        } => {
            if page < 1 {
                anyhow::bail!("--page must be >= 1");
            }
            if !(1..=100).contains(&limit) {
                anyhow::bail!("--limit must be between 1 and 100");
            }
            if min_score.is_some_and(|s| s < 0.0) {
                anyhow::bail!("--min-score must be >= 0");
            }

            let filters = UniversityFilters {
                country_code: country,
                program,
                exam,
                min_score,
                query,
                page,
                limit,
            };
            run_list(&cfg, &filters).await?;
        }
        Commands::Get { id } => {
            run_get(&cfg, id).await?;
        }
        Commands::Meta => {
            run_meta(&cfg).await?;
        }
        Commands::Serve { service } => match service {
            ServeService::Api => {
                server::run_server(&cfg).await?;
            }
        },
        Commands::Chat { message } => {
            run_chat(&cfg, &message).await?;
        }
    }

    Ok(())
}

async fn run_list(cfg: &config::Config, filters: &UniversityFilters) -> Result<()> {
    let pool = db::connect(cfg).await?;
    let service = UniversityService::new(pool.clone());
    let (items, total) = service.list_universities(filters).await?;

    if items.is_empty() {
        println!("No universities match.");
        pool.close().await;
        return Ok(());
    }

    for item in &items {
        println!(
            "{:>4}  {} | {}, {} ({})  [{} programs]",
            item.id, item.name, item.city, item.country.name, item.country.code,
            item.programs_count
        );
    }
    println!();
    println!(
        "page {} (limit {}), showing {} of {} total",
        filters.page,
        filters.limit,
        items.len(),
        total
    );

    pool.close().await;
    Ok(())
}

async fn run_get(cfg: &config::Config, id: i64) -> Result<()> {
    let pool = db::connect(cfg).await?;
    let service = UniversityService::new(pool.clone());
    let detail = service.get_university(id).await?;

    let Some(detail) = detail else {
        pool.close().await;
        anyhow::bail!("University with ID {} not found", id);
    };

    println!("{} (id {})", detail.name, detail.id);
    println!("  {}, {} ({})", detail.city, detail.country.name, detail.country.code);
    if let Some(ref description) = detail.description {
        println!("  {}", description);
    }
    println!();
    for program in &detail.programs {
        println!("  {} ({})", program.name, program.degree_level);
        for requirement in &program.requirements {
            println!("    {} >= {}", requirement.exam, requirement.min_score);
        }
    }

    pool.close().await;
    Ok(())
}

async fn run_meta(cfg: &config::Config) -> Result<()> {
    let pool = db::connect(cfg).await?;
    let service = UniversityService::new(pool.clone());
    let meta = service.get_meta().await?;

    println!("countries:");
    for country in &meta.countries {
        println!("  {}  {}", country.code, country.name);
    }
    println!("programs:");
    for program in &meta.programs {
        println!("  {:>4}  {} ({})", program.id, program.name, program.degree_level);
    }
    println!("exams:");
    for exam in &meta.exams {
        println!("  {:>4}  {}", exam.id, exam.name);
    }

    pool.close().await;
    Ok(())
}

async fn run_chat(cfg: &config::Config, message: &str) -> Result<()> {
    let pool = db::connect(cfg).await?;
    let agent = ChatAgent::from_env(&cfg.agent, pool.clone())?;

    let outcome = agent.chat(message, &[]).await?;

    println!("{}", outcome.response);
    if !outcome.tool_calls.is_empty() {
        println!();
        println!("tools used: {}", outcome.tool_calls.join(", "));
    }

    pool.close().await;
    Ok(())
}

//! CLI Module
//!
//! Command-line interface for Langomine using Clap v4.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::db::{Database, VoiceRepository};
use crate::services::{QuestionService, ServiceContext};

/// Langomine - speaking practice backend
#[derive(Parser, Debug)]
#[command(name = "langomine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug mode (writes rolling log files)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API (default)
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration
    Config {
        /// Show full configuration including secrets
        #[arg(short, long)]
        show_secrets: bool,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        operation: DbCommands,
    },

    /// Manage practice questions
    Questions {
        #[command(subcommand)]
        operation: QuestionCommands,
    },

    /// Log management operations
    Logs {
        #[command(subcommand)]
        operation: LogCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Initialize database
    Init,
    /// Show database statistics
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum QuestionCommands {
    /// Add a question
    Add {
        /// Question text
        text: String,
    },
    /// List all questions
    List,
    /// Remove a question by id
    Remove { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Show log file location and status
    Status,
    /// Clean up old log files
    Clean {
        /// Maximum age in days (default: 7)
        #[arg(short = 'a', long, default_value = "7")]
        days: u64,
    },
}

/// Load configuration from file or defaults.
///
/// Runs before logging is initialized, so it stays silent; [`run`] validates
/// and reports once a subscriber is installed.
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

/// Main CLI entry point
pub async fn run(cli: Cli, mut config: Config) -> Result<()> {
    if cli.debug {
        tracing::info!("Debug mode enabled");
    }

    match cli.config.as_deref() {
        Some(path) => tracing::info!("Loaded configuration from custom path: {}", path),
        None => tracing::debug!("Loaded default configuration"),
    }
    for warning in config.validate()? {
        tracing::warn!("{}", warning);
    }

    match cli.command {
        None => crate::http::serve(&config).await,
        Some(Commands::Serve { bind, port }) => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            crate::http::serve(&config).await
        }
        Some(Commands::Init { force }) => cmd_init(force),
        Some(Commands::Config { show_secrets }) => cmd_config(&config, show_secrets),
        Some(Commands::Db { operation }) => cmd_db(&config, operation).await,
        Some(Commands::Questions { operation }) => cmd_questions(&config, operation).await,
        Some(Commands::Logs { operation }) => cmd_logs(operation),
    }
}

/// Initialize configuration file
fn cmd_init(force: bool) -> Result<()> {
    println!("Langomine Configuration Initialization\n");

    let config_path =
        Config::system_config_path().context("Could not determine config directory")?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            config_path.display()
        );
    }

    Config::default().save(&config_path)?;

    println!("✅ Configuration initialized at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set OPENAI_API_KEY (or [scoring].api_key in the config)");
    println!("   2. Point OPEN_AI_WHISPERER_HOST at your Whisper ASR webservice");
    println!("   3. Run 'langomine serve'");

    Ok(())
}

fn secret_status(secret: Option<&str>) -> &'static str {
    if secret.is_some() { "[SET]" } else { "[NOT SET]" }
}

/// Show configuration
fn cmd_config(config: &Config, show_secrets: bool) -> Result<()> {
    println!("Langomine Configuration\n");

    if show_secrets {
        let rendered =
            toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;
        println!("{}", rendered);
        return Ok(());
    }

    println!(
        "Server: {}:{} (country header: {})",
        config.server.bind, config.server.port, config.server.country_header
    );
    println!("Database: {}", config.database.path.display());
    println!("Media: {}", config.storage.media_dir.display());
    println!("Log level: {}", config.logging.level);
    println!("\nTranscription: {}", config.transcription.host);
    println!("\nScoring: {}", config.scoring.base_url);
    println!(
        "  - premium: {} ({} countries)",
        config.scoring.premium_model,
        config.scoring.premium_countries.len()
    );
    println!("  - standard: {}", config.scoring.standard_model);
    println!(
        "    API Key: {}",
        secret_status(config.scoring.api_key.as_deref())
    );

    println!("\n💡 Use --show-secrets to display API keys");
    Ok(())
}

async fn open_database(config: &Config) -> Result<Database> {
    let db = Database::connect(&config.database.path)
        .await
        .context("Failed to open database")?;
    db.run_migrations()
        .await
        .context("Failed to run database migrations")?;
    Ok(db)
}

/// Database operations
async fn cmd_db(config: &Config, operation: DbCommands) -> Result<()> {
    match operation {
        DbCommands::Init => {
            println!("🗄️  Initializing database...");
            let db = open_database(config).await?;
            db.close().await;
            println!(
                "✅ Database initialized at: {}",
                config.database.path.display()
            );
            Ok(())
        }
        DbCommands::Stats => {
            println!("📊 Database Statistics\n");
            let db = open_database(config).await?;
            let voices = VoiceRepository::new(db.pool().clone());

            let active = voices.count_active().await?;
            let total = voices.count_all().await?;
            let seconds = voices.sum_active_durations().await?;

            println!("Voices: {} active, {} deleted", active, total - active);
            println!("Active audio: {}s", seconds);

            let questions = QuestionService::new(ServiceContext::new(db.pool().clone()))
                .list()
                .await?;
            println!("Questions: {}", questions.len());

            db.close().await;
            Ok(())
        }
    }
}

async fn cmd_questions(config: &Config, operation: QuestionCommands) -> Result<()> {
    let db = open_database(config).await?;
    let service = QuestionService::new(ServiceContext::new(db.pool().clone()));

    match operation {
        QuestionCommands::Add { text } => {
            let question = service.add(&text).await?;
            println!("✅ Added question {}", question.id);
        }
        QuestionCommands::List => {
            let questions = service.list().await?;
            if questions.is_empty() {
                println!("No questions yet. Add one with 'langomine questions add <text>'");
            }
            for question in questions {
                println!("{:>4}  {}", question.id, question.text);
            }
        }
        QuestionCommands::Remove { id } => {
            service.remove(id).await?;
            println!("✅ Removed question {}", id);
        }
    }

    db.close().await;
    Ok(())
}

/// Log management
fn cmd_logs(operation: LogCommands) -> Result<()> {
    use crate::logging;

    let log_dir = logging::active_log_dir();

    match operation {
        LogCommands::Status => {
            println!("📊 Langomine Logging Status\n");
            println!("Log directory: {}", log_dir.display());

            let files = logging::list_log_files(&log_dir)?;
            if files.is_empty() {
                println!("Status: ❌ No logs found");
            } else {
                let total_size: u64 = files
                    .iter()
                    .filter_map(|f| std::fs::metadata(f).ok())
                    .map(|m| m.len())
                    .sum();
                println!("Status: ✅ Active");
                println!("Log files: {}", files.len());
                println!(
                    "Total size: {:.2} MB",
                    total_size as f64 / (1024.0 * 1024.0)
                );
                println!("Latest log: {}", files[0].display());
            }

            println!("\n💡 To enable debug logging, run with -d flag:");
            println!("   langomine -d serve");
            Ok(())
        }
        LogCommands::Clean { days } => {
            let removed = logging::cleanup_logs_in(&log_dir, days)?;
            println!(
                "🧹 Removed {} log file(s) older than {} day(s)",
                removed, days
            );
            Ok(())
        }
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "rudder")]
#[command(about = "Plugin repository hub")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep repositories reconciled with the record store until Ctrl-C
    Serve,
    /// Manage plugin repositories
    #[command(subcommand)]
    Repo(RepoCommands),
    /// Search a repository for plugins
    Search {
        /// Repository name
        repo: String,
        /// Exact plugin name (all plugins when omitted)
        word: Option<String>,
    },
    /// Install a plugin
    Install {
        /// Repository name
        repo: String,
        /// Plugin name
        name: String,
        /// Plugin version (latest when omitted)
        version: Option<String>,
        /// Instance id (defaults to the plugin name)
        #[arg(long)]
        id: Option<String>,
        /// Override a chart value (key=value, value parsed as JSON)
        #[arg(long = "set")]
        set: Vec<String>,
    },
    /// Uninstall a plugin instance
    Uninstall {
        /// Instance id
        id: String,
        /// Repository the instance was installed from
        #[arg(long)]
        repo: Option<String>,
        /// Plugin name
        #[arg(long)]
        name: Option<String>,
        /// Plugin version
        #[arg(long)]
        version: Option<String>,
    },
    /// List installed plugin instances
    List,
}

#[derive(Subcommand)]
enum RepoCommands {
    /// Add a repository
    Add { name: String, url: String },
    /// Remove a repository
    Remove { name: String },
    /// List repositories
    List,
    /// Re-fetch a repository's catalog
    Update { name: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let container = match cli::container(cli.config.as_deref()) {
        Ok(container) => container,
        Err(e) => {
            eprintln!("\nError: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Serve => cli::serve::run(container).await,
        Commands::Repo(cmd) => match cmd {
            RepoCommands::Add { name, url } => cli::repo::add(container, name, url).await,
            RepoCommands::Remove { name } => cli::repo::remove(container, name).await,
            RepoCommands::List => cli::repo::list(container).await,
            RepoCommands::Update { name } => cli::repo::update(container, name).await,
        },
        Commands::Search { repo, word } => cli::search::run(container, repo, word).await,
        Commands::Install {
            repo,
            name,
            version,
            id,
            set,
        } => cli::install::run(container, repo, name, version, id, set).await,
        Commands::Uninstall {
            id,
            repo,
            name,
            version,
        } => cli::uninstall::run(container, id, repo, name, version).await,
        Commands::List => cli::list::run(container).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\nError: {}", e);
            ExitCode::FAILURE
        }
    }
}

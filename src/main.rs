// ABOUTME: CLI entry point for fm-term-meta-migrator
// ABOUTME: Parses commands and routes to appropriate handlers

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use fm_term_meta_migrator::commands::{self, list::ListFormat, migrate::MigrateOptions};
use fm_term_meta_migrator::wordpress;

#[derive(Parser)]
#[command(name = "fm-term-meta-migrator")]
#[command(about = "Migrate Fieldmanager term meta to WordPress core term meta", long_about = None)]
#[command(version)]
struct Cli {
    /// MySQL connection string for the WordPress database
    #[arg(
        long = "database-url",
        env = "WORDPRESS_DATABASE_URL",
        global = true,
        hide_env_values = true
    )]
    database_url: Option<String>,
    /// WordPress table prefix
    #[arg(
        long = "table-prefix",
        env = "WORDPRESS_TABLE_PREFIX",
        global = true,
        default_value = "wp_"
    )]
    table_prefix: String,
    /// Set the log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all terms with Fieldmanager term meta
    List {
        /// Output format
        #[arg(long, value_enum, default_value_t = ListFormat::Table)]
        format: ListFormat,
    },
    /// Migrate all Fieldmanager term meta to core term meta
    Migrate {
        /// Delete Fieldmanager term meta after it is migrated, and each
        /// term meta post once its meta is migrated
        #[arg(long)]
        destructive: bool,
        /// Make no updates; print what would be done
        #[arg(long = "dry-run")]
        dry_run: bool,
        /// Output additional details
        #[arg(long)]
        verbose: bool,
        /// Skip the confirmation prompt for --destructive
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args early to get the log level
    let cli = Cli::parse();

    // RUST_LOG takes precedence over --log; default is "info"
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log.clone()));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let database_url = cli.database_url.ok_or_else(|| {
        anyhow!(
            "Database URL not provided. Use `--database-url` or set WORDPRESS_DATABASE_URL."
        )
    })?;

    let db = wordpress::connect(&database_url, &cli.table_prefix).await?;

    let outcome = match cli.command {
        Commands::List { format } => commands::list(&db, format).await,
        Commands::Migrate {
            destructive,
            dry_run,
            verbose,
            yes,
        } => {
            let opts = MigrateOptions {
                destructive,
                dry_run,
                verbose,
                yes,
            };
            commands::migrate(&db, &opts).await
        }
    };

    if let Err(e) = db.disconnect().await {
        tracing::warn!("Failed to close database pool: {:#}", e);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}

//! holocron-batch - maintenance passes over the Holocron catalog
//!
//! Imports source JSON, resolves starship families, normalizes legacy parent
//! references and applies field patches. Writes go out one record at a time;
//! the final tally is printed and any failure yields a non-zero exit.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use holocron_batch::{import, patch, runner, BatchOptions, BatchSummary};
use holocron_common::config::{redact_url, resolve_database_url, TomlConfig};
use holocron_common::db::init_database;
use holocron_common::family::{load_rules, FamilyRule};
use holocron_common::store::SqliteStore;
use holocron_common::Category;
use sqlx::SqlitePool;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "holocron-batch", version, about = "Batch maintenance for the Holocron catalog")]
struct Cli {
    /// Database connection string (overrides HOLOCRON_DATABASE_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    database_url: Option<String>,

    /// Pause between consecutive writes, in milliseconds
    #[arg(long, global = true, default_value_t = 0, env = "HOLOCRON_BATCH_DELAY_MS")]
    delay_ms: u64,

    /// Log and count the writes a pass would make without writing
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upsert species from a JSON source file
    #[command(name = "import-species")]
    ImportSpecies(ImportSpeciesArgs),
    /// Upsert starships from a JSON source file
    #[command(name = "import-starships")]
    ImportStarships(ImportStarshipsArgs),
    /// Assign base/variant lineage for one family or a rule file
    Resolve(ResolveArgs),
    /// Rewrite legacy parent references to base record names
    #[command(name = "normalize-parents")]
    NormalizeParents,
    /// Apply field patches from a JSON file
    Patch(PatchArgs),
}

#[derive(Debug, Args)]
struct ImportSpeciesArgs {
    file: PathBuf,
}

#[derive(Debug, Args)]
struct ImportStarshipsArgs {
    file: PathBuf,
    /// Category for records that carry none
    #[arg(long, default_value = "transport")]
    default_category: Category,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    /// TOML rule file with [[family]] entries
    #[arg(long, value_name = "PATH", conflicts_with_all = ["family", "category", "case_sensitive", "base", "members"])]
    rules: Option<PathBuf>,

    /// Family name fragment
    #[arg(long, required_unless_present = "rules", requires = "category")]
    family: Option<String>,

    #[arg(long)]
    category: Option<Category>,

    /// Match names case-sensitively
    #[arg(long)]
    case_sensitive: bool,

    /// Override mode: slug of the canonical base
    #[arg(long, conflicts_with = "case_sensitive", requires = "members")]
    base: Option<String>,

    /// Override mode: member slug (repeatable)
    #[arg(long = "member", value_name = "SLUG", requires = "base")]
    members: Vec<String>,
}

impl ResolveArgs {
    fn into_rules(self) -> Result<Vec<FamilyRule>> {
        if let Some(path) = &self.rules {
            return load_rules(path).with_context(|| format!("Failed to load rules from {}", path.display()));
        }

        let (Some(family), Some(category)) = (self.family, self.category) else {
            bail!("--family and --category are required without --rules");
        };

        let rule = match self.base {
            Some(base) => FamilyRule::override_members(family, category, base, self.members),
            None if self.case_sensitive => FamilyRule::substring(family, category).case_sensitive(),
            None => FamilyRule::substring(family, category),
        };
        Ok(vec![rule])
    }
}

#[derive(Debug, Args)]
struct PatchArgs {
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "holocron_batch=info,holocron_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let options = BatchOptions::with_delay_ms(cli.delay_ms).dry_run(cli.dry_run);

    let summary = run(cli.command, cli.database_url.as_deref(), &options).await?;

    if options.dry_run {
        println!("(dry run) {}", summary);
    } else {
        println!("{}", summary);
    }
    if summary.has_failures() {
        bail!("{} record(s) failed", summary.failed);
    }
    Ok(())
}

async fn run(command: Commands, database_url: Option<&str>, options: &BatchOptions) -> Result<BatchSummary> {
    // Parse input before touching the store so that bad input writes nothing
    match command {
        Commands::ImportSpecies(args) => {
            let records = import::parse_species(&read_input(&args.file)?)
                .with_context(|| format!("Invalid species file {}", args.file.display()))?;
            info!("Parsed {} species from {}", records.len(), args.file.display());

            let pool = open_store(database_url).await?;
            Ok(import::import_species(&pool, &records, options).await)
        }
        Commands::ImportStarships(args) => {
            let records = import::parse_starships(&read_input(&args.file)?, args.default_category)
                .with_context(|| format!("Invalid starship file {}", args.file.display()))?;
            info!("Parsed {} starships from {}", records.len(), args.file.display());

            let pool = open_store(database_url).await?;
            Ok(import::import_starships(&pool, &records, options).await)
        }
        Commands::Resolve(args) => {
            let rules = args.into_rules()?;
            let store = SqliteStore::new(open_store(database_url).await?);
            runner::run_family_rules(&store, &rules, options)
                .await
                .context("Family resolution aborted")
        }
        Commands::NormalizeParents => {
            let store = SqliteStore::new(open_store(database_url).await?);
            runner::normalize_parents(&store, options)
                .await
                .context("Parent normalization aborted")
        }
        Commands::Patch(args) => {
            let records = patch::parse_patch_file(&read_input(&args.file)?)
                .with_context(|| format!("Invalid patch file {}", args.file.display()))?;
            info!("Parsed {} patch record(s) from {}", records.len(), args.file.display());

            let store = SqliteStore::new(open_store(database_url).await?);
            patch::run_patch(&store, &records, options)
                .await
                .context("Patch job aborted")
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

async fn open_store(cli_url: Option<&str>) -> Result<SqlitePool> {
    let url = resolve_database_url(cli_url, &TomlConfig::load_default());
    info!("Database: {}", redact_url(&url));
    init_database(&url).await.context("Failed to initialize database")
}

//! cptrack CLI
//!
//! Local entry point: manage tracked accounts, run syncs and read the
//! cached data.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use cptrack::{
    error::{AppError, Result},
    models::{Account, Config, PlatformId},
    pipeline::{self, Syncer},
    services::PlatformClient,
    storage::{ItemStore, items},
    utils::log as console,
};

/// cptrack - Competitive Programming Account Tracker
#[derive(Parser, Debug)]
#[command(
    name = "cptrack",
    version,
    about = "Tracks competitive-programming accounts across platforms"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override store.data_dir from the configuration
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start tracking an account
    Track { platform: PlatformId, handle: String },

    /// Stop tracking an account and drop its cached data
    Untrack { platform: PlatformId, handle: String },

    /// List tracked accounts
    List,

    /// Sync tracked accounts (or a single one)
    Sync {
        platform: Option<PlatformId>,
        handle: Option<String>,
    },

    /// Show cached data for an account
    Show {
        platform: PlatformId,
        handle: String,

        /// Number of recent rating changes to print
        #[arg(long, default_value_t = 5)]
        last: usize,
    },

    /// Search accounts on a platform
    Search { platform: PlatformId, query: String },

    /// Show Project Euler news
    News {
        /// Fetch fresh news before printing
        #[arg(long)]
        refresh: bool,

        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Print a Project Euler problem statement
    Problem { id: u32 },

    /// Validate the configuration file
    Validate,

    /// Show store location and contents
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(path: &Path, data_dir: Option<&Path>) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path)?
    } else {
        log::debug!("{} not found, using defaults", path.display());
        Config::default()
    };
    if let Some(dir) = data_dir {
        config.store.data_dir = dir.to_path_buf();
    }
    config.validate()?;
    Ok(config)
}

async fn open_syncer(config: &Config) -> Result<Syncer> {
    let store = ItemStore::open_local(&config.store.data_dir).await?;
    Syncer::from_config(config, store)
}

/// Main entry point for the CLI application.
enum SyncTargets {
    One(Account),
    Platform(PlatformId),
    All,
}

/// Resolve the `sync` arguments. A handle is meaningless without its platform.
fn sync_targets(platform: Option<PlatformId>, handle: Option<String>) -> Result<SyncTargets> {
    match (platform, handle) {
        (Some(platform), Some(handle)) => Ok(SyncTargets::One(Account::new(platform, &handle)?)),
        (Some(platform), None) => Ok(SyncTargets::Platform(platform)),
        (None, None) => Ok(SyncTargets::All),
        (None, Some(handle)) => Err(AppError::invalid(format!(
            "handle '{handle}' given without a platform"
        ))),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        config: config_path,
        data_dir,
        verbose,
        quiet,
        command,
    } = Cli::parse();
    init_logging(verbose);
    console::set_quiet(quiet);

    let load = || load_config(&config_path, data_dir.as_deref());

    match command {
        Command::Track { platform, handle } => {
            let config = load()?;
            let syncer = open_syncer(&config).await?;
            let account = Account::new(platform, &handle)?;
            if syncer.track(&account).await? {
                console::success(&format!("Tracking {account}"));
            } else {
                console::info(&format!("{account} is already tracked"));
            }
            syncer.shutdown().await?;
        }

        Command::Untrack { platform, handle } => {
            let config = load()?;
            let syncer = open_syncer(&config).await?;
            let account = Account::new(platform, &handle)?;
            if syncer.untrack(&account).await? {
                console::success(&format!("No longer tracking {account}"));
            } else {
                console::info(&format!("{account} was not tracked"));
            }
            syncer.shutdown().await?;
        }

        Command::List => {
            let config = load()?;
            let syncer = open_syncer(&config).await?;
            let accounts = syncer.tracked_all()?;
            console::header(&format!("Tracked accounts ({})", accounts.len()));
            for account in &accounts {
                let state = syncer.store().read(&items::sync_state(account)?)?;
                let last = state
                    .and_then(|s| s.last_success)
                    .map_or_else(|| "never synced".to_string(), |t| t.to_rfc3339());
                console::sub_item(&format!("{account} ({last})"));
            }
        }

        Command::Sync { platform, handle } => {
            let config = load()?;
            let syncer = open_syncer(&config).await?;
            let accounts = match sync_targets(platform, handle)? {
                SyncTargets::One(account) => vec![account],
                SyncTargets::Platform(platform) => syncer.tracked(platform)?,
                SyncTargets::All => syncer.tracked_all()?,
            };
            if accounts.is_empty() {
                console::info("Nothing to sync; add accounts with 'track'");
                return Ok(());
            }

            console::header(&format!("Syncing {} accounts", accounts.len()));
            let report = syncer.sync_all(accounts).await;
            for outcome in &report.outcomes {
                match &outcome.result {
                    Ok(summary) => {
                        let rating = summary
                            .rating
                            .map_or_else(|| "-".to_string(), |r| r.to_string());
                        let delta = summary
                            .diff
                            .rating_delta()
                            .map_or_else(String::new, |d| format!(" ({d:+})"));
                        console::success(&format!(
                            "{} [{:?}] rating {}{}, {} changes",
                            outcome.account,
                            summary.status,
                            rating,
                            delta,
                            summary.diff.change_count()
                        ));
                        for change in &summary.diff.added {
                            console::sub_item(&format!(
                                "{} -> {} ({})",
                                change.contest_name, change.new_rating, change.time
                            ));
                        }
                    }
                    Err(e) => console::failure(&format!("{}: {} [{}]", outcome.account, e, e.kind())),
                }
            }
            console::summary(
                "Sync",
                &[
                    ("Succeeded", report.succeeded().to_string()),
                    ("Failed", report.failed().to_string()),
                    ("New rating changes", report.new_changes().to_string()),
                ],
            );
            syncer.shutdown().await?;
        }

        Command::Show {
            platform,
            handle,
            last,
        } => {
            let config = load()?;
            let store = ItemStore::open_local(&config.store.data_dir).await?;
            let account = Account::new(platform, &handle)?;

            let Some(info) = store.read(&items::user_info(&account)?)? else {
                console::info(&format!("No cached data for {account}; run 'sync' first"));
                return Ok(());
            };
            console::header(&format!("{} ({})", info.display_name, account));
            console::sub_item(&format!("Status: {:?}", info.status));
            if let Some(rating) = info.rating {
                console::sub_item(&format!("Rating: {rating}"));
            }
            if let Some(max) = info.max_rating {
                console::sub_item(&format!("Max rating: {max}"));
            }
            if let Some(solved) = info.solved {
                console::sub_item(&format!("Solved: {solved}"));
            }

            if let Some(history) = store.read(&items::rating_history(&account)?)? {
                console::sub_item(&format!("Rated contests: {}", history.len()));
                let skip = history.changes.len().saturating_sub(last);
                for change in history.changes.iter().skip(skip) {
                    let delta = change
                        .delta()
                        .map_or_else(String::new, |d| format!(" ({d:+})"));
                    console::sub_item(&format!(
                        "  {} {} -> {}{}",
                        change.time.format("%Y-%m-%d"),
                        change.contest_name,
                        change.new_rating,
                        delta
                    ));
                }
            }

            if let Some(state) = store.read(&items::sync_state(&account)?)? {
                if let Some(failure) = state.last_failure {
                    console::sub_item(&format!(
                        "Last failure: {} ({}) at {}",
                        failure.message, failure.kind, failure.at
                    ));
                }
            }
        }

        Command::Search { platform, query } => {
            let config = load()?;
            let client = PlatformClient::from_config(platform, &config)?;
            let hits = client.search(&query).await?;
            console::header(&format!("{} results on {}", hits.len(), platform));
            for hit in hits {
                let rating = hit.rating.map_or_else(String::new, |r| format!(" rating {r}"));
                let solved = hit.solved.map_or_else(String::new, |s| format!(" solved {s}"));
                console::sub_item(&format!(
                    "{} ({}){}{}",
                    hit.handle, hit.display_name, rating, solved
                ));
            }
        }

        Command::News { refresh, limit } => {
            let config = load()?;
            let syncer = open_syncer(&config).await?;
            if refresh {
                let digest = syncer.refresh_euler().await?;
                console::success(&format!(
                    "{} news entries ({} new), {} recent problems",
                    digest.total_entries,
                    digest.new_entries.len(),
                    digest.recent_problems
                ));
            }

            let news = syncer.store().read(&items::euler_news()?)?.unwrap_or_default();
            if news.is_empty() {
                console::info("No cached news; run 'news --refresh'");
            }
            for entry in news.iter().take(limit) {
                let date = entry
                    .published
                    .map_or_else(String::new, |d| format!(" [{}]", d.format("%Y-%m-%d")));
                console::header(&format!("{}{}", entry.title, date));
                console::sub_item(&entry.body);
            }
            syncer.shutdown().await?;
        }

        Command::Problem { id } => {
            let config = load()?;
            let client = PlatformClient::from_config(PlatformId::ProjectEuler, &config)?;
            let euler = client
                .as_euler()
                .ok_or_else(|| AppError::config("projecteuler client unavailable"))?;
            let problem = euler.fetch_problem(id).await?;
            console::header(&format!("Problem {}: {}", problem.id, problem.title));
            println!("{}", problem.text);
        }

        Command::Info => {
            let config = load()?;
            let store = ItemStore::open_local(&config.store.data_dir).await?;
            let keys = store.keys()?;
            console::summary(
                "Store",
                &[
                    ("Location", store.describe()),
                    ("Items", keys.len().to_string()),
                ],
            );
            for key in keys {
                console::sub_item(key.as_str());
            }
        }

        Command::Validate => {
            pipeline::run_validate(&config_path)?;
        }
    }

    Ok(())
}

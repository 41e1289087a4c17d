use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use podium_config::{secrets::resolve_credentials, CoreConfig};
use podium_local::{hash_companion_path, watch::SourceWatcher, LocalSource};
use podium_net::{ConnectorConfig, NetworkConnector, SourceKind};
use podium_query as query;
use podium_rank::RankCriterion;
use podium_reconcile::{ReconcileEvent, ReconcileMode, Reconciler};

#[derive(Parser)]
#[command(name = "podium")]
#[command(about = "Contest results reconciliation & ranking", long_about = None)]
struct Cli {
    /// Config file (JSON). Defaults apply when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory from config.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the roster once and print the score ranking
    Load,

    /// Print the ranking under a criterion
    Rank {
        /// score | solved | time | accuracy
        #[arg(long, default_value = "score")]
        criterion: String,
    },

    /// Ad-hoc queries over the loaded roster
    Query {
        #[command(subcommand)]
        cmd: QueryCmd,
    },

    /// Print the canonical-compact SHA-256 of a JSON file
    Hash { file: PathBuf },

    /// Verify a team file against its .sha256 companion
    Verify { file: PathBuf },

    /// Watch the data directory (and remote, if enabled) and keep refreshing
    Watch,

    /// Compute the layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> overrides)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Subcommand)]
enum QueryCmd {
    /// Best N teams by score
    Top { n: usize },
    /// Worst N teams, score ascending
    Bottom { n: usize },
    /// Teams with min <= score <= max
    Range { min: i64, max: i64 },
    /// Case-insensitive glob match against team names (*, ?)
    Name { pattern: String },
    /// Teams with at least N solved problems
    Solved { min: usize },
    /// Teams with accuracy of at least P percent
    Accuracy { min: f64 },
    /// 1-based score-rank of one team
    RankOf { team_id: String },
    /// Average and median score
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev-time .env.local bootstrap (credentials); silently absent in prod.
    let _ = dotenvy::from_filename(".env.local");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_effective_config(&cli)?;

    match cli.cmd {
        Commands::Load => {
            let snap = load_once(&cfg).await?;
            print_ranking(&snap, RankCriterion::Score);
        }

        Commands::Rank { criterion } => {
            let criterion = RankCriterion::parse(&criterion)?;
            let snap = load_once(&cfg).await?;
            print_ranking(&snap, criterion);
        }

        Commands::Query { cmd } => {
            let snap = load_once(&cfg).await?;
            run_query(&snap, cmd)?;
        }

        Commands::Hash { file } => {
            let raw = std::fs::read(&file).with_context(|| format!("read {:?}", file))?;
            println!("{}", podium_integrity::canonical_hash(&raw)?);
        }

        Commands::Verify { file } => {
            let raw = std::fs::read(&file).with_context(|| format!("read {:?}", file))?;
            let companion = hash_companion_path(&file);
            if !companion.exists() {
                // Integrity checking is opt-in per file.
                println!("SKIPPED {} (no hash companion)", file.display());
                return Ok(());
            }
            let stored = std::fs::read_to_string(&companion)
                .with_context(|| format!("read hash companion {:?}", companion))?;
            match podium_integrity::verify_bytes(&raw, &stored) {
                Ok(()) => println!("OK {}", file.display()),
                Err(e) => {
                    println!("FAILED {}: {e}", file.display());
                    std::process::exit(1);
                }
            }
        }

        Commands::Watch => {
            run_watch(&cfg).await?;
        }

        Commands::ConfigHash { paths } => {
            let (cfg, hash) = podium_config::load_layered(&paths)?;
            println!("config_hash: {hash}");
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn load_effective_config(cli: &Cli) -> Result<CoreConfig> {
    let mut cfg = match &cli.config {
        Some(path) => podium_config::load_config(path)?,
        None => CoreConfig::default(),
    };
    if let Some(dir) = &cli.dir {
        cfg.data.directory = dir.clone();
    }
    Ok(cfg)
}

fn build_connector(cfg: &CoreConfig) -> Result<NetworkConnector> {
    let creds = resolve_credentials(&cfg.network);
    let connector_cfg = ConnectorConfig {
        server_url: cfg.network.server_url.clone(),
        api_endpoint: cfg.network.api_endpoint.clone(),
        source_kind: SourceKind::parse(&cfg.network.source_kind)?,
        api_key: creds.api_key,
        username: creds.username,
        password: creds.password,
        headers: cfg.network.headers.clone(),
        heartbeat_interval: Duration::from_millis(cfg.network.heartbeat_interval_ms),
        real_time: cfg.network.real_time,
        auto_reconnect: cfg.network.auto_reconnect,
        max_retries: cfg.network.max_retries,
        retry_interval: Duration::from_secs(cfg.network.retry_interval_secs),
    };
    Ok(NetworkConnector::new(connector_cfg))
}

fn build_reconciler(cfg: &CoreConfig) -> Result<Reconciler> {
    let mode = ReconcileMode::parse(&cfg.reconcile.mode)?;
    let local = LocalSource::new(cfg.data.directory.clone());
    let connector = if cfg.network.enabled {
        Some(build_connector(cfg)?)
    } else {
        None
    };
    let audit = match &cfg.audit.log_path {
        Some(path) => podium_audit::AuditLog::with_file(path, cfg.audit.hash_chain)?,
        None => podium_audit::AuditLog::in_memory(),
    };
    Ok(Reconciler::new(mode, local, connector, audit))
}

/// One-shot roster load for the non-interactive commands: connect first when
/// a remote is configured, then run a single refresh cycle.
async fn load_once(cfg: &CoreConfig) -> Result<std::sync::Arc<podium_model::RosterSnapshot>> {
    let rec = build_reconciler(cfg)?;
    if let Some(conn) = rec.connector() {
        if let Err(e) = conn.connect().await {
            tracing::warn!(error = %e, "connect failed");
        }
    }
    let snap = rec.refresh().await?;
    if let Some(conn) = rec.connector() {
        conn.disconnect();
    }
    Ok(snap)
}

// ---------------------------------------------------------------------------
// Watch loop
// ---------------------------------------------------------------------------

async fn run_watch(cfg: &CoreConfig) -> Result<()> {
    let rec = build_reconciler(cfg)?;

    if let Some(conn) = rec.connector() {
        if let Err(e) = conn.connect().await {
            tracing::warn!(error = %e, "initial connect failed; continuing with local data");
        }
    }
    let _connector_pump = rec.spawn_connector_pump();

    // First load before we start listening for changes.
    if let Err(e) = rec.refresh().await {
        tracing::warn!(error = %e, "initial refresh failed");
    }
    print_ranking(&rec.snapshot(), RankCriterion::Score);

    let (_watcher, reloads) = SourceWatcher::spawn(
        cfg.data.directory.clone(),
        Duration::from_millis(cfg.data.debounce_ms),
    )?;
    let _reload_pump = rec.spawn_reload_pump(reloads);

    let mut events = rec.subscribe();
    println!("watching {} (ctrl-c to stop)", cfg.data.directory.display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("stopping");
                if let Some(conn) = rec.connector() {
                    conn.disconnect();
                }
                break;
            }
            ev = events.recv() => match ev {
                Ok(ReconcileEvent::Refreshed { snapshot }) => {
                    println!(
                        "-- refreshed at {} ({} teams) --",
                        snapshot.created_at().format("%H:%M:%S"),
                        snapshot.len()
                    );
                    print_ranking(&snapshot, RankCriterion::Score);
                }
                Ok(ReconcileEvent::Error { message }) => {
                    eprintln!("error: {message}");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_ranking(snapshot: &podium_model::RosterSnapshot, criterion: RankCriterion) {
    println!(
        "{:>4}  {:<12} {:<20} {:>6} {:>7} {:>9}  {}",
        "rank", "id", "name", "score", "solved", "accuracy", "last submit"
    );
    for r in query::sorted_by(snapshot, criterion) {
        let last = r
            .team
            .last_submit_time()
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}  {:<12} {:<20} {:>6} {:>7} {:>8.1}%  {}",
            r.rank,
            r.team.id,
            r.team.name,
            r.team.total_score(),
            r.team.solved_count(),
            r.team.accuracy(),
            last
        );
    }
}

fn print_teams(teams: &[podium_model::TeamRecord]) {
    for t in teams {
        println!(
            "{:<12} {:<20} score={:<5} solved={:<3} accuracy={:.1}%",
            t.id,
            t.name,
            t.total_score(),
            t.solved_count(),
            t.accuracy()
        );
    }
}

fn run_query(snapshot: &podium_model::RosterSnapshot, cmd: QueryCmd) -> Result<()> {
    match cmd {
        QueryCmd::Top { n } => print_teams(&query::top_n(snapshot, n)),
        QueryCmd::Bottom { n } => print_teams(&query::bottom_n(snapshot, n)),
        QueryCmd::Range { min, max } => print_teams(&query::score_range(snapshot, min, max)),
        QueryCmd::Name { pattern } => print_teams(&query::search_by_name(snapshot, &pattern)?),
        QueryCmd::Solved { min } => print_teams(&query::search_by_solved(snapshot, min)),
        QueryCmd::Accuracy { min } => print_teams(&query::search_by_accuracy(snapshot, min)),
        QueryCmd::RankOf { team_id } => match query::rank_of(snapshot, &team_id) {
            Some(rank) => println!("{team_id}: rank {rank}"),
            None => {
                println!("{team_id}: not found");
                std::process::exit(1);
            }
        },
        QueryCmd::Stats => {
            println!("teams:   {}", snapshot.len());
            println!("average: {:.1}", query::average_score(snapshot));
            println!("median:  {:.1}", query::median_score(snapshot));
        }
    }
    Ok(())
}

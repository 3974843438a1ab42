//! The orchestrator poll loop.
//!
//! One cooperative task drives everything on independent intervals:
//!
//! 1. Colony directory refresh (name cache + snapshot root metadata)
//! 2. Snapshot scan: load -> extract -> diff -> record -> persist state,
//!    file by file, colony by colony
//! 3. One poll of every watched log file, processing the lines currently
//!    available
//!
//! When an iteration produced no log line, the loop sleeps briefly before
//! re-polling. Store calls are awaited inline; event volume is low relative
//! to the poll interval. Each unit of work (one line, one snapshot file) is
//! isolated — its failure is logged and skipped, never propagated into
//! sibling units. Anything that does escape this loop is unclassified and
//! terminates the process via `main`.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use chronicle_db::{EventSink, InsertOutcome, PostgresConfig, PostgresPool};
use chronicle_types::{ColonyEvent, ColonyInfo, LineEvent};
use chronicle_watch::{
    colony_snapshot_files, diff_colony, extract_buildings, extract_line_event, load_snapshot,
    load_state, pretty_name, refresh_directory, save_state, LogTailer, NameCache, StartPosition,
    FALLBACK_BUILDING_NAME,
};

use crate::config::DaemonConfig;
use crate::error::DaemonError;

/// Colony id -> directory entry, rebuilt on every refresh.
type Directory = BTreeMap<i64, ColonyInfo>;

/// Run the watcher loop until the process is terminated externally.
///
/// # Errors
///
/// Returns [`DaemonError`] when the initial store connection or schema
/// setup fails. Once the loop is running, store failures are handled by
/// reconnecting, not by returning.
pub async fn run(config: &DaemonConfig) -> Result<(), DaemonError> {
    let store_config = PostgresConfig::new(&config.store.postgres_url)
        .with_max_connections(config.store.max_connections)
        .with_connect_timeout(Duration::from_secs(config.store.connect_timeout_secs));

    let mut pool = PostgresPool::connect(&store_config).await?;
    EventSink::new(pool.pool()).ensure_schema().await?;
    info!("Store ready");

    let start = if config.watch.start_at_end {
        StartPosition::End
    } else {
        StartPosition::Beginning
    };
    let mut tailers: Vec<LogTailer> = config
        .watch
        .log_paths
        .iter()
        .map(|path| LogTailer::new(path, start))
        .collect();
    if tailers.is_empty() {
        warn!("No log files configured; advancements will not be imported from logs");
    }

    let refresh_interval = Duration::from_secs(config.watch.directory_refresh_secs);
    let scan_interval = Duration::from_secs(config.watch.snapshot_scan_secs);
    let poll_interval = Duration::from_millis(config.watch.poll_interval_ms);
    let backoff = Duration::from_millis(config.store.reconnect_backoff_ms);

    let mut directory = Directory::new();
    let mut next_refresh = Instant::now();
    let mut next_scan = Instant::now();

    info!(
        log_files = tailers.len(),
        colony_dir = %config.sources.colony_dir.display(),
        refresh_secs = config.watch.directory_refresh_secs,
        scan_secs = config.watch.snapshot_scan_secs,
        "Watcher loop starting"
    );

    loop {
        let now = Instant::now();

        if now >= next_refresh {
            let cache = NameCache::load(&config.sources.name_cache_path);
            directory = refresh_directory(&config.sources.colony_dir, &cache);
            debug!(
                colonies = directory.len(),
                cached_names = cache.len(),
                "Colony directory refreshed"
            );
            next_refresh = now.checked_add(refresh_interval).unwrap_or(now);
        }

        if now >= next_scan {
            run_snapshot_scan(config, &directory, &mut pool, &store_config, backoff).await;
            next_scan = now.checked_add(scan_interval).unwrap_or(now);
        }

        let mut progressed = false;
        for tailer in &mut tailers {
            for line in tailer.poll() {
                progressed = true;
                handle_line(&line, &directory, &mut pool, &store_config, backoff).await;
            }
        }

        if !progressed {
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// One full snapshot scan: every readable colony file is extracted and
/// diffed against the stored state, derived events are recorded, and the
/// replacement state is persisted atomically.
async fn run_snapshot_scan(
    config: &DaemonConfig,
    directory: &Directory,
    pool: &mut PostgresPool,
    store_config: &PostgresConfig,
    backoff: Duration,
) {
    let state_path = &config.sources.state_path;
    let mut state = load_state(state_path);
    let mut recorded = 0_usize;

    for (colony_id, path) in colony_snapshot_files(&config.sources.colony_dir) {
        let root = match load_snapshot(&path) {
            Ok(root) => root,
            Err(error) => {
                debug!(
                    path = %path.display(),
                    error = %error,
                    "Skipping unreadable snapshot file"
                );
                continue;
            }
        };

        let buildings = extract_buildings(&root);
        let (events, next) = diff_colony(colony_id, &buildings, state.get(&colony_id));

        for mut event in events {
            attach_directory_info(&mut event, directory);
            if record_colony_event(&event, pool, store_config, backoff).await {
                recorded = recorded.saturating_add(1);
            }
        }

        state.insert(colony_id, next);
    }

    if let Err(error) = save_state(state_path, &state) {
        warn!(
            path = %state_path.display(),
            error = %error,
            "Failed to persist scan state"
        );
    }

    if recorded > 0 {
        info!(events = recorded, "Snapshot scan recorded new events");
    }
}

/// Process one log line: run the recognizers and record whatever matched.
async fn handle_line(
    line: &str,
    directory: &Directory,
    pool: &mut PostgresPool,
    store_config: &PostgresConfig,
    backoff: Duration,
) {
    let Some(event) = extract_line_event(line) else {
        return;
    };

    match event {
        LineEvent::Advancement(advancement) => {
            let result = EventSink::new(pool.pool())
                .record_advancement(&advancement)
                .await;
            match result {
                Ok(InsertOutcome::Inserted | InsertOutcome::Duplicate) => {}
                Err(error) => {
                    warn!(error = %error, "Store failure recording advancement");
                    recover_store(pool, store_config, backoff).await;
                }
            }
        }
        LineEvent::Building(action) => {
            let hint = if action.block_id.is_empty() {
                &action.building_class
            } else {
                &action.block_id
            };
            let building_name =
                pretty_name(hint).unwrap_or_else(|| FALLBACK_BUILDING_NAME.to_owned());

            let mut event = ColonyEvent {
                colony_id: action.colony_id,
                colony_name: None,
                owner: None,
                action: action.action,
                building_id: action.building_class,
                building_name,
                block_id: action.block_id,
                position: action.position,
                raw_text: line.trim().to_owned(),
            };
            attach_directory_info(&mut event, directory);
            record_colony_event(&event, pool, store_config, backoff).await;
        }
    }
}

/// Fill in colony name and owner from the directory, when known.
fn attach_directory_info(event: &mut ColonyEvent, directory: &Directory) {
    if let Some(info) = directory.get(&event.colony_id) {
        if !info.name.is_empty() {
            event.colony_name = Some(info.name.clone());
        }
        if !info.owner.is_empty() {
            event.owner = Some(info.owner.clone());
        }
    }
}

/// Record one colony event; on store failure, log, recover the connection,
/// and move on (the event is not retried). Returns whether a row was
/// written.
async fn record_colony_event(
    event: &ColonyEvent,
    pool: &mut PostgresPool,
    store_config: &PostgresConfig,
    backoff: Duration,
) -> bool {
    let result = EventSink::new(pool.pool()).record_colony_event(event).await;
    match result {
        Ok(InsertOutcome::Inserted) => true,
        Ok(InsertOutcome::Duplicate) => {
            debug!(
                colony_id = event.colony_id,
                action = %event.action,
                building = %event.building_name,
                "Colony event already recorded"
            );
            false
        }
        Err(error) => {
            warn!(error = %error, "Store failure recording colony event");
            recover_store(pool, store_config, backoff).await;
            false
        }
    }
}

/// Drop and recreate the store connection after a failure.
///
/// Backs off briefly, reconnects, and re-runs schema setup. A failed
/// reconnect leaves the old pool in place; the next record attempt will
/// land here again.
async fn recover_store(pool: &mut PostgresPool, store_config: &PostgresConfig, backoff: Duration) {
    tokio::time::sleep(backoff).await;
    match PostgresPool::connect(store_config).await {
        Ok(fresh) => {
            if let Err(error) = EventSink::new(fresh.pool()).ensure_schema().await {
                warn!(error = %error, "Schema setup after reconnect failed");
            }
            pool.close().await;
            *pool = fresh;
            info!("Store connection recreated");
        }
        Err(error) => {
            warn!(error = %error, "Store reconnect failed, will retry on next event");
        }
    }
}

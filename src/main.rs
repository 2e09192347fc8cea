#[macro_use]
extern crate slog;
extern crate slog_async;
extern crate slog_term;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use slog::Drain;
use tokio::sync::mpsc;

use leasewatch::config;
use leasewatch::store::{AbstractEngine, Engine};
use leasewatch::web::handlers;

const DEFAULT_CONFIG_PATH: &str = "/etc/dhcpd/dhcpd.conf";
const DEFAULT_LEASE_PATH: &str = "/var/lib/dhcpd/dhcpd.leases";
const DEFAULT_PORT: u16 = 3412;
const WATCH_INTERVAL: Duration = Duration::from_secs(1);
const TRIGGER_QUEUE_DEPTH: usize = 8;

#[tokio::main]
async fn main() {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = slog::Logger::root(drain, o!());

    let config_path =
        std::env::var("LEASEWATCH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let lease_path = PathBuf::from(
        std::env::var("LEASEWATCH_LEASES").unwrap_or_else(|_| DEFAULT_LEASE_PATH.to_string()),
    );
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let config_text = match std::fs::read_to_string(&config_path) {
        Ok(text) => text,
        Err(err) => {
            crit!(logger, "Failed reading config {}: {}", config_path, err);
            return;
        }
    };
    let subnet = match config::parse(&config_text) {
        Ok(subnet) => subnet,
        Err(err) => {
            crit!(logger, "Failed parsing config {}: {}", config_path, err);
            return;
        }
    };
    info!(
        logger,
        "Watching pool {} - {} ({} addresses)",
        subnet.range_start,
        subnet.range_finish,
        subnet.pool_size
    );

    let engine = Arc::new(Engine::create(
        lease_path.clone(),
        subnet,
        logger.new(o!("module" => "engine")),
    ));

    // The lease file may not exist yet; the watcher will pick it up.
    if let Err(err) = engine.reparse().await {
        warn!(logger, "Initial lease parse failed: {}", err);
    }

    let mut events = engine.subscribe();
    let event_logger = logger.new(o!("module" => "events"));
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            let changed = event.changed.map(|records| records.len()).unwrap_or(0);
            info!(
                event_logger,
                "Snapshot updated: {} of {} leased, {} changed",
                event.meta.used_count,
                event.meta.pool_size,
                changed
            );
        }
    });

    let (triggers, trigger_rx) = mpsc::channel(TRIGGER_QUEUE_DEPTH);
    tokio::spawn(Arc::clone(&engine).run(trigger_rx));
    tokio::spawn(watch_lease_file(
        lease_path,
        triggers,
        logger.new(o!("module" => "watcher")),
    ));

    info!(logger, "Serving on port {}", port);
    let engine: Arc<dyn AbstractEngine> = engine;
    warp::serve(handlers::filters(engine))
        .run(([0, 0, 0, 0], port))
        .await;
}

/// Polls the lease file's mtime and queues a reparse on every change.
///
/// dhcpd rewrites the lease file in bursts; a full trigger queue means a
/// reparse is already pending, so the burst collapses into one cycle.
async fn watch_lease_file(path: PathBuf, triggers: mpsc::Sender<()>, logger: slog::Logger) {
    let mut interval = tokio::time::interval(WATCH_INTERVAL);
    let mut last_seen: Option<SystemTime> = None;
    loop {
        interval.tick().await;
        let modified = match tokio::fs::metadata(&path).await.and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(err) => {
                debug!(logger, "Lease file unavailable: {}", err);
                continue;
            }
        };
        if let Some(previous) = last_seen {
            if modified > previous {
                debug!(logger, "Lease file changed");
                if triggers.try_send(()).is_err() {
                    debug!(logger, "Reparse already queued");
                }
            }
        }
        last_seen = Some(modified);
    }
}

//! Memcache Load Driver
//!
//! Runs concurrent writers against a store while the background worker
//! flushes snapshots, then reports what was written and what is left.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use hmemcache::flush::FlushTarget;
use hmemcache::{ColumnSet, Config, MemcacheEntry, Result, Snapshot, Store, LATEST_TIMESTAMP};
use tracing_subscriber::{fmt, EnvFilter};

/// Memcache load driver
#[derive(Parser, Debug)]
#[command(name = "memcache-load")]
#[command(about = "Drive concurrent writes and background flushes through a memcache")]
#[command(version)]
struct Args {
    /// Number of writer threads
    #[arg(short, long, default_value = "4")]
    writers: usize,

    /// Rows written by each writer
    #[arg(short, long, default_value = "10000")]
    rows: usize,

    /// Columns per row
    #[arg(short, long, default_value = "4")]
    columns: usize,

    /// Delete the first column of every Nth row (0 = never)
    #[arg(short, long, default_value = "10")]
    delete_every: usize,

    /// Flush size limit in KiB
    #[arg(short = 'f', long, default_value = "1024")]
    flush_kb: usize,

    /// Cell time-to-live in seconds (0 = forever)
    #[arg(short, long, default_value = "0")]
    ttl_secs: u64,
}

/// Encodes every snapshot entry the way a storage writer would and keeps
/// count of what passed through
#[derive(Default)]
struct CountingTarget {
    entries: AtomicU64,
    tombstones: AtomicU64,
    bytes: AtomicU64,
}

impl FlushTarget for CountingTarget {
    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let mut bytes = 0u64;
        let mut tombstones = 0u64;

        for (key, entry) in snapshot.iter() {
            bytes += key.encode()?.len() as u64;
            match entry {
                MemcacheEntry::Value(value) => bytes += value.len() as u64,
                MemcacheEntry::Tombstone => tombstones += 1,
            }
        }

        self.entries.fetch_add(snapshot.len() as u64, Ordering::Relaxed);
        self.tombstones.fetch_add(tombstones, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);

        tracing::info!(
            generation = snapshot.generation(),
            entries = snapshot.len(),
            tombstones,
            bytes,
            "snapshot persisted"
        );
        Ok(())
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hmemcache=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("memcache-load v{}", hmemcache::VERSION);
    tracing::info!(
        writers = args.writers,
        rows = args.rows,
        columns = args.columns,
        "starting load"
    );

    let mut builder = Config::builder().flush_size_limit(args.flush_kb * 1024);
    if args.ttl_secs > 0 {
        builder = builder.ttl(Duration::from_secs(args.ttl_secs));
    }
    let config = builder.build();

    let target = Arc::new(CountingTarget::default());
    let store = match Store::open(config, Arc::clone(&target) as Arc<dyn FlushTarget>) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let started = Instant::now();
    let handles: Vec<_> = (0..args.writers)
        .map(|writer| {
            let store = Arc::clone(&store);
            let rows = args.rows;
            let columns = args.columns;
            let delete_every = args.delete_every;
            thread::spawn(move || write_rows(&store, writer, rows, columns, delete_every))
        })
        .collect();

    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("Writer failed: {}", e);
                std::process::exit(1);
            }
            Err(_) => {
                tracing::error!("Writer panicked");
                std::process::exit(1);
            }
        }
    }
    let write_elapsed = started.elapsed();

    let remaining_rows = store.scanner(ColumnSet::all(), b"").count();
    tracing::info!(
        elapsed_ms = write_elapsed.as_millis() as u64,
        buffered_entries = store.memcache().entry_count(),
        buffered_rows = remaining_rows,
        background_flushes = store.flush_metrics().completed(),
        failed_flushes = store.flush_metrics().failed(),
        "writers finished"
    );

    let store = match Arc::try_unwrap(store) {
        Ok(store) => store,
        Err(_) => {
            tracing::error!("Store still shared after writers finished");
            std::process::exit(1);
        }
    };

    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
        std::process::exit(1);
    }

    tracing::info!(
        entries = target.entries.load(Ordering::Relaxed),
        tombstones = target.tombstones.load(Ordering::Relaxed),
        bytes = target.bytes.load(Ordering::Relaxed),
        "load complete"
    );
}

fn write_rows(
    store: &Store,
    writer: usize,
    rows: usize,
    columns: usize,
    delete_every: usize,
) -> Result<()> {
    for i in 0..rows {
        let row = format!("row{:04}{:08}", writer, i);
        for c in 0..columns {
            let column = format!("data:c{}", c);
            let value = format!("{}/{}", row, column);
            store.put(row.clone(), column, LATEST_TIMESTAMP, value)?;
        }
        if delete_every > 0 && i % delete_every == 0 {
            store.delete(row, "data:c0", LATEST_TIMESTAMP)?;
        }
    }
    Ok(())
}

//! Shoal simulation runner.
//!
//! Loads a configuration, drives the tick scheduler on the main thread and
//! plays the renderer's role on a second thread: consuming published
//! snapshots once per visual frame and logging samples.

use clap::Parser;
use crossbeam_channel::{bounded, select, tick};
use hdrhistogram::Histogram;
use log::{debug, error, info};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use shoal_config::ConfigLoader;
use shoal_simulation::{RenderFeed, TickScheduler};

/// Render-consumer frame rate; deliberately decoupled from the tick rate.
const RENDER_FPS: f64 = 60.0;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the simulation configuration file (JSON or TOML)
    #[arg(short, long, default_value = "school.json")]
    config: PathBuf,

    /// Stop after this many ticks (runs until Ctrl+C when omitted)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Log a position sample every N render frames (0 disables sampling)
    #[arg(long, default_value_t = 120)]
    sample_every: u64,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match ConfigLoader::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config {}: {e}", args.config.display());
            process::exit(1);
        }
    };
    info!(
        "loaded {}: {} agents, tick interval {}s, seed {}",
        args.config.display(),
        config.population,
        config.tick_interval,
        config.random_seed
    );

    let mut scheduler = match TickScheduler::new(&config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("failed to build scheduler: {e}");
            process::exit(1);
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed)) {
            error!("failed to install Ctrl+C handler: {e}");
            process::exit(1);
        }
    }

    let (stop_tx, stop_rx) = bounded::<()>(0);
    let renderer = spawn_render_consumer(
        scheduler.feed(),
        stop_rx,
        config.population,
        args.sample_every,
    );

    let mut histogram = match Histogram::<u64>::new(3) {
        Ok(histogram) => histogram,
        Err(e) => {
            error!("failed to create tick histogram: {e}");
            process::exit(1);
        }
    };

    scheduler.run(&shutdown, args.ticks, |spent| {
        histogram.saturating_record(spent.as_micros().min(u64::MAX as u128) as u64);
    });

    drop(stop_tx);
    if renderer.join().is_err() {
        error!("render consumer thread panicked");
    }

    info!("ran {} ticks", scheduler.ticks());
    if histogram.len() > 0 {
        info!(
            "tick time us: p50 {} p99 {} max {}",
            histogram.value_at_quantile(0.5),
            histogram.value_at_quantile(0.99),
            histogram.max()
        );
    }
}

/// Stand-in for the excluded renderer: reads the feed once per frame and
/// treats each snapshot as immutable for that frame.
fn spawn_render_consumer(
    feed: RenderFeed,
    stop_rx: crossbeam_channel::Receiver<()>,
    population: usize,
    sample_every: u64,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let frames = tick(Duration::from_secs_f64(1.0 / RENDER_FPS));
        let mut frame: u64 = 0;
        loop {
            select! {
                recv(stop_rx) -> _ => break,
                recv(frames) -> _ => {
                    let snapshot = feed.snapshot();
                    debug_assert_eq!(snapshot.len(), population);
                    frame += 1;
                    if sample_every > 0 && frame % sample_every == 0 {
                        for (index, transform) in snapshot.iter().take(3).enumerate() {
                            debug!(
                                "frame {frame} agent {index}: pos ({:.2}, {:.2}, {:.2})",
                                transform.position.x,
                                transform.position.y,
                                transform.position.z
                            );
                        }
                    }
                }
            }
        }
    })
}

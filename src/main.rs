mod audio;
mod cli;
mod core;
mod input;
mod scheduler;

use anyhow::{Context, Result};
use audio::open_sink;
use clap::Parser;
use cli::CliArgs;
use input::{Command, Outcome, Settings};
use scheduler::PlaybackScheduler;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("windowplay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_default()?,
    };
    let run = args.resolve(settings).context("Invalid configuration")?;

    let sink = open_sink(run.sink, run.clip_length).context("Failed to open audio output")?;
    info!("Audio output: {}", sink.name());
    info!(
        "Window {}, bursts of {:?} plays {:?}s apart",
        run.window,
        run.policy.repeats(),
        run.policy.delay_secs()
    );

    let mut scheduler = PlaybackScheduler::new(sink)
        .with_policy(run.policy)
        .with_timing(run.timing);
    if let Some(seed) = run.seed {
        scheduler = scheduler.with_seed(seed);
    }

    // Print every status change for the user
    let mut status = scheduler.subscribe();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            println!("{}", current);
        }
    });

    if run.autostart {
        scheduler.start_with(run.window, run.playback)?;
    } else {
        scheduler = scheduler.with_window(run.window).with_config(run.playback);
    }

    println!("{}", scheduler.status());
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                None
            }
        };
        // End of input behaves like quit
        let Some(line) = line else {
            scheduler.stop().await;
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command.execute(&mut scheduler).await {
            Ok(Outcome::Continue(Some(text))) => println!("{}", text),
            Ok(Outcome::Continue(None)) => {}
            Ok(Outcome::Quit) => break,
            Err(e) => {
                warn!("{}", e);
                println!("{}", e);
            }
        }
    }

    info!("Exiting");
    Ok(())
}

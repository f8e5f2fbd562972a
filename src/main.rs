use satlink::prelude::*;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Display more information on the console. Can be used multiple times.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Seconds to wait when scanning for bluetooth devices
    #[arg(short, long, value_name = "SECONDS", default_value_t = 3.0)]
    scantime: f32,

    /// Advertised name of the satellite hub to connect to
    #[arg(short, long, default_value = firmware::DEFAULT_DEVICE_NAME)]
    device_name: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan for satellite hubs
    Scan {},

    /// Write raw notification payloads to the console
    Print {},

    /// Capture telemetry until Ctrl-C, then export a SensorData CSV
    Capture {
        /// Directory the CSV file is written into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Import a SensorData CSV and print a summary of its contents
    Load { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    if cli.verbose > 1 {
        dbg!(&cli);
    }

    let conf = App {
        verbose: cli.verbose,
        scantime: cli.scantime,
        device_name: cli.device_name.clone(),
    };

    match &cli.command {
        Some(Commands::Scan {}) => {
            bluetooth::scan(&conf).await?;
        }
        Some(Commands::Print {}) => {
            print_payloads(conf).await?;
        }
        Some(Commands::Capture { output }) => {
            capture(conf, output).await?;
        }
        Some(Commands::Load { file }) => {
            load(file)?;
        }
        None => {
            <Cli as clap::CommandFactory>::command().print_help()?;
        }
    }

    Ok(())
}

/// Spawns the transport and returns the notification funnel. All decoding
/// happens on this end of the channel, one notification at a time.
fn spawn_transport(conf: App) -> mpsc::Receiver<bluetooth::Notification> {
    let (tx, rx) = mpsc::channel::<bluetooth::Notification>(64);
    tokio::spawn(async move {
        if let Err(e) = bluetooth::capture(conf, tx).await {
            log::error!("bluetooth transport stopped: {e}");
        }
    });
    rx
}

async fn print_payloads(conf: App) -> anyhow::Result<()> {
    let mut rx = spawn_transport(conf.clone());
    while let Some(n) = rx.recv().await {
        let text = n
            .payload
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<String>>()
            .join(", ");
        println!(
            "{} channel {}: {} bytes: {text};",
            n.kind.label(),
            n.channel,
            n.payload.len()
        );
    }
    Ok(())
}

async fn capture(conf: App, output: &Path) -> anyhow::Result<()> {
    let mut rx = spawn_transport(conf.clone());
    let mut session = Session::new();
    println!("Capturing telemetry. Press Ctrl-C to stop and export.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            msg = rx.recv() => match msg {
                Some(n) => ingest_notification(&conf, &mut session, &n),
                None => {
                    eprintln!("Transport closed, exporting what was captured.");
                    break;
                }
            },
        }
    }

    let text = match session.export_csv() {
        Ok(text) => text,
        Err(Error::EmptyExportSource) => {
            eprintln!("Nothing was captured, no file written.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let path = output.join(codec::export_filename(chrono::Utc::now()));
    std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn ingest_notification(conf: &App, session: &mut Session, n: &bluetooth::Notification) {
    match session.ingest(n.kind, n.channel, &n.payload) {
        Ok(Some(report)) => {
            // Refresh the column-keyed view for whoever renders it.
            let snapshot = session.snapshot();
            if conf.verbose > 0 {
                let live = snapshot
                    .values()
                    .filter(|column| column.iter().any(|&v| v != 0.0))
                    .count();
                println!(
                    "Stored frame {}: satellite {} {} -> column {} ({} samples, {live}/35 columns live)",
                    report.event_id,
                    report.satellite_id,
                    report.kind.label(),
                    report.column,
                    report.samples_stored,
                );
            }
        }
        Ok(None) => {}
        // Per-frame failure: drop it, keep the session running.
        Err(e) => log::warn!("dropped frame on {} channel {}: {e}", n.kind.label(), n.channel),
    }
}

fn load(file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let mut session = Session::new();
    session.import_csv(&text)?;

    let snapshot = session.snapshot();
    let live = snapshot
        .values()
        .filter(|column| column.iter().any(|&v| v != 0.0))
        .count();
    println!("Loaded {}: {live}/35 columns populated", file.display());

    println!("Start times (raw / normalized, ms):");
    for satellite in 1..=matrix::SATELLITES as u8 {
        let row: Vec<String> = [SensorKind::Gyro, SensorKind::Accel, SensorKind::Impact]
            .into_iter()
            .map(|kind| {
                let s = timing::slot(satellite, kind);
                format!(
                    "{} {}/{}",
                    kind.label(),
                    session.start_times_raw()[s],
                    session.start_times_normalized()[s]
                )
            })
            .collect();
        println!("  satellite {satellite}: {}", row.join(", "));
    }
    Ok(())
}

mod audio;
mod recognition;
mod ui;

use crate::audio::{AudioRecorder, DEFAULT_SAMPLE_RATE, StopSignal};
use crate::recognition::{RecognitionClient, RecognitionError, TrackMatch};
use crate::ui::{Phase, StatusUi};
use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use jiff::Zoned;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

/// Fallback when neither --endpoint nor TRACKID_ENDPOINT is set
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000";

#[derive(Parser)]
#[command(name = "trackid")]
#[command(about = "Lightweight CLI music recognition client")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a clip from the microphone and identify the song
    Listen {
        /// Recording duration in seconds before the automatic stop
        #[arg(long, default_value = "5")]
        duration: u64,

        /// Audio sample rate in Hz
        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        /// Recognition endpoint base URL (also: TRACKID_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Keep the recorded clip in the app data directory
        #[arg(long)]
        keep: bool,

        /// Start a new cycle after each result
        #[arg(long)]
        repeat: bool,
    },

    /// Submit an existing WAV file for identification
    Identify {
        /// Path to a WAV file
        file: PathBuf,

        /// Recognition endpoint base URL (also: TRACKID_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List available audio recording devices
    Devices,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Text,
    Json,
}

fn resolve_endpoint(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("TRACKID_ENDPOINT").ok())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
}

pub fn get_recordings_dir() -> Result<PathBuf> {
    let data_dir = directories::BaseDirs::new()
        .ok_or_else(|| anyhow!("Could not find data directory"))?
        .data_local_dir()
        .join("trackid")
        .join("recordings");

    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

pub fn get_recording_path() -> Result<PathBuf> {
    let recordings_dir = get_recordings_dir()?;
    let timestamp = Zoned::now().strftime("%Y-%m-%d_%H-%M-%S");
    Ok(recordings_dir.join(format!("{}.wav", timestamp)))
}

/// Forward stdin lines to a channel so the listening loop can poll for a
/// manual stop without blocking on a read
fn spawn_stdin_lines() -> Receiver<String> {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(line.clone()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// One full recognition cycle: microphone, clip, upload, render
async fn listen_once(
    duration: u64,
    sample_rate: u32,
    keep: bool,
    format: &OutputFormat,
    client: &RecognitionClient,
    lines: &Receiver<String>,
    ui: &mut StatusUi,
) -> Result<()> {
    ui.set_phase(Phase::RequestingMicrophone);

    let recorder = match AudioRecorder::new(sample_rate) {
        Ok(recorder) => recorder,
        Err(e) => {
            ui.set_phase(Phase::Idle);
            return Err(anyhow!("Unable to access microphone: {}", e));
        }
    };

    let stop = StopSignal::new();
    let session = match recorder.start_session(stop.clone()) {
        Ok(session) => session,
        Err(e) => {
            ui.set_phase(Phase::Idle);
            return Err(anyhow!("Unable to start recording: {}", e));
        }
    };

    // Drop any input buffered before this cycle started
    while lines.try_recv().is_ok() {}

    ui.set_phase(Phase::Listening);

    // Wait for the automatic-stop timer or a manual stop, whichever comes
    // first. The stream error callback can also fire the signal.
    let started = Instant::now();
    let max_duration = Duration::from_secs(duration);
    loop {
        if stop.is_stopped() {
            break;
        }

        if started.elapsed() >= max_duration {
            stop.request_stop();
            break;
        }

        if lines.try_recv().is_ok() {
            stop.request_stop();
            break;
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    ui.set_phase(Phase::Processing);
    let clip = session.finish()?;

    if keep {
        let path = get_recording_path()?;
        clip.save(&path)?;
        eprintln!("Recording saved to {}", path.display());
    }

    eprintln!(
        "Recorded {:.1}s at {}Hz",
        clip.duration().as_secs_f32(),
        clip.sample_rate()
    );

    let outcome = client.recognize(clip.wav_bytes()?).await;

    ui.set_phase(Phase::ShowingResult);
    output_result(outcome, format)?;
    ui.set_phase(Phase::Idle);

    Ok(())
}

/// Submit a WAV file picked from disk instead of recording one
async fn identify_file(
    file: &std::path::Path,
    format: &OutputFormat,
    client: &RecognitionClient,
) -> Result<()> {
    let wav = audio::read_wav_file(file)?;

    let pb = ui::spinner("Identifying...");
    let outcome = client.recognize(wav).await;
    pb.finish_and_clear();

    output_result(outcome, format)?;
    Ok(())
}

fn output_result(
    outcome: std::result::Result<TrackMatch, RecognitionError>,
    format: &OutputFormat,
) -> Result<()> {
    match outcome {
        Ok(track) => match format {
            OutputFormat::Text => println!("{}", ui::render_track(&track)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&track)?),
        },
        Err(err) => match format {
            OutputFormat::Text => println!("{}", ui::render_failure(&err)),
            OutputFormat::Json => {
                let json = serde_json::json!({ "error": err.to_string() });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Listen {
            duration,
            sample_rate,
            endpoint,
            format,
            keep,
            repeat,
        } => {
            let endpoint = resolve_endpoint(endpoint);
            let client = RecognitionClient::new(&endpoint)
                .map_err(|e| anyhow!("Failed to create recognition client: {}", e))?;

            let lines = spawn_stdin_lines();
            let mut ui = StatusUi::new();

            loop {
                let cycle =
                    listen_once(duration, sample_rate, keep, &format, &client, &lines, &mut ui)
                        .await;

                if let Err(e) = cycle {
                    // Never leave a stale spinner behind the error message
                    ui.reset();
                    if !repeat {
                        return Err(e);
                    }
                    eprintln!("Error: {}", e);
                }

                if !repeat {
                    break;
                }

                println!();
                println!("Press Enter to listen again (Ctrl-C to quit)");
                if lines.recv().is_err() {
                    // stdin closed
                    break;
                }
            }

            Ok(())
        }

        Commands::Identify {
            file,
            endpoint,
            format,
        } => {
            let endpoint = resolve_endpoint(endpoint);
            let client = RecognitionClient::new(&endpoint)
                .map_err(|e| anyhow!("Failed to create recognition client: {}", e))?;

            identify_file(&file, &format, &client).await
        }

        Commands::Devices => {
            println!("Listing audio devices");

            let devices = AudioRecorder::list_devices()
                .map_err(|e| anyhow!("Failed to list audio devices: {}", e))?;

            println!("Available Audio Devices:");
            println!(
                "{:<30} {:<10} {:<20} Formats",
                "Name", "Default", "Sample Rates"
            );
            println!("{}", "-".repeat(80));

            for device in devices {
                let default_str = if device.is_default { "YES" } else { "NO" };
                let sample_rates = device
                    .supported_sample_rates
                    .iter()
                    .take(3)
                    .map(|sr| sr.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");

                let formats = device
                    .supported_formats
                    .iter()
                    .take(2)
                    .map(|f| format!("{:?}", f))
                    .collect::<Vec<_>>()
                    .join(", ");

                println!(
                    "{:<30} {:<10} {:<20} {}",
                    ui::truncate_chars(&device.name, 30),
                    default_str,
                    sample_rates,
                    formats
                );
            }

            Ok(())
        }
    }
}

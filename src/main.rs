use clap::Parser;
use rythmiq::audio::{ClickEngine, ClickSynth, NullClick};
use rythmiq::capture::{CaptureError, MidiCapture};
use rythmiq::config::{ConfigError, Settings, SettingsStore};
use rythmiq::generate::{GenerationError, MidiOutputPlayer, SequencePlayer};
use rythmiq::messaging::channels::create_notification_channel;
use rythmiq::midi::{MidiDeviceManager, MidirAccess};
use rythmiq::sequencer::{NoteSequence, SequenceError};
use rythmiq::ui::StudioApp;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

// Room for a burst of capture notices between two UI frames
const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 256;

// Extra wait beyond the nominal take length before giving up on the clock
const HEADLESS_GRACE: Duration = Duration::from_secs(2);

const PLAYBACK_POLL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(author, version, about = "Record a MIDI take against a metronome", long_about = None)]
struct Args {
    /// Record one take without opening the studio window
    #[arg(long)]
    headless: bool,

    /// Tempo in BPM (20-999)
    #[arg(short, long)]
    tempo: Option<f64>,

    /// Write the take here instead of stdout (headless)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Emit a data:application/json;base64 URL instead of JSON (headless)
    #[arg(long)]
    data_url: bool,

    /// Disable the metronome click
    #[arg(long)]
    no_click: bool,

    /// Only capture from MIDI inputs whose name contains this text
    #[arg(short, long)]
    input: Option<String>,

    /// Play the take on a MIDI output once recorded (headless)
    #[arg(long)]
    play: bool,

    /// Play on the MIDI output whose name contains this text
    #[arg(long)]
    output: Option<String>,

    /// List MIDI ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Playback(#[from] GenerationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UI error: {0}")]
    Ui(String),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Flags apply to this run only and are never written back
    let mut store = SettingsStore::open();
    store.override_for_run(|settings| {
        if let Some(bpm) = args.tempo {
            settings.capture.tempo_bpm = bpm;
        }
        if args.no_click {
            settings.capture.click_enabled = false;
        }
        if args.input.is_some() {
            settings.midi_input = args.input.clone();
        }
        if args.output.is_some() {
            settings.midi_output = args.output.clone();
        }
    });

    let result = if args.list_ports {
        list_ports();
        Ok(())
    } else if args.headless {
        run_headless(store.current(), &args)
    } else {
        run_studio(store)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

fn list_ports() {
    let manager = MidiDeviceManager::new();

    println!("MIDI inputs:");
    for port in manager.list_input_ports() {
        println!("  [{}] {}", port.index, port.name);
    }
    println!("MIDI outputs:");
    for port in manager.list_output_ports() {
        println!("  [{}] {}", port.index, port.name);
    }
}

/// Audible click if enabled and an output device exists, silence otherwise
fn open_click(settings: &Settings) -> (Option<ClickEngine>, Arc<dyn ClickSynth>) {
    if !settings.capture.click_enabled {
        return (None, Arc::new(NullClick));
    }

    match ClickEngine::new(settings.capture.click_volume) {
        Ok(engine) => {
            let trigger = Arc::new(engine.trigger());
            (Some(engine), trigger)
        }
        Err(e) => {
            log::warn!("Metronome click disabled: {e}");
            (None, Arc::new(NullClick))
        }
    }
}

fn run_headless(settings: &Settings, args: &Args) -> Result<(), AppError> {
    let tempo = settings.capture.tempo()?;
    let (_engine, clicks) = open_click(settings);

    let mut capture = MidiCapture::new(
        MidirAccess::new(settings.midi_input.clone()),
        settings.capture.clone(),
        clicks,
    );
    capture.start_capture(tempo)?;

    let grid = settings.capture.grid();
    let steps = (settings.capture.pre_count_steps + settings.capture.recording_steps) as i64;
    let nominal = Duration::from_secs_f64(grid.step_to_seconds(steps, &tempo));
    eprintln!(
        "Recording {} steps at {} after a {}-step count-in...",
        settings.capture.recording_steps, tempo, settings.capture.pre_count_steps
    );

    let sequence = match capture.wait_finished(nominal + HEADLESS_GRACE) {
        Some(sequence) => sequence,
        None => {
            log::warn!("Take did not finish in time, stopping");
            capture.stop_capture()
        }
    };
    capture.cleanup();

    let text = if args.data_url {
        sequence.to_data_url()?
    } else {
        sequence.to_json_pretty()?
    };

    match &args.out {
        Some(path) => {
            std::fs::write(path, text)?;
            log::info!("Take written to {}", path.display());
        }
        None => println!("{text}"),
    }

    if args.play {
        play_take(&sequence, settings)?;
    }
    Ok(())
}

fn play_take(sequence: &NoteSequence, settings: &Settings) -> Result<(), AppError> {
    let mut player = MidiOutputPlayer::new(settings.midi_output.clone());
    player.play(sequence)?;
    while player.is_playing() {
        std::thread::sleep(PLAYBACK_POLL);
    }
    Ok(())
}

fn run_studio(store: SettingsStore) -> Result<(), AppError> {
    let (notification_tx, notification_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let settings = store.current();
    let (engine, clicks) = open_click(settings);

    let capture = MidiCapture::new(
        MidirAccess::new(settings.midi_input.clone()),
        settings.capture.clone(),
        clicks,
    )
    .with_notifications(notification_tx);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 480.0])
            .with_title("Rythmiq"),
        ..Default::default()
    };

    eframe::run_native(
        "Rythmiq",
        native_options,
        Box::new(move |_cc| {
            Ok(Box::new(
                StudioApp::new(capture, store, notification_rx).with_click_engine(engine),
            ))
        }),
    )
    .map_err(|e| AppError::Ui(e.to_string()))
}

//! Terminal metronome
//!
//! Stands in for a GUI: type a command and hit enter.
//!   (empty) or p   play / stop
//!   + / -          next faster / slower preset tempo
//!   <number>       set the tempo in bpm
//!   r              put the light back on beat one
//!   q              quit
use std::{
    io::{self, BufRead, Write},
    sync::{mpsc, Arc},
    thread,
};

use clap::Parser;
use log::{info, warn};
use pulse_metronome::{
    common::box_error::BoxError,
    display::{beat_display::BeatDisplay, beat_indicator::BeatMessage},
    metronome::{Metronome, BPM_CHOICES},
    settings::MetronomeSettings,
    sound::{
        alert::TerminalBell,
        alsa_emitter::AlsaToneEmitter,
        click_tone::ClickTone,
        tone_emitter::{SilentToneEmitter, ToneEmitter},
    },
};

/// Metronome with a rotating beat light and an ALSA click
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Settings file (json)
    #[arg(short, long)]
    config: Option<String>,

    /// Starting tempo
    #[arg(short, long)]
    bpm: Option<u32>,

    /// Beats per measure
    #[arg(long)]
    beats: Option<u32>,

    /// ALSA pcm to play the click on
    #[arg(short, long)]
    device: Option<String>,

    /// No click, lights only
    #[arg(short, long)]
    mute: bool,

    /// Print each beat as a json line instead of drawing lights
    #[arg(long)]
    json: bool,
}

fn render_lights(lights_rx: mpsc::Receiver<BeatMessage>, as_json: bool) {
    for msg in lights_rx {
        if as_json {
            match serde_json::to_string(&msg) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("beat message: {}", e),
            }
            continue;
        }
        let row: String = (0..msg.beat_count)
            .map(|i| if i == msg.lit { "[#]" } else { "[ ]" })
            .collect();
        print!("\r{}  ", row);
        let _res = io::stdout().flush();
    }
}

fn handle_command(met: &mut Metronome, cmd: &str) -> Result<(), BoxError> {
    match cmd {
        "" | "p" => {
            let playing = met.toggle()?;
            println!("{} at {} bpm", if playing { "playing" } else { "stopped" }, met.selected_bpm());
        }
        "+" => println!("{} bpm", met.tempo_up()?),
        "-" => println!("{} bpm", met.tempo_down()?),
        "r" => met.reset_indicator(),
        other => {
            let bpm: i64 = other.parse().map_err(|_| format!("unknown command '{}'", other))?;
            met.select_bpm(bpm)?;
            println!("{} bpm", bpm);
        }
    }
    Ok(())
}

fn main() -> Result<(), BoxError> {
    env_logger::init();
    let args = Args::parse();

    let mut config = MetronomeSettings::load(args.config.as_deref())?;
    if let Some(bpm) = args.bpm {
        config.set_value("bpm", bpm)?;
    }
    if let Some(beats) = args.beats {
        config.set_value("beat_count", beats)?;
    }
    if let Some(device) = args.device.as_deref() {
        config.set_value("audio_device", device)?;
    }
    if args.mute {
        config.set_value("mute", true)?;
    }
    let settings = MetronomeSettings::from_config(&config)?;

    let emitter: Box<dyn ToneEmitter> = if settings.mute {
        Box::new(SilentToneEmitter::new())
    } else {
        Box::new(AlsaToneEmitter::new(&settings.audio_device))
    };
    let click = ClickTone::new(settings.tone.clone(), emitter, Box::new(TerminalBell));

    let (lights_tx, lights_rx) = mpsc::channel();
    let display = Arc::new(BeatDisplay::new(settings.beat_count, click)?.with_lights(lights_tx));
    let as_json = args.json;
    let _render_handle = thread::spawn(move || render_lights(lights_rx, as_json));

    let mut met = Metronome::with_bpm(display, settings.bpm as i64)?;
    println!("enter: play/stop, +/-: tempo {:?}, <n>: bpm, r: reset, q: quit", BPM_CHOICES);

    for line in io::stdin().lock().lines() {
        let line = line?;
        let cmd = line.trim();
        if cmd == "q" {
            break;
        }
        if let Err(e) = handle_command(&mut met, cmd) {
            println!("{}", e);
        }
    }
    met.stop();
    info!("bye");
    Ok(())
}

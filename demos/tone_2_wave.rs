use clap::Parser;
use pulse_metronome::{common::box_error::BoxError, settings::MetronomeSettings};

/// Render the configured click tone into a wave file
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Settings file to take the tone from
    #[arg(short, long)]
    config: Option<String>,

    /// Filename for the output
    #[arg(short, long)]
    out_file: String,

    /// How many clicks to put in the file, one per beat
    #[arg(short, long, default_value_t = 4)]
    beats: u32,
}

fn main() -> Result<(), BoxError> {
    env_logger::init();
    let args = Args::parse();

    let config = MetronomeSettings::load(args.config.as_deref())?;
    let settings = MetronomeSettings::from_config(&config)?;
    let tone = settings.tone.render_beat(settings.bpm);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: settings.tone.sample_rate,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&args.out_file, spec)?;
    for _ in 0..args.beats {
        for s in &tone {
            // hound wants 8 bit samples signed, it stores them unsigned
            writer.write_sample((*s as i16 - 128) as i8)?;
        }
    }
    writer.finalize()?;

    println!("out_file: {}", args.out_file);
    println!("{} beats at {} bpm", args.beats, settings.bpm);
    Ok(())
}

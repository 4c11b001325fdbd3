mod audio;
mod config;
mod speaker;
mod transcript;
mod vad;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use audio::{read_wav_mono, resample_to_analysis_rate, ANALYSIS_SAMPLE_RATE};
use config::Config;
use speaker::{SpeakerIdProvider, StftFrames};
use transcript::{Segment, SessionRecord};
use vad::UtteranceSegmenter;

/// Headless CLI for lightweight online speaker diarization
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input WAV recording
    input: PathBuf,

    /// Expected number of speakers (1-10)
    #[arg(short, long)]
    speakers: Option<usize>,

    /// Similarity threshold for same-speaker decisions
    #[arg(long)]
    similarity_threshold: Option<f32>,

    /// Feature extraction deadline per utterance (ms)
    #[arg(long)]
    extract_timeout_ms: Option<u64>,

    /// VAD threshold (0.0 - 1.0)
    #[arg(long)]
    vad_threshold: Option<f32>,

    /// Silence duration (ms) to end an utterance
    #[arg(long)]
    silence_ms: Option<u32>,

    /// Maximum utterance length (ms)
    #[arg(long)]
    max_utterance_ms: Option<u32>,

    /// Path to a JSON config file (defaults to ~/.diarize-cli/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the full session record as JSON when done
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    // Load config and apply CLI overrides
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let mut config = Config::load(&config_path)?;
    if let Some(speakers) = args.speakers {
        config.expected_speakers = speakers;
    }
    if let Some(threshold) = args.similarity_threshold {
        config.similarity_threshold = threshold;
    }
    if let Some(timeout) = args.extract_timeout_ms {
        config.extract_timeout_ms = timeout;
    }
    if let Some(threshold) = args.vad_threshold {
        config.vad_threshold = threshold;
    }
    if let Some(silence) = args.silence_ms {
        config.silence_to_flush_ms = silence;
    }
    if let Some(max_ms) = args.max_utterance_ms {
        config.max_utterance_ms = max_ms;
    }

    info!("Diarization CLI starting...");
    info!("Input: {:?}", args.input);
    info!("Expected speakers: {}", config.expected_speakers);

    // Decode and bring the recording to the analysis rate
    let decoded = read_wav_mono(&args.input)?;
    info!(
        "Decoded {:.1}s of audio at {} Hz",
        decoded.duration_ms() as f64 / 1000.0,
        decoded.sample_rate
    );
    let samples = resample_to_analysis_rate(&decoded.samples, decoded.sample_rate)?;

    // Build the pipeline
    let mut segmenter = UtteranceSegmenter::new(config.segmenter_config())?;
    let mut provider =
        SpeakerIdProvider::new(config.expected_speakers, config.speaker_id_config());
    let mut session = SessionRecord::new(args.input.display().to_string());

    // Feed the recording through VAD and identify each utterance
    let mut utterances = Vec::new();
    for block in samples.chunks(4096) {
        segmenter.push(block, &mut utterances);
        for utterance in utterances.drain(..) {
            process_utterance(&utterance, &config, &mut provider, &mut session).await;
        }
    }
    if let Some(utterance) = segmenter.finish() {
        process_utterance(&utterance, &config, &mut provider, &mut session).await;
    }

    session.finalize();

    if session.segments.is_empty() {
        warn!("No speech detected in {:?}", args.input);
    }

    // Print summary
    println!("\n--- Session Summary ---");
    println!("Audio: {:.1}s", segmenter.clock_ms() as f64 / 1000.0);
    println!("Speech: {:.1}s", session.speech_duration_ms as f64 / 1000.0);
    println!("Utterances: {}", session.segments.len());
    println!("Speakers detected: {}", provider.speaker_count());
    for (label, ms) in session.speaker_totals() {
        println!("  {}: {:.1}s", label, ms as f64 / 1000.0);
    }

    if args.json {
        println!("\n{}", serde_json::to_string_pretty(&session)?);
    }

    info!("Session complete");
    Ok(())
}

async fn process_utterance(
    utterance: &vad::Utterance,
    config: &Config,
    provider: &mut SpeakerIdProvider,
    session: &mut SessionRecord,
) {
    debug!(
        "Identifying utterance: {}ms - {}ms",
        utterance.start_ms, utterance.end_ms
    );

    let mut source = StftFrames::new(
        utterance.samples.clone(),
        ANALYSIS_SAMPLE_RATE,
        config.fft_bins,
    );
    let (label, confidence) = provider.identify_utterance(&mut source).await;

    println!(
        "[{:02}:{:02}.{:03} - {:02}:{:02}.{:03}] {} ({:.0}%)",
        utterance.start_ms / 60000,
        (utterance.start_ms % 60000) / 1000,
        utterance.start_ms % 1000,
        utterance.end_ms / 60000,
        (utterance.end_ms % 60000) / 1000,
        utterance.end_ms % 1000,
        label,
        confidence * 100.0
    );

    session.add_segment(Segment::new(
        utterance.start_ms,
        utterance.end_ms,
        label,
        confidence,
    ));
}

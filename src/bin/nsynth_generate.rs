//! CLI tool for re-synthesizing a WAV file through a WaveNet autoencoder
//!
//! Encodes a 16 kHz seed file, then regenerates it sample by sample from its
//! own embedding. Writes the generated audio and, optionally, the embedding.
//!
//! Usage:
//!     cargo run --release --features cli --bin nsynth-generate -- \
//!         --audio seed.wav --model-dir model --output generated.wav
//!     cargo run --release --features cli --bin nsynth-generate -- \
//!         --audio seed.wav --checkpoint model.safetensors --config config.json \
//!         --max-samples 16000 --embedding embedding.safetensors

use anyhow::{Context, Result};
use candle_core::Tensor;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use nsynth::{
    device_info, generate_with_progress, load_model, load_pretrained, parse_device,
    quantize_buffer, AudioBuffer, AutoEncoder, Decoder, WavenetAutoEncoder, WavenetConfig,
    SAMPLE_RATE,
};

/// Regenerate audio from its NSynth embedding
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seed WAV file (mono or multi-channel, must be 16 kHz)
    #[arg(short, long)]
    audio: PathBuf,

    /// Model directory containing model.safetensors and optionally config.json
    #[arg(short, long, conflicts_with = "checkpoint")]
    model_dir: Option<PathBuf>,

    /// Checkpoint file (safetensors), used instead of --model-dir
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Architecture config (JSON) for --checkpoint; defaults to NSynth's
    #[arg(long, requires = "checkpoint")]
    config: Option<PathBuf>,

    /// Only use the first N samples of the seed file
    #[arg(long)]
    max_samples: Option<usize>,

    /// Output WAV path
    #[arg(short, long, default_value = "generated.wav")]
    output: PathBuf,

    /// Also write the embedding to this safetensors file
    #[arg(long)]
    embedding: Option<PathBuf>,

    /// Device for inference (auto, cpu, cuda, cuda:N, metal)
    #[arg(long, default_value = "auto")]
    device: String,
}

fn load(args: &Args, device: &candle_core::Device) -> Result<WavenetAutoEncoder> {
    if let Some(ref checkpoint) = args.checkpoint {
        let config = match args.config {
            Some(ref path) => WavenetConfig::from_file(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?,
            None => WavenetConfig::default(),
        };
        return Ok(load_model::<WavenetAutoEncoder, _>(
            checkpoint, device, &config, false,
        )?);
    }
    match args.model_dir {
        Some(ref dir) => Ok(load_pretrained(dir, device)?),
        None => anyhow::bail!("one of --model-dir or --checkpoint is required"),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let device = parse_device(&args.device)?;
    println!("Device: {}", device_info(&device));

    let model = load(&args, &device)?;
    let receptive_field = model.decoder().receptive_field();
    println!(
        "Model: receptive field {} samples, hop length {}",
        receptive_field,
        model.config().hop_length
    );

    let mut audio = AudioBuffer::load(&args.audio)
        .with_context(|| format!("Failed to load seed audio: {}", args.audio.display()))?;
    if let Some(max_samples) = args.max_samples {
        audio.truncate(max_samples);
    }
    println!(
        "Seed: {:.2}s, {} samples at {} Hz",
        audio.duration(),
        audio.len(),
        audio.sample_rate
    );
    let x = quantize_buffer(&audio, &device)?;

    let to_generate = audio.len().saturating_sub(receptive_field);
    println!("\nGenerating {} samples...", to_generate);
    let progress = ProgressBar::new(to_generate as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let generation = generate_with_progress(&model, &x, &progress)?;
    let elapsed = start.elapsed().as_secs_f64();
    println!(
        "Generated in {:.2}s ({:.1} samples/s)",
        elapsed,
        to_generate as f64 / elapsed.max(f64::EPSILON)
    );

    let samples: Vec<f32> = generation.samples.to_vec1()?;
    let output = AudioBuffer::from_quantized(&samples, SAMPLE_RATE);
    ensure_parent(&args.output)?;
    output
        .save(&args.output)
        .with_context(|| format!("Failed to write WAV: {}", args.output.display()))?;
    println!("Saved WAV to: {}", args.output.display());

    if let Some(ref path) = args.embedding {
        ensure_parent(path)?;
        let tensors: HashMap<String, Tensor> =
            HashMap::from([("embedding".to_string(), generation.embedding.clone())]);
        candle_core::safetensors::save(&tensors, path)?;
        println!(
            "Saved embedding {:?} to: {}",
            generation.embedding.dims(),
            path.display()
        );
    }

    Ok(())
}

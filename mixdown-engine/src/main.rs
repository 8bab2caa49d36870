//! Mixdown render worker - Main entry point
//!
//! One invocation executes one render job: it loads the job file and track
//! analyses, materializes every track's audio into an in-memory store,
//! plans the transitions, renders the mashup, and writes the output WAV
//! plus a metrics JSON next to it. Ctrl-C cancels the in-flight job
//! cooperatively.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mixdown_common::config::EngineConfig;
use mixdown_common::TrackAnalysis;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use mixdown_engine::audio::decode_bytes;
use mixdown_engine::job::{self, JobRequest};
use mixdown_engine::render::stems::{Stem, StemSet, StemType};
use mixdown_engine::render::{MixMode, RenderEngine, TrackAudio};
use mixdown_engine::store::{AudioStore, MemoryStore};

/// Extensions the worker will try when locating a track's audio file
const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "m4a", "ogg"];

/// Command-line arguments for the mixdown worker
#[derive(Parser, Debug)]
#[command(name = "mixdown-engine")]
#[command(about = "Mashup render worker")]
#[command(version)]
struct Args {
    /// Render job description (JSON)
    #[arg(short, long, env = "MIXDOWN_JOB")]
    job: PathBuf,

    /// Track analyses (JSON array of TrackAnalysis)
    #[arg(short = 'a', long, env = "MIXDOWN_ANALYSES")]
    analyses: PathBuf,

    /// Folder containing per-track audio: `<track_id>.<ext>` for full
    /// mixes, `<track_id>/<stem>.<ext>` for stems
    #[arg(short = 'd', long, env = "MIXDOWN_AUDIO_DIR")]
    audio_dir: PathBuf,

    /// Output WAV path; metrics land next to it as `<output>.metrics.json`
    #[arg(short, long, env = "MIXDOWN_OUTPUT")]
    output: PathBuf,

    /// Engine config file (TOML); falls back to MIXDOWN_CONFIG, then the
    /// platform config dir, then defaults
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mixdown_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = EngineConfig::load(args.config.as_deref())
        .context("Failed to load engine configuration")?;

    let request: JobRequest = serde_json::from_str(
        &std::fs::read_to_string(&args.job)
            .with_context(|| format!("Cannot read job file {}", args.job.display()))?,
    )
    .context("Malformed job file")?;

    let analyses = load_analyses(&args.analyses)?;
    info!(
        "Render job {}: {} tracks, {} analyses loaded",
        request.mashup_id,
        request.track_ids.len(),
        analyses.len()
    );

    // Materialize all audio up front; the engine never touches storage
    let store = MemoryStore::new();
    stage_audio(&store, &args.audio_dir, &request)?;
    let audio = fetch_audio(&store, &request)?;

    let engine = Arc::new(RenderEngine::new());
    let handle = job::spawn_render(engine, request, config, analyses, audio);

    // Ctrl-C cancels the in-flight job; the render stops at the next
    // per-track checkpoint and the job ends in Cancelled
    let canceller = handle.canceller();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling render");
            canceller.cancel();
        }
    });

    let output = match handle.wait().await {
        Ok(output) => output,
        Err(e) => bail!("render failed: {e}"),
    };

    std::fs::write(&args.output, &output.bytes)
        .with_context(|| format!("Cannot write output {}", args.output.display()))?;
    let metrics_path = args.output.with_extension("metrics.json");
    std::fs::write(
        &metrics_path,
        serde_json::to_vec_pretty(&output.metrics).context("Cannot serialize metrics")?,
    )
    .with_context(|| format!("Cannot write metrics {}", metrics_path.display()))?;

    info!(
        "Wrote {} ({} bytes) and {}",
        args.output.display(),
        output.metrics.output_size_bytes,
        metrics_path.display()
    );
    Ok(())
}

fn load_analyses(path: &Path) -> Result<HashMap<Uuid, TrackAnalysis>> {
    let list: Vec<TrackAnalysis> = serde_json::from_str(
        &std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read analyses file {}", path.display()))?,
    )
    .context("Malformed analyses file")?;
    Ok(list.into_iter().map(|a| (a.track_id, a)).collect())
}

/// Copy every needed audio file from disk into the store
fn stage_audio(store: &MemoryStore, audio_dir: &Path, request: &JobRequest) -> Result<()> {
    let per_stem = !matches!(request.mix_mode, MixMode::Standard);
    for track_id in &request.track_ids {
        if per_stem {
            for stem in StemType::ALL {
                let name = stem_file_name(stem);
                if let Some(path) = locate(&audio_dir.join(track_id.to_string()), name) {
                    stage_file(store, &path, &stem_locator(*track_id, stem))?;
                }
                // A missing stem file stays absent; the render treats it
                // as silent
            }
        } else {
            let path = locate(audio_dir, &track_id.to_string()).with_context(|| {
                format!(
                    "No audio file for track {} under {}",
                    track_id,
                    audio_dir.display()
                )
            })?;
            stage_file(store, &path, &track_id.to_string())?;
        }
    }
    Ok(())
}

/// First existing `<dir>/<base>.<ext>` among the known extensions
fn locate(dir: &Path, base: &str) -> Option<PathBuf> {
    AUDIO_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{base}.{ext}")))
        .find(|p| p.exists())
}

fn stage_file(store: &MemoryStore, path: &Path, locator: &str) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let mime = mime_for_extension(path);
    store.put(locator, bytes, mime);
    Ok(())
}

/// Decode staged audio into engine-rate buffers, in job order
fn fetch_audio(store: &MemoryStore, request: &JobRequest) -> Result<Vec<TrackAudio>> {
    let per_stem = !matches!(request.mix_mode, MixMode::Standard);
    let mut audio = Vec::with_capacity(request.track_ids.len());
    for track_id in &request.track_ids {
        if per_stem {
            let mut set = StemSet::default();
            for stem in StemType::ALL {
                let Some(object) = store.get(&stem_locator(*track_id, stem)) else {
                    warn!("Track {} has no {:?} stem; treating as silent", track_id, stem);
                    continue;
                };
                let buffer = decode_bytes(object.bytes, extension_of(&object.mime_type))
                    .with_context(|| format!("Cannot decode {:?} stem of {}", stem, track_id))?;
                set.insert(stem, Stem::completed(buffer));
            }
            audio.push(TrackAudio::Stems(set));
        } else {
            let object = store
                .get(&track_id.to_string())
                .with_context(|| format!("Track {} missing from store", track_id))?;
            let buffer = decode_bytes(object.bytes, extension_of(&object.mime_type))
                .with_context(|| format!("Cannot decode track {}", track_id))?;
            audio.push(TrackAudio::Full(buffer));
        }
    }
    Ok(audio)
}

fn stem_locator(track_id: Uuid, stem: StemType) -> String {
    format!("{}/{}", track_id, stem_file_name(stem))
}

fn stem_file_name(stem: StemType) -> &'static str {
    match stem {
        StemType::Vocals => "vocals",
        StemType::Drums => "drums",
        StemType::Bass => "bass",
        StemType::Other => "other",
    }
}

fn mime_for_extension(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

/// Decode hint back out of the stored MIME type
fn extension_of(mime: &str) -> Option<&'static str> {
    match mime {
        "audio/wav" => Some("wav"),
        "audio/flac" => Some("flac"),
        "audio/mpeg" => Some("mp3"),
        "audio/mp4" => Some("m4a"),
        "audio/ogg" => Some("ogg"),
        _ => None,
    }
}

use crate::cancel::CancelToken;
use crate::chunker::split_paragraphs;
use crate::error::SpeechError;
use crate::generator::{generate_chunk_audio, CHUNKS_DIR};
use crate::player::AudioPlayer;
use crate::progress::{format_duration, render_bar, BAR_WIDTH};
use crate::state::{
    load_playback_state, save_chunk_meta, save_playback_state, PlaybackState, PlaybackStatus,
};
use crate::tts::SpeechClient;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct SpeakOptions {
    pub voice: String,
    pub model: String,
    pub rate: f64,
    /// Generate artifacts without playing them. The persisted state ends as
    /// `ready` with the cursor at 0, distinguishing "audio exists, unplayed"
    /// from "audio exists, partially played".
    pub generate_only: bool,
}

/// Drives the full narration lifecycle: chunk, synthesize, play, resume.
/// Sole writer of the persisted playback state. The synthesis client is
/// passed into `run` rather than held here, so resuming or querying an
/// existing narration never needs a credential.
pub struct PlaybackEngine {
    player: Arc<dyn AudioPlayer>,
}

impl PlaybackEngine {
    pub fn new(player: Arc<dyn AudioPlayer>) -> Self {
        Self { player }
    }

    /// Chunk the text, synthesize every paragraph, then play from the start
    /// unless `generate_only` is set.
    pub async fn run(
        &self,
        speech: &dyn SpeechClient,
        text: &str,
        output_dir: &Path,
        options: &SpeakOptions,
        cancel: &CancelToken,
    ) -> Result<()> {
        let chunks = split_paragraphs(text);
        if chunks.is_empty() {
            return Err(SpeechError::Input("No paragraphs found in text".to_string()).into());
        }
        let total = chunks.len();

        fs::create_dir_all(output_dir).context("Failed to create output directory")?;
        info!("Split into {} paragraphs", total);

        save_chunk_meta(output_dir, &chunks, &options.voice, &options.model)?;
        save_playback_state(
            output_dir,
            &PlaybackState::new(0, total, PlaybackStatus::Generating),
        )?;

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Generating [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("#>-"),
        );
        generate_chunk_audio(
            speech,
            &chunks,
            output_dir,
            &options.voice,
            &options.model,
            0,
            cancel,
            |done, _total| pb.set_position(done as u64),
        )
        .await?;
        pb.finish_and_clear();

        if cancel.is_cancelled() {
            info!("Generation interrupted; rerun to pick up where it left off");
            return Ok(());
        }

        if options.generate_only {
            save_playback_state(
                output_dir,
                &PlaybackState::new(0, total, PlaybackStatus::Ready),
            )?;
            info!("Generated {} audio files", total);
            return Ok(());
        }

        self.play_from(output_dir, 0, options.rate, cancel).await?;
        Ok(())
    }

    /// Play artifacts sequentially starting at `start_from`, persisting the
    /// cursor before and after every chunk. Returns the index of the first
    /// chunk NOT played (the total when playback ran to the end). A player
    /// failure or a cancellation halts the loop without advancing the
    /// persisted cursor past the affected chunk.
    pub async fn play_from(
        &self,
        output_dir: &Path,
        start_from: usize,
        rate: f64,
        cancel: &CancelToken,
    ) -> Result<usize> {
        let artifacts = list_artifacts(output_dir)?;
        let total = artifacts.len();
        if total == 0 {
            return Err(
                SpeechError::Playback("No audio artifacts found; generate first".to_string())
                    .into(),
            );
        }

        // Probed once up front; feeds only the remaining-time estimate.
        let durations: Vec<f64> = artifacts
            .iter()
            .map(|p| self.player.duration_secs(p) / rate)
            .collect();

        for i in start_from..total {
            if cancel.is_cancelled() {
                eprintln!(
                    "\nPaused at paragraph {}/{}. Resume to continue.",
                    i + 1,
                    total
                );
                return Ok(i);
            }

            save_playback_state(
                output_dir,
                &PlaybackState::new(i, total, PlaybackStatus::Playing),
            )?;

            let remaining: f64 = durations[i..].iter().sum();
            eprint!(
                "\r[{}] {}/{} | {} remaining",
                render_bar(i + 1, total, BAR_WIDTH),
                i + 1,
                total,
                format_duration(remaining)
            );
            let _ = std::io::stderr().flush();

            if let Err(e) = self.player.play(&artifacts[i], rate).await {
                eprintln!();
                warn!("Playback failed at paragraph {}: {:#}", i + 1, e);
                return Ok(i);
            }

            let status = if i + 1 < total {
                PlaybackStatus::Playing
            } else {
                PlaybackStatus::Completed
            };
            save_playback_state(output_dir, &PlaybackState::new(i + 1, total, status))?;
        }

        eprintln!(
            "\r[{}] Complete ({} paragraphs)",
            render_bar(total, total, BAR_WIDTH),
            total
        );
        Ok(total)
    }

    /// Resume from the persisted cursor. A completed run restarts from the
    /// beginning; that is a full replay, not an error.
    pub async fn resume(
        &self,
        output_dir: &Path,
        rate: f64,
        cancel: &CancelToken,
    ) -> Result<usize> {
        let state = load_playback_state(output_dir).ok_or_else(|| {
            SpeechError::Playback("No playback state found; run speak first".to_string())
        })?;

        let start = if state.status == PlaybackStatus::Completed {
            info!("Previous playback completed; starting from the beginning");
            0
        } else {
            info!(
                "Resuming from paragraph {}/{}",
                state.current_chunk + 1,
                state.total_chunks
            );
            state.current_chunk
        };

        self.play_from(output_dir, start, rate, cancel).await
    }
}

/// Non-locking point-in-time read; may observe an in-flight update, which is
/// acceptable because status is advisory only.
pub fn playback_status(output_dir: &Path) -> Option<PlaybackState> {
    load_playback_state(output_dir)
}

/// Force-stop whatever the platform player is doing.
pub fn stop_playback() {
    crate::player::default_player().stop();
}

fn list_artifacts(output_dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = output_dir.join(CHUNKS_DIR);
    let entries = fs::read_dir(&dir).map_err(|_| {
        SpeechError::Playback(format!("No chunks directory under {}", output_dir.display()))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "mp3"))
        .collect();
    files.sort();
    Ok(files)
}

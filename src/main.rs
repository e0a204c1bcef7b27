mod cancel;
mod chunker;
mod config;
mod error;
mod generator;
mod player;
mod playback;
mod progress;
mod state;
mod tts;

use anyhow::{Context, Result};
use cancel::CancelToken;
use config::Config;
use playback::{PlaybackEngine, SpeakOptions};
use std::fs;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "speak".to_string());

    // Stopping needs no configuration; it only signals the platform player.
    if mode == "stop" {
        playback::stop_playback();
        eprintln!("Playback stopped.");
        return Ok(());
    }

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please ensure 'config.yml' exists with valid settings.");
            return Err(e);
        }
    };
    config.ensure_directories()?;
    let output_dir = PathBuf::from(&config.output_folder);

    if mode == "status" {
        match playback::playback_status(&output_dir) {
            Some(s) => {
                println!("Status: {}", s.status);
                println!("Progress: {}/{}", s.current_chunk, s.total_chunks);
                println!("Last updated: {}", s.last_updated.as_deref().unwrap_or("unknown"));
            }
            None => println!("No playback state found."),
        }
        if let Some(meta) = state::load_chunk_meta(&output_dir) {
            println!("Voice: {} ({})", meta.voice, meta.model);
            println!("Generated: {}", meta.generated);
        }
        return Ok(());
    }

    // Ctrl-C flips the cancellation token; the loops check it between
    // chunks, so whatever is mid-flight finishes before the pause.
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let rate = config.playback_rate()?;
    let engine = PlaybackEngine::new(player::default_player());

    match mode.as_str() {
        // Resuming only replays existing artifacts; no credential needed.
        "resume" => {
            engine.resume(&output_dir, rate, &cancel).await?;
        }
        "speak" | "generate" => {
            let speech = tts::create_speech_client(&config)?;
            let text = fs::read_to_string(&config.input_file)
                .with_context(|| format!("Failed to read input file {}", config.input_file))?;
            let options = SpeakOptions {
                voice: config.audio.voice.clone(),
                model: config.audio.model.clone(),
                rate,
                generate_only: mode == "generate",
            };
            engine
                .run(speech.as_ref(), &text, &output_dir, &options, &cancel)
                .await?;
        }
        other => {
            eprintln!(
                "Unknown mode '{}'. Expected speak, generate, resume, status or stop.",
                other
            );
            std::process::exit(2);
        }
    }

    Ok(())
}

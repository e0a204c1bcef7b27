use crate::cancel::CancelToken;
use crate::error::SpeechError;
use crate::tts::SpeechClient;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Subdirectory of the output location holding per-paragraph artifacts.
pub const CHUNKS_DIR: &str = "chunks";

/// Artifact path for the paragraph at `index` (0-based); filenames carry a
/// zero-padded 1-based sequence number so a plain sort gives playback order.
pub fn chunk_audio_path(output_dir: &Path, index: usize) -> PathBuf {
    output_dir
        .join(CHUNKS_DIR)
        .join(format!("{:03}.mp3", index + 1))
}

/// Synthesize one artifact per paragraph, starting at `start_from`.
///
/// Artifacts already on disk are never regenerated, which makes a rerun
/// after a partial failure cheap: it skips straight to the first missing
/// chunk. The token is polled before each chunk; once cancelled, remaining
/// chunks are left for a later run. A provider error aborts the whole call
/// and keeps every artifact written so far.
#[allow(clippy::too_many_arguments)]
pub async fn generate_chunk_audio(
    client: &dyn SpeechClient,
    chunks: &[String],
    output_dir: &Path,
    voice: &str,
    model: &str,
    start_from: usize,
    cancel: &CancelToken,
    mut on_progress: impl FnMut(usize, usize),
) -> Result<()> {
    fs::create_dir_all(output_dir.join(CHUNKS_DIR))
        .context("Failed to create chunks directory")?;

    let total = chunks.len();

    for (i, chunk) in chunks.iter().enumerate() {
        if i < start_from {
            continue;
        }
        if cancel.is_cancelled() {
            debug!("Generation cancelled before paragraph {}", i + 1);
            return Ok(());
        }

        let artifact = chunk_audio_path(output_dir, i);
        if artifact.exists() {
            debug!("Paragraph {} already generated, skipping", i + 1);
            on_progress(i + 1, total);
            continue;
        }

        let audio = client
            .synthesize(chunk, voice, model)
            .await
            .map_err(|e| SpeechError::Synthesis {
                chunk: i + 1,
                message: format!("{:#}", e),
            })?;

        fs::write(&artifact, audio)
            .with_context(|| format!("Failed to write {}", artifact.display()))?;
        on_progress(i + 1, total);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    struct MockSpeechClient {
        calls: Arc<Mutex<usize>>,
        fail_on_call: Option<usize>,
    }

    impl MockSpeechClient {
        fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(0)),
                fail_on_call: None,
            }
        }
    }

    #[async_trait]
    impl SpeechClient for MockSpeechClient {
        async fn synthesize(&self, _text: &str, _voice: &str, _model: &str) -> Result<Vec<u8>> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if Some(*calls) == self.fail_on_call {
                return Err(anyhow::anyhow!("Mock TTS error"));
            }
            Ok(b"fake mp3 data".to_vec())
        }
    }

    fn chunks(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_generates_one_artifact_per_chunk() {
        let dir = tempdir().unwrap();
        let client = MockSpeechClient::new();
        let calls = client.calls.clone();

        let progress = Arc::new(Mutex::new(Vec::new()));
        let progress_ref = progress.clone();
        generate_chunk_audio(
            &client,
            &chunks(&["a", "b", "c"]),
            dir.path(),
            "nova",
            "tts-1",
            0,
            &CancelToken::new(),
            |done, total| progress_ref.lock().unwrap().push((done, total)),
        )
        .await
        .unwrap();

        assert_eq!(*calls.lock().unwrap(), 3);
        for i in 0..3 {
            assert!(chunk_audio_path(dir.path(), i).exists());
        }
        assert_eq!(*progress.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_existing_artifacts_are_skipped() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CHUNKS_DIR)).unwrap();
        fs::write(chunk_audio_path(dir.path(), 0), b"already here").unwrap();

        let client = MockSpeechClient::new();
        let calls = client.calls.clone();

        generate_chunk_audio(
            &client,
            &chunks(&["one", "two"]),
            dir.path(),
            "nova",
            "tts-1",
            0,
            &CancelToken::new(),
            |_, _| {},
        )
        .await
        .unwrap();

        // Only the missing second chunk is synthesized.
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(
            fs::read(chunk_audio_path(dir.path(), 0)).unwrap(),
            b"already here"
        );
        assert!(chunk_audio_path(dir.path(), 1).exists());
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_and_keeps_earlier_artifacts() {
        let dir = tempdir().unwrap();
        let mut client = MockSpeechClient::new();
        client.fail_on_call = Some(2);

        let result = generate_chunk_audio(
            &client,
            &chunks(&["a", "b", "c"]),
            dir.path(),
            "nova",
            "tts-1",
            0,
            &CancelToken::new(),
            |_, _| {},
        )
        .await;

        assert!(result.is_err());
        assert!(chunk_audio_path(dir.path(), 0).exists());
        assert!(!chunk_audio_path(dir.path(), 1).exists());
        assert!(!chunk_audio_path(dir.path(), 2).exists());
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_any_work() {
        let dir = tempdir().unwrap();
        let client = MockSpeechClient::new();
        let calls = client.calls.clone();

        let cancel = CancelToken::new();
        cancel.cancel();

        generate_chunk_audio(
            &client,
            &chunks(&["a", "b"]),
            dir.path(),
            "nova",
            "tts-1",
            0,
            &cancel,
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(!chunk_audio_path(dir.path(), 0).exists());
    }

    #[tokio::test]
    async fn test_start_from_skips_earlier_chunks() {
        let dir = tempdir().unwrap();
        let client = MockSpeechClient::new();
        let calls = client.calls.clone();

        generate_chunk_audio(
            &client,
            &chunks(&["a", "b", "c"]),
            dir.path(),
            "nova",
            "tts-1",
            2,
            &CancelToken::new(),
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(!chunk_audio_path(dir.path(), 0).exists());
        assert!(!chunk_audio_path(dir.path(), 1).exists());
        assert!(chunk_audio_path(dir.path(), 2).exists());
    }
}

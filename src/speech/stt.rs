//! Speech-to-text using NVIDIA Parakeet TDT.
//!
//! Uses `parakeet-rs` for batch transcription of a captured utterance.
//! Model files are fetched through hf-hub into the local cache on first use.

use crate::config::{ModelConfig, SttConfig};
use crate::error::{ChatError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use parakeet_rs::{ParakeetTDT, TimestampMode, Transcriber};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Model files required by Parakeet TDT.
const MODEL_FILES: &[&str] = &[
    "encoder-model.onnx",
    "encoder-model.onnx.data",
    "decoder_joint-model.onnx",
    "vocab.txt",
];

/// Fetches and caches STT model files via hf-hub.
pub struct ModelStore {
    cache_dir: PathBuf,
}

impl ModelStore {
    /// Create a store rooted at the configured cache directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.cache_dir)?;
        Ok(Self {
            cache_dir: config.cache_dir.clone(),
        })
    }

    /// Directory model files are cached under.
    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Ensure every file of `repo_id` in `filenames` is cached, then return
    /// the snapshot directory containing them.
    ///
    /// Already-cached files are skipped; downloads show a progress bar.
    ///
    /// # Errors
    ///
    /// Returns an error if any download fails.
    pub fn fetch_repo(&self, repo_id: &str, filenames: &[&str]) -> Result<PathBuf> {
        let api = hf_hub::api::sync::Api::new()
            .map_err(|e| ChatError::Model(format!("failed to create HF API: {e}")))?;
        let repo = api.model(repo_id.to_owned());
        let cache = hf_hub::Cache::default();

        let mut snapshot_dir = None;
        for filename in filenames {
            let path = if let Some(path) = cache.model(repo_id.to_owned()).get(filename) {
                path
            } else {
                let pb = ProgressBar::new(0);
                if let Ok(style) = ProgressStyle::with_template(
                    "  {msg} [{bar:30}] {bytes}/{total_bytes} {bytes_per_sec} ETA {eta}",
                ) {
                    pb.set_style(style);
                }
                pb.set_message(format!("{repo_id}/{filename}"));
                repo.download_with_progress(filename, pb).map_err(|e| {
                    ChatError::Model(format!("failed to download {filename} from {repo_id}: {e}"))
                })?
            };
            // hf-hub puts every file of a revision under one snapshot dir.
            snapshot_dir = path.parent().map(std::path::Path::to_path_buf);
        }

        snapshot_dir.ok_or_else(|| {
            ChatError::Model(format!("could not determine snapshot dir for {repo_id}"))
        })
    }
}

/// Speech-to-text engine for one-utterance batch transcription.
pub struct SttEngine {
    model: Option<ParakeetTDT>,
    model_id: String,
    language: String,
    store: ModelStore,
}

impl SttEngine {
    /// Create an engine instance; the model loads lazily on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cache cannot be prepared.
    pub fn new(config: &SttConfig, model_config: &ModelConfig) -> Result<Self> {
        let store = ModelStore::new(model_config)?;
        info!(
            "STT configured: model={} language={}",
            config.model_id, config.language
        );

        Ok(Self {
            model: None,
            model_id: config.model_id.clone(),
            language: config.language.clone(),
            store,
        })
    }

    /// Transcribe one utterance to text.
    ///
    /// # Errors
    ///
    /// Returns an error if model loading or transcription fails.
    pub fn transcribe(&mut self, samples: Vec<f32>, sample_rate: u32) -> Result<String> {
        if self.model.is_none() {
            self.load_model()?;
        }

        let started = Instant::now();
        let duration_s = samples.len() as f32 / sample_rate as f32;
        info!(
            "transcribing {duration_s:.1}s utterance ({} lang hint)",
            self.language
        );

        let model = self
            .model
            .as_mut()
            .ok_or_else(|| ChatError::Recognition("model not initialized".into()))?;

        let result = model
            .transcribe_samples(samples, sample_rate, 1, Some(TimestampMode::Sentences))
            .map_err(|e| ChatError::Recognition(format!("transcription failed: {e}")))?;

        info!(
            "transcribed in {:.0}ms: \"{}\"",
            started.elapsed().as_millis(),
            result.text
        );
        Ok(result.text)
    }

    /// Eagerly load the model so the first dictation does not stall.
    ///
    /// # Errors
    ///
    /// Returns an error if model loading fails.
    pub fn ensure_loaded(&mut self) -> Result<()> {
        if self.model.is_none() {
            self.load_model()?;
        }
        Ok(())
    }

    fn load_model(&mut self) -> Result<()> {
        info!("loading STT model: {}", self.model_id);
        let repo_dir = self.store.fetch_repo(&self.model_id, MODEL_FILES)?;

        let model = ParakeetTDT::from_pretrained(&repo_dir, None)
            .map_err(|e| ChatError::Recognition(format!("failed to load Parakeet TDT: {e}")))?;

        info!("STT model loaded");
        self.model = Some(model);
        Ok(())
    }
}

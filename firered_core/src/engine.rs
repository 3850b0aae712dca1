//! ONNX Runtime wrapper around the exported FireRed dialogue checkpoints.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::Tensor;

use crate::{wav, DialogueModel, DialogueRequest, Waveform, SAMPLE_RATE};

/// Which exported graph to load from the checkpoint directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Dialogue,
    Monologue,
}

impl GenerationMode {
    fn onnx_file(self) -> &'static str {
        match self {
            GenerationMode::Dialogue => "dialogue.onnx",
            GenerationMode::Monologue => "monologue.onnx",
        }
    }
}

enum Device {
    Cpu,
    Cuda(i32),
}

/// The pretrained dialogue model, loaded once at startup and shared.
///
/// ONNX Runtime sessions keep mutable scratch state across runs, so inference
/// is serialized behind a mutex.  Requests queue on it rather than running
/// the model concurrently.
pub struct FireRedEngine {
    session: Mutex<Session>,
}

impl FireRedEngine {
    /// Loads the exported graph for `mode` from a pretrained checkpoint
    /// directory.  The directory must contain `config.json` (checked against
    /// the fixed 24 kHz output rate) and the mode's `.onnx` file.
    ///
    /// `device` is `"cpu"`, `"cuda"` or `"cuda:N"`.  Requesting CUDA on a
    /// build or host without it is an error, not a silent CPU fallback.
    pub fn load(
        pretrained_dir: impl AsRef<Path>,
        mode: GenerationMode,
        device: &str,
    ) -> anyhow::Result<Self> {
        let dir = pretrained_dir.as_ref();

        let sample_rate = read_sample_rate(&dir.join("config.json"))?;
        if sample_rate != SAMPLE_RATE {
            bail!(
                "checkpoint reports {sample_rate} Hz output but this engine only supports {SAMPLE_RATE} Hz"
            );
        }

        let model_path = dir.join(mode.onnx_file());
        let builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?;
        let builder = apply_device(builder, device)?;
        let session = builder
            .commit_from_file(&model_path)
            .with_context(|| format!("failed to load model {}", model_path.display()))?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl DialogueModel for FireRedEngine {
    fn generate_dialogue(&self, request: &DialogueRequest) -> anyhow::Result<Waveform> {
        let (text_ids, text_lengths) = encode_utterances(&request.text_list);
        let (prompt_text_ids, prompt_text_lengths) = encode_utterances(&request.prompt_text_list);

        let mut prompt_samples: Vec<f32> = Vec::new();
        let mut prompt_sample_lengths: Vec<i64> = Vec::with_capacity(request.prompt_wav_list.len());
        let mut prompt_sample_rates: Vec<i64> = Vec::with_capacity(request.prompt_wav_list.len());
        for path in &request.prompt_wav_list {
            let (samples, rate) = wav::read_wav(path)
                .with_context(|| format!("failed to read reference audio {path}"))?;
            prompt_sample_lengths.push(samples.len() as i64);
            prompt_sample_rates.push(rate as i64);
            prompt_samples.extend_from_slice(&samples);
        }

        let scales = vec![request.temperature, request.topk as f32];

        let text_ids_len = text_ids.len();
        let prompt_text_ids_len = prompt_text_ids.len();
        let prompt_samples_len = prompt_samples.len();
        let inputs = vec![
            (
                "text_ids",
                Tensor::<i64>::from_array((vec![1usize, text_ids_len], text_ids.into_boxed_slice()))?
                    .into_dyn(),
            ),
            (
                "text_lengths",
                Tensor::<i64>::from_array((
                    vec![text_lengths.len()],
                    text_lengths.into_boxed_slice(),
                ))?
                .into_dyn(),
            ),
            (
                "prompt_text_ids",
                Tensor::<i64>::from_array((
                    vec![1usize, prompt_text_ids_len],
                    prompt_text_ids.into_boxed_slice(),
                ))?
                .into_dyn(),
            ),
            (
                "prompt_text_lengths",
                Tensor::<i64>::from_array((
                    vec![prompt_text_lengths.len()],
                    prompt_text_lengths.into_boxed_slice(),
                ))?
                .into_dyn(),
            ),
            (
                "prompt_samples",
                Tensor::<f32>::from_array((
                    vec![1usize, prompt_samples_len],
                    prompt_samples.into_boxed_slice(),
                ))?
                .into_dyn(),
            ),
            (
                "prompt_sample_lengths",
                Tensor::<i64>::from_array((
                    vec![prompt_sample_lengths.len()],
                    prompt_sample_lengths.into_boxed_slice(),
                ))?
                .into_dyn(),
            ),
            (
                "prompt_sample_rates",
                Tensor::<i64>::from_array((
                    vec![prompt_sample_rates.len()],
                    prompt_sample_rates.into_boxed_slice(),
                ))?
                .into_dyn(),
            ),
            (
                "scales",
                Tensor::<f32>::from_array((vec![2usize], scales.into_boxed_slice()))?.into_dyn(),
            ),
        ];

        let session = self
            .session
            .lock()
            .map_err(|_| anyhow!("model session lock poisoned"))?;
        let mut outputs = session.run(inputs)?;

        let audio = outputs
            .remove("audio")
            .context("model did not produce an 'audio' output")?;
        let (shape, data) = audio.try_extract_raw_tensor::<f32>()?;

        Ok(Waveform {
            samples: data.to_vec(),
            shape: shape.to_vec(),
        })
    }
}

fn apply_device(builder: SessionBuilder, device: &str) -> anyhow::Result<SessionBuilder> {
    match parse_device(device)? {
        Device::Cpu => Ok(builder),
        Device::Cuda(device_id) => {
            #[cfg(feature = "cuda")]
            {
                use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};

                let provider = CUDAExecutionProvider::default().with_device_id(device_id);
                if !provider.is_available()? {
                    bail!("device '{device}' requested but the CUDA execution provider is not available");
                }
                return Ok(builder.with_execution_providers([provider.build()])?);
            }
            #[cfg(not(feature = "cuda"))]
            {
                let _ = device_id;
                bail!("device '{device}' requested but this build has no CUDA support (enable the `cuda` feature)");
            }
        }
    }
}

fn parse_device(device: &str) -> anyhow::Result<Device> {
    match device {
        "cpu" => Ok(Device::Cpu),
        "cuda" => Ok(Device::Cuda(0)),
        other => match other.strip_prefix("cuda:") {
            Some(id) => {
                let id = id
                    .parse()
                    .with_context(|| format!("invalid CUDA device id in '{other}'"))?;
                Ok(Device::Cuda(id))
            }
            None => bail!("unsupported device '{other}' (expected 'cpu', 'cuda' or 'cuda:N')"),
        },
    }
}

/// Flattens utterances into one UTF-8 byte id sequence plus per-utterance
/// lengths, the layout the exported graphs take text in.
fn encode_utterances(texts: &[String]) -> (Vec<i64>, Vec<i64>) {
    let mut ids = Vec::new();
    let mut lengths = Vec::with_capacity(texts.len());
    for text in texts {
        let bytes = text.as_bytes();
        lengths.push(bytes.len() as i64);
        ids.extend(bytes.iter().map(|&b| b as i64));
    }
    (ids, lengths)
}

fn read_sample_rate(config_path: &Path) -> anyhow::Result<u32> {
    let text = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read checkpoint config {}", config_path.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).context("checkpoint config is not valid JSON")?;
    json.get("audio")
        .and_then(|audio| audio.get("sample_rate"))
        .and_then(|rate| rate.as_u64())
        .map(|rate| rate as u32)
        .ok_or_else(|| anyhow!("checkpoint config has no 'audio.sample_rate' field"))
}

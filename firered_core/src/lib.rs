mod engine;
mod script;
mod wav;

pub use engine::{FireRedEngine, GenerationMode};
pub use script::distinct_speaker_tags;
pub use wav::{encode_wav, read_wav};

use serde::Deserialize;

/// Output rate of the dialogue model family.  The exported models always
/// produce audio at this rate; `FireRedEngine::load` verifies it against the
/// checkpoint config.
pub const SAMPLE_RATE: u32 = 24_000;

/// Sampling temperature used when a request does not set one.
pub const DEFAULT_TEMPERATURE: f32 = 0.75;

/// Top-k cutoff used when a request does not set one.
pub const DEFAULT_TOPK: i64 = 20;

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_topk() -> i64 {
    DEFAULT_TOPK
}

/// A dialogue synthesis request.
///
/// `text_list` holds the target script, one utterance per entry, each prefixed
/// with a speaker tag such as `[S1]`.  `prompt_wav_list` and `prompt_text_list`
/// carry the reference audio paths and their transcripts used for voice
/// cloning, aligned by index.  No cross-field consistency is enforced here;
/// the model surfaces mismatches as synthesis errors.
#[derive(Debug, Clone, Deserialize)]
pub struct DialogueRequest {
    pub text_list: Vec<String>,
    pub prompt_wav_list: Vec<String>,
    pub prompt_text_list: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_topk")]
    pub topk: i64,
}

/// Raw model output: mono samples in `[-1.0, 1.0]` plus the tensor shape
/// reported by the runtime, kept verbatim so callers can echo it back.
#[derive(Debug, Clone)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub shape: Vec<i64>,
}

/// Anything that can turn a dialogue request into audio.  The HTTP layer only
/// depends on this trait, so tests can substitute a recording double for the
/// real ONNX engine.
pub trait DialogueModel: Send + Sync {
    fn generate_dialogue(&self, request: &DialogueRequest) -> anyhow::Result<Waveform>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_sampling_defaults_apply() {
        let req: DialogueRequest = serde_json::from_str(
            r#"{
                "text_list": ["[S1]Hello."],
                "prompt_wav_list": ["a.wav"],
                "prompt_text_list": ["[S1]Reference."]
            }"#,
        )
        .unwrap();
        assert_eq!(req.temperature, 0.75);
        assert_eq!(req.topk, 20);
    }

    #[test]
    fn request_explicit_sampling_values_kept() {
        let req: DialogueRequest = serde_json::from_str(
            r#"{
                "text_list": ["[S1]Hello."],
                "prompt_wav_list": ["a.wav"],
                "prompt_text_list": ["[S1]Reference."],
                "temperature": 0.9,
                "topk": 5
            }"#,
        )
        .unwrap();
        assert_eq!(req.temperature, 0.9);
        assert_eq!(req.topk, 5);
    }

    #[test]
    fn request_reference_lists_are_required() {
        let result = serde_json::from_str::<DialogueRequest>(r#"{"text_list": ["[S1]Hi."]}"#);
        assert!(result.is_err());
    }
}

//! Common utilities for the service integration tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use firered_core::{DialogueModel, DialogueRequest, Waveform};
use server::config::ServerConfig;
use server::AppState;

/// One recorded model invocation.  `prompt_files` holds the bytes of each
/// reference audio path as they were readable at call time, so tests can
/// check that uploads hit disk before the model ran.
pub struct RecordedCall {
    pub request: DialogueRequest,
    pub prompt_files: Vec<Option<Vec<u8>>>,
}

/// A `DialogueModel` double that records calls instead of running ONNX.
pub struct MockModel {
    pub calls: Mutex<Vec<RecordedCall>>,
    pub shape: Vec<i64>,
    pub fail: bool,
}

impl MockModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            shape: vec![1, 1, 4800],
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            shape: vec![1, 1, 4800],
            fail: true,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl DialogueModel for MockModel {
    fn generate_dialogue(&self, request: &DialogueRequest) -> anyhow::Result<Waveform> {
        let prompt_files = request
            .prompt_wav_list
            .iter()
            .map(|path| std::fs::read(path).ok())
            .collect();
        self.calls.lock().unwrap().push(RecordedCall {
            request: request.clone(),
            prompt_files,
        });

        if self.fail {
            anyhow::bail!("model exploded");
        }
        let sample_count: i64 = self.shape.iter().product();
        Ok(Waveform {
            samples: vec![0.1; sample_count as usize],
            shape: self.shape.clone(),
        })
    }
}

/// State wired to the mock model, with the upload and scan roots pointed at
/// test-owned directories.
pub fn test_state(model: Arc<MockModel>, upload_dir: &Path, scan_dir: &Path) -> AppState {
    let config = ServerConfig {
        upload_dir: upload_dir.to_path_buf(),
        prompt_scan_dir: scan_dir.to_path_buf(),
        ..ServerConfig::default()
    };
    AppState { model, config }
}

pub const BOUNDARY: &str = "test-boundary-5fa39ec0";

/// Hand-rolled multipart/form-data body builder.
pub struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                .as_bytes(),
        );
        self.bytes.extend_from_slice(value.as_bytes());
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, filename: &str, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: audio/wav\r\n\r\n"
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    /// Returns the content-type header value and the finished body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.bytes
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (
            format!("multipart/form-data; boundary={BOUNDARY}"),
            self.bytes,
        )
    }
}

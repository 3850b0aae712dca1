// Environment-driven configuration shared by the shape and stream services.

use std::env;
use std::path::PathBuf;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Directory holding the pretrained checkpoint (config.json plus the
    /// exported .onnx graphs).
    pub model_dir: PathBuf,
    /// Inference device: "cpu", "cuda" or "cuda:N".
    pub device: String,
    /// Where uploaded reference audio is persisted.
    pub upload_dir: PathBuf,
    /// Root scanned for fallback reference audio when none is uploaded.
    pub prompt_scan_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_dir: PathBuf::from("/root/FireRedTTS2/pretrained_models/FireRedTTS2"),
            device: "cuda".to_string(),
            upload_dir: env::temp_dir(),
            prompt_scan_dir: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    /// Builds a config from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.port),
            model_dir: env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            device: env::var("DEVICE").unwrap_or(defaults.device),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            prompt_scan_dir: env::var("PROMPT_SCAN_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.prompt_scan_dir),
        }
    }

    /// `host:port` string for the TCP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_layout() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.device, "cuda");
        assert_eq!(
            config.model_dir,
            PathBuf::from("/root/FireRedTTS2/pretrained_models/FireRedTTS2")
        );
        assert_eq!(config.prompt_scan_dir, PathBuf::from("."));
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let config = ServerConfig {
            port: 9000,
            ..Default::default()
        };
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    }
}

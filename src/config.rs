use std::{net::SocketAddr, path::Path, sync::LazyLock};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::media::types::{CodecType, MediaType};

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "REMOTE_MEDIA_CONFIG";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session_name: String,
    pub api_addr: String,
    pub streams: Vec<StreamConfig>,
}

/// A remote stream announced by the transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub media_type: MediaType,
    pub codec: CodecType,
    pub stream_id: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session_name: "transport".to_string(),
            api_addr: "0.0.0.0:8080".to_string(),
            streams: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: AppConfig = serde_json::from_str(json).context("parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Loads the file named by [`CONFIG_ENV`], or the defaults when it is unset.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn api_addr(&self) -> anyhow::Result<SocketAddr> {
        self.api_addr
            .parse()
            .with_context(|| format!("invalid api_addr '{}'", self.api_addr))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.api_addr()?;
        for stream in &self.streams {
            stream.validate()?;
        }
        Ok(())
    }
}

impl StreamConfig {
    pub fn new(media_type: MediaType, codec: CodecType, stream_id: u32) -> Self {
        Self {
            media_type,
            codec,
            stream_id,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.media_type == MediaType::Unknown {
            anyhow::bail!("stream {}: media type must be audio or video", self.stream_id);
        }
        if self.codec.media_type() != self.media_type {
            anyhow::bail!(
                "stream {}: codec {} does not carry {}",
                self.stream_id,
                self.codec,
                self.media_type
            );
        }
        Ok(())
    }
}

pub fn config() -> &'static AppConfig {
    static CONFIG: LazyLock<AppConfig> = LazyLock::new(|| {
        AppConfig::from_env().unwrap_or_else(|e| {
            log::error!("Error loading config, using defaults: {:#}", e);
            AppConfig::default()
        })
    });
    &CONFIG
}

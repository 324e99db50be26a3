use serde::{Deserialize, Serialize};

use sealstream_crypto::{StreamOptions, CHUNK_SIZE, MAX_CHUNK_SIZE};

use crate::error::{SealError, SealResult};

/// Top-level configuration (loaded from sealstream.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SealConfig {
    pub stream: StreamConfig,
    pub output: OutputConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Plaintext bytes per chunk (default: 4096). Both sides must agree.
    pub chunk_size: usize,
    /// Mark every Nth chunk for rekeying (0 = never)
    pub rekey_interval: u64,
}

/// File names written next to the input by `sealstream run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub encrypted_name: String,
    pub decrypted_name: String,
    pub key_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            rekey_interval: 0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            encrypted_name: "encrypted".into(),
            decrypted_name: "decrypted".into(),
            key_name: "key".into(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl SealConfig {
    /// Reject values the stream layer or path resolution cannot use.
    pub fn validate(&self) -> SealResult<()> {
        if self.stream.chunk_size == 0 || self.stream.chunk_size > MAX_CHUNK_SIZE {
            return Err(SealError::Config(format!(
                "stream.chunk_size must be between 1 and {MAX_CHUNK_SIZE}, got {}",
                self.stream.chunk_size
            )));
        }

        let names = [
            ("output.encrypted_name", &self.output.encrypted_name),
            ("output.decrypted_name", &self.output.decrypted_name),
            ("output.key_name", &self.output.key_name),
        ];
        for (field, name) in names {
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(SealError::Config(format!(
                    "{field} must be a plain file name, got {name:?}"
                )));
            }
        }
        let distinct = [
            &self.output.encrypted_name,
            &self.output.decrypted_name,
            &self.output.key_name,
        ];
        if distinct[0] == distinct[1] || distinct[0] == distinct[2] || distinct[1] == distinct[2] {
            return Err(SealError::Config("output file names must be distinct".into()));
        }

        match self.log.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(SealError::Config(format!(
                "log.format must be \"json\" or \"text\", got {other:?}"
            ))),
        }
    }

    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            chunk_size: self.stream.chunk_size,
            rekey_interval: self.stream.rekey_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[stream]
chunk_size = 65536
rekey_interval = 1024

[output]
encrypted_name = "data.sealed"
decrypted_name = "data.out"
key_name = "data.key"

[log]
level = "debug"
format = "json"
"#;
        let config: SealConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.stream.chunk_size, 65536);
        assert_eq!(config.stream.rekey_interval, 1024);
        assert_eq!(config.output.encrypted_name, "data.sealed");
        assert_eq!(config.output.key_name, "data.key");
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_defaults() {
        let config: SealConfig = toml::from_str("").unwrap();

        assert_eq!(config.stream.chunk_size, 4096);
        assert_eq!(config.stream.rekey_interval, 0);
        assert_eq!(config.output.encrypted_name, "encrypted");
        assert_eq!(config.output.decrypted_name, "decrypted");
        assert_eq!(config.output.key_name, "key");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.stream_options(), StreamOptions::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[stream]
chunk_size = 1024
"#;
        let config: SealConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.stream.chunk_size, 1024);
        // Defaults
        assert_eq!(config.stream.rekey_interval, 0);
        assert_eq!(config.output.key_name, "key");
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = SealConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: SealConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_validate_rejects_bad_chunk_size() {
        let mut config = SealConfig::default();
        config.stream.chunk_size = 0;
        assert!(matches!(config.validate(), Err(SealError::Config(_))));

        config.stream.chunk_size = MAX_CHUNK_SIZE + 1;
        assert!(matches!(config.validate(), Err(SealError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_path_names() {
        let mut config = SealConfig::default();
        config.output.key_name = "../key".into();
        assert!(matches!(config.validate(), Err(SealError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_clashing_names() {
        let mut config = SealConfig::default();
        config.output.decrypted_name = "encrypted".into();
        assert!(matches!(config.validate(), Err(SealError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = SealConfig::default();
        config.log.format = "xml".into();
        assert!(matches!(config.validate(), Err(SealError::Config(_))));
    }
}

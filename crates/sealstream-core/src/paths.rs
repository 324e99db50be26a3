//! Sibling output paths for a single input file

use std::path::{Path, PathBuf};

use crate::config::OutputConfig;
use crate::error::{SealError, SealResult};

/// Where `sealstream run` writes its three outputs: next to the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub encrypted: PathBuf,
    pub decrypted: PathBuf,
    pub key: PathBuf,
}

impl OutputPaths {
    /// Resolve the outputs for `input`, which must be an existing regular
    /// file. An input with no directory component resolves against `.`.
    pub fn for_input(input: &Path, names: &OutputConfig) -> SealResult<Self> {
        let meta = std::fs::metadata(input)
            .map_err(|e| SealError::Input(format!("{}: {e}", input.display())))?;
        if !meta.is_file() {
            return Err(SealError::Input(format!(
                "{} is not a regular file",
                input.display()
            )));
        }

        let dir = match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        if let Some(file_name) = input.file_name() {
            for name in [&names.encrypted_name, &names.decrypted_name, &names.key_name] {
                if file_name == name.as_str() {
                    return Err(SealError::Input(format!(
                        "input {} would be overwritten by output {name:?}",
                        input.display()
                    )));
                }
            }
        }

        Ok(Self {
            encrypted: dir.join(&names.encrypted_name),
            decrypted: dir.join(&names.decrypted_name),
            key: dir.join(&names.key_name),
        })
    }
}

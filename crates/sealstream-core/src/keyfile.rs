//! Raw key-file persistence: the 32 key bytes, nothing else

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tracing::debug;
use zeroize::Zeroize;

use sealstream_crypto::KeyMaterial;

use crate::error::{SealError, SealResult};

/// Write `key` to `path`, creating or truncating it. Owner-only on Unix.
pub fn save_key(path: &Path, key: &KeyMaterial) -> SealResult<()> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }

    let mut file = opts
        .open(path)
        .map_err(|e| SealError::KeyFile(format!("{}: {e}", path.display())))?;

    // mode() only applies to newly created files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(key.as_bytes())
        .map_err(|e| SealError::KeyFile(format!("writing {}: {e}", path.display())))?;
    file.sync_all()?;

    debug!(path = %path.display(), "key saved");
    Ok(())
}

/// Read a key written by [`save_key`].
pub fn load_key(path: &Path) -> SealResult<KeyMaterial> {
    let mut bytes = std::fs::read(path)
        .map_err(|e| SealError::KeyFile(format!("{}: {e}", path.display())))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            let mode = meta.permissions().mode();
            if mode & 0o077 != 0 {
                tracing::warn!(
                    path = %path.display(),
                    mode = %format!("{:o}", mode & 0o777),
                    "key file is readable by other users"
                );
            }
        }
    }

    let key = KeyMaterial::try_from_slice(&bytes);
    bytes.zeroize();
    key.map_err(|e| SealError::KeyFile(format!("{}: {e}", path.display())))
}

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::{IoError, IoResult};

/// Serialize a model to a JSON file, creating parent directories.
pub fn save_json<M: Serialize, P: AsRef<Path>>(model: &M, path: P) -> IoResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IoError::io(parent, e))?;
    }
    let json = serde_json::to_string(model)?;
    fs::write(path, &json).map_err(|e| IoError::io(path, e))?;
    info!(path = %path.display(), bytes = json.len(), "saved model");
    Ok(())
}

/// Load a model written by [`save_json`].
pub fn load_json<M: DeserializeOwned, P: AsRef<Path>>(path: P) -> IoResult<M> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|e| IoError::io(path, e))?;
    Ok(serde_json::from_str(&json)?)
}

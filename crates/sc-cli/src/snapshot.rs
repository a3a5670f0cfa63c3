//! The persisted in-memory scene and its identity index.

use std::path::{Path, PathBuf};

use sc_engine::{IdentityIndex, MemoryScene};
use serde::{Deserialize, Serialize};

/// Snapshot file name inside the output folder.
pub const SNAPSHOT_FILE: &str = "scene.snapshot.json";

/// A scene together with the index tying its objects to game items.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub scene: MemoryScene,
    pub index: IdentityIndex,
}

impl Snapshot {
    pub fn path(output: &Path) -> PathBuf {
        output.join(SNAPSHOT_FILE)
    }

    pub fn load(output: &Path) -> Result<Self, String> {
        let path = Self::path(output);
        if !path.is_file() {
            return Err(format!(
                "no scene snapshot at {}, run build first",
                path.display()
            ));
        }
        let json = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        serde_json::from_str(&json).map_err(|e| format!("corrupt snapshot {}: {e}", path.display()))
    }

    pub fn save(&self, output: &Path) -> Result<PathBuf, String> {
        std::fs::create_dir_all(output)
            .map_err(|e| format!("cannot create {}: {e}", output.display()))?;
        let path = Self::path(output);
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(&path, json).map_err(|e| format!("cannot write {}: {e}", path.display()))?;
        log::info!("snapshot written to {}", path.display());
        Ok(path)
    }
}

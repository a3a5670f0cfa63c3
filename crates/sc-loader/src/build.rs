//! Build documents: per-character configuration keyed by build id.

use std::path::Path;

use sc_core::BuildDocument;
use serde_json::{Map, Value as Json};

use crate::error::{LoadError, LoadResult};

/// Parse a build document.
///
/// The document must be a JSON object. `avatar` is kept only when it is an
/// object; a non-array `npcs` is logged and treated as empty.
pub fn load_build(json: &str) -> LoadResult<BuildDocument> {
    let mut root: Map<String, Json> =
        serde_json::from_str(json).map_err(|e| LoadError::json("build", e))?;

    let avatar = root.remove("avatar").filter(Json::is_object);
    let npcs = match root.remove("npcs") {
        Some(Json::Array(entries)) => entries
            .into_iter()
            .filter(|entry| {
                let keep = entry.is_object();
                if !keep {
                    log::warn!("ignoring non-object npc entry {entry}");
                }
                keep
            })
            .collect(),
        Some(other) => {
            log::warn!("ignoring build npcs of unexpected shape: {other}");
            Vec::new()
        }
        None => Vec::new(),
    };

    let document = BuildDocument { avatar, npcs };
    log::info!("loaded build document with {} entries", document.len());
    Ok(document)
}

/// Read and parse a build document from disk.
pub fn load_build_file(path: &Path) -> LoadResult<BuildDocument> {
    let json = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    load_build(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILD: &str = r#"{
        "avatar": { "id": "player-1", "outfit": "coat" },
        "npcs": [
            { "id": "npc-7", "outfit": "apron" },
            { "id": "npc-8", "outfit": "hat" },
            "stray"
        ]
    }"#;

    #[test]
    fn avatar_resolves_by_id() {
        let build = load_build(BUILD).unwrap();
        assert_eq!(build.entry("player-1").unwrap()["outfit"], "coat");
    }

    #[test]
    fn npc_resolves_by_id() {
        let build = load_build(BUILD).unwrap();
        assert_eq!(build.entry("npc-8").unwrap()["outfit"], "hat");
        assert_eq!(build.npcs.len(), 2);
    }

    #[test]
    fn unknown_build_id_is_none() {
        let build = load_build(BUILD).unwrap();
        assert!(build.entry("npc-99").is_none());
        assert!(build.entry("").is_none());
    }

    #[test]
    fn missing_sections_give_an_empty_document() {
        let build = load_build(r#"{ "avatar": "none", "npcs": {} }"#).unwrap();
        assert!(build.is_empty());
    }

    #[test]
    fn invalid_json_names_the_document() {
        let err = load_build("{ nope").unwrap_err();
        assert!(matches!(err, LoadError::Json { document: "build", .. }));
        assert!(matches!(load_build("[]").unwrap_err(), LoadError::Json { .. }));
    }

    #[test]
    fn load_build_file_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_build_file(&dir.path().join("build.json")).unwrap_err();
        assert!(err.to_string().contains("build.json"));
    }
}

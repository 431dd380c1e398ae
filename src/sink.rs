use std::path::Path;

use anyhow::Context as _;
use serde::Serialize;

/// Write an artifact via temp sibling + atomic rename.
///
/// Consumers tail these files between cycles, so a half-written artifact
/// is worse than a stale one. The previous artifact stays readable until
/// the rename lands.
pub fn write_json_atomic<T: Serialize>(path: &Path, payload: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
    }

    let json = serde_json::to_vec_pretty(payload)
        .with_context(|| format!("serialize {}", path.display()))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Sample {
        count: usize,
        label: String,
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "harpoon_sink_test_{tag}_{}_{}",
            std::process::id(),
            crate::clock::now_ms()
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn writes_readable_json_and_leaves_no_temp_file() {
        let dir = temp_dir("write");
        let path = dir.join("artifact.json");

        let payload = Sample {
            count: 3,
            label: "ok".to_string(),
        };
        write_json_atomic(&path, &payload).expect("write artifact");

        let raw = std::fs::read(&path).expect("read artifact");
        let back: Sample = serde_json::from_slice(&raw).expect("decode artifact");
        assert_eq!(back, payload);
        assert!(!dir.join("artifact.json.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn replaces_previous_artifact_in_place() {
        let dir = temp_dir("replace");
        let path = dir.join("artifact.json");

        write_json_atomic(
            &path,
            &Sample {
                count: 1,
                label: "old".to_string(),
            },
        )
        .expect("first write");
        write_json_atomic(
            &path,
            &Sample {
                count: 2,
                label: "new".to_string(),
            },
        )
        .expect("second write");

        let raw = std::fs::read(&path).expect("read artifact");
        let back: Sample = serde_json::from_slice(&raw).expect("decode artifact");
        assert_eq!(back.label, "new");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn creates_missing_parent_dirs() {
        let dir = temp_dir("mkdir");
        let path = dir.join("nested").join("deep").join("artifact.json");

        write_json_atomic(
            &path,
            &Sample {
                count: 0,
                label: String::new(),
            },
        )
        .expect("write into missing dirs");
        assert!(path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}

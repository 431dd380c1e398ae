use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::schema::FILE_RUN_META_JSON;

/// Written once at daemon start, never mutated afterwards. Consumers
/// use it to tell which process produced the artifacts in a data dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub schema_version: String,
    pub pkg_version: String,
    pub git_sha: String,
    pub pid: u32,
    pub start_ts_unix_ms: u64,
    pub config_path: String,
    pub data_dir: String,
}

impl RunMeta {
    pub fn write_to_dir(&self, run_dir: &Path) -> anyhow::Result<()> {
        let out_path = run_dir.join(FILE_RUN_META_JSON);
        let json = serde_json::to_vec_pretty(self).context("serialize run_meta.json")?;
        std::fs::write(&out_path, json).with_context(|| format!("write {}", out_path.display()))?;
        Ok(())
    }

    pub fn read_from_dir(run_dir: &Path) -> anyhow::Result<Self> {
        let path = run_dir.join(FILE_RUN_META_JSON);
        let raw = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_slice(&raw).context("decode run_meta.json")
    }
}

pub fn env_git_sha() -> String {
    std::env::var("GIT_SHA").unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "harpoon_run_meta_test_{}_{}",
            std::process::id(),
            crate::clock::now_ms()
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn meta_round_trips_through_the_run_dir() {
        let dir = temp_dir();
        let meta = RunMeta {
            run_id: "run_1756080000000".to_string(),
            schema_version: "v1.0.0".to_string(),
            pkg_version: "0.4.1".to_string(),
            git_sha: "unknown".to_string(),
            pid: 4242,
            start_ts_unix_ms: 1_756_080_000_000,
            config_path: "config/config.toml".to_string(),
            data_dir: dir.display().to_string(),
        };
        meta.write_to_dir(&dir).expect("write");

        let back = RunMeta::read_from_dir(&dir).expect("read");
        assert_eq!(back.run_id, meta.run_id);
        assert_eq!(back.pid, 4242);
        assert_eq!(back.start_ts_unix_ms, meta.start_ts_unix_ms);

        let _ = std::fs::remove_dir_all(&dir);
    }
}

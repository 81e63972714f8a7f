use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ProxyPolicy;
use crate::error::{ProxyError, ProxyResult};

/// Stable network identifier → recorded policy. Sorted so that rewriting an
/// unchanged map produces identical bytes.
pub type PolicyMap = BTreeMap<String, ProxyPolicy>;

/// The JSON file holding every per-network decision.
///
/// Nothing is cached: callers load, mutate and save the whole map.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    path: PathBuf,
}

impl PolicyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full map. A missing file is an empty map; anything that is not
    /// a JSON object of `null`/string values is `StoreCorrupt`.
    pub fn load(&self) -> ProxyResult<PolicyMap> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Policy store does not exist yet");
                return Ok(PolicyMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&raw).map_err(|source| ProxyError::StoreCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Rewrite the whole map. The file is replaced by renaming a fully written
    /// sibling, so readers see either the old or the new contents.
    pub fn save(&self, policies: &PolicyMap) -> ProxyResult<()> {
        let mut json = serde_json::to_string_pretty(policies)?;
        json.push('\n');
        atomic_write(&self.path, json.as_bytes())?;
        debug!(path = %self.path.display(), entries = policies.len(), "Policy store saved");
        Ok(())
    }

    /// Drop one entry. Returns the policy that was recorded, if any.
    pub fn forget(&self, stable_id: &str) -> ProxyResult<Option<ProxyPolicy>> {
        let mut policies = self.load()?;
        let removed = policies.remove(stable_id);
        if removed.is_some() {
            self.save(&policies)?;
        }
        Ok(removed)
    }
}

/// Recorded policy for `stable_id`, or `NoPolicyRecorded` on a miss.
pub fn lookup(policies: &PolicyMap, stable_id: &str) -> ProxyPolicy {
    policies
        .get(stable_id)
        .cloned()
        .unwrap_or(ProxyPolicy::NoPolicyRecorded)
}

fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    // Same directory keeps the rename on one filesystem
    let temp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("policies"),
        std::process::id()
    ));

    let written = File::create(&temp_path).and_then(|file| {
        let mut writer = BufWriter::new(file);
        writer.write_all(data)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    });

    if let Err(e) = written.and_then(|()| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}

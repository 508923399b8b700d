//! Enrolled voiceprints and their on-disk store
//!
//! File layout (JSON, schema version 1):
//!
//! ```json
//! {
//!   "version": 1,
//!   "voiceprints": {
//!     "alice": { "dims": 40, "features": [-312.4, 81.9, ...], "samples": 3,
//!                "enrolled_at": "2026-01-05T10:12:44+01:00" }
//!   }
//! }
//! ```
//!
//! `dims` must equal the length of `features`. Floats are written in shortest
//! round-trip form and parsed back bit-exact.

use crate::dsp::FeatureVector;
use crate::error::{VoiceError, VoiceResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

pub const SCHEMA_VERSION: u32 = 1;

/// A user's enrolled template
#[derive(Debug, Clone, PartialEq)]
pub struct Voiceprint {
    pub user_id: String,
    pub features: FeatureVector,
    /// Number of samples averaged into `features`
    pub samples: usize,
    /// RFC 3339 timestamp
    pub enrolled_at: String,
}

/// All enrolled users, keyed by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceprintDatabase {
    entries: HashMap<String, Voiceprint>,
}

impl VoiceprintDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &str) -> Option<&Voiceprint> {
        self.entries.get(user_id)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.contains_key(user_id)
    }

    /// Insert or overwrite, returning the previous enrollment
    pub fn insert(&mut self, voiceprint: Voiceprint) -> Option<Voiceprint> {
        self.entries.insert(voiceprint.user_id.clone(), voiceprint)
    }

    pub fn remove(&mut self, user_id: &str) -> Option<Voiceprint> {
        self.entries.remove(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voiceprint> {
        self.entries.values()
    }

    /// Sorted user ids
    pub fn user_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    voiceprints: BTreeMap<String, StoredVoiceprint>,
}

#[derive(Serialize, Deserialize)]
struct StoredVoiceprint {
    dims: usize,
    features: FeatureVector,
    samples: usize,
    enrolled_at: String,
}

/// Loads and atomically saves the voiceprint database. Saves are serialized.
#[derive(Debug)]
pub struct VoiceprintStore {
    path: PathBuf,
    writer: Mutex<()>,
}

impl VoiceprintStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Empty database if the file does not exist; `Persistence` if it cannot be read
    pub fn load(&self) -> VoiceResult<VoiceprintDatabase> {
        if !self.path.exists() {
            info!(
                "📂 No voiceprint store at {}, starting empty",
                self.path.display()
            );
            return Ok(VoiceprintDatabase::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| self.corrupt(e))?;
        let file: StoreFile = serde_json::from_str(&content).map_err(|e| self.corrupt(e))?;
        if file.version != SCHEMA_VERSION {
            return Err(self.corrupt(format!(
                "unsupported schema version {} (expected {})",
                file.version, SCHEMA_VERSION
            )));
        }

        let mut db = VoiceprintDatabase::new();
        for (user_id, stored) in file.voiceprints {
            if user_id.is_empty() {
                return Err(self.corrupt("entry with empty user id"));
            }
            if stored.dims != stored.features.dims() {
                return Err(self.corrupt(format!(
                    "'{}' declares {} dims but holds {}",
                    user_id,
                    stored.dims,
                    stored.features.dims()
                )));
            }
            db.insert(Voiceprint {
                user_id,
                features: stored.features,
                samples: stored.samples,
                enrolled_at: stored.enrolled_at,
            });
        }

        info!(
            "📂 Loaded {} voiceprint(s) from {}",
            db.len(),
            self.path.display()
        );
        Ok(db)
    }

    /// Write to a temp file, flush it to disk, then rename over the store
    pub fn save(&self, db: &VoiceprintDatabase) -> VoiceResult<()> {
        let _writer = self.writer.lock()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = StoreFile {
            version: SCHEMA_VERSION,
            voiceprints: db
                .iter()
                .map(|vp| {
                    (
                        vp.user_id.clone(),
                        StoredVoiceprint {
                            dims: vp.features.dims(),
                            features: vp.features.clone(),
                            samples: vp.samples,
                            enrolled_at: vp.enrolled_at.clone(),
                        },
                    )
                })
                .collect(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        let temp_file = self.temp_path();
        {
            let mut out = File::create(&temp_file)?;
            out.write_all(content.as_bytes())?;
            out.sync_all()?;
        }
        fs::rename(&temp_file, &self.path)?;

        debug!("Wrote {} bytes to {}", content.len(), self.path.display());
        info!(
            "💾 Saved {} voiceprint(s) to {}",
            db.len(),
            self.path.display()
        );
        Ok(())
    }

    /// `<file name>.tmp` next to the store; never the store itself
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "voiceprints".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn corrupt(&self, reason: impl ToString) -> VoiceError {
        VoiceError::Persistence {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

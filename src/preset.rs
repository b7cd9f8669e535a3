//! Named FX presets
//!
//! A preset freezes the vocal and harmony processing (EQ plus send levels)
//! and the three channel faders into one flat JSON record. Records live in a
//! directory-backed key-value store, one file per preset, keyed by a
//! generated id. There is no schema versioning: a record that fails to
//! parse is treated as absent.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dsp::eq::EqSettings;
use crate::error::Result;
use crate::session::{SendLevels, Session, TrackRole};

/// One saved FX configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxPreset {
    pub name: String,
    pub vocal_eq: EqSettings,
    pub vocal_sends: SendLevels,
    pub harmony_eq: EqSettings,
    pub harmony_sends: SendLevels,
    pub instrumental_volume: f32,
    pub vocal_volume: f32,
    pub harmony_volume: f32,
    pub created_at: DateTime<Utc>,
}

impl FxPreset {
    /// Freeze the session's current FX state under a name
    ///
    /// Roles absent from the session fall back to their defaults so the
    /// record stays complete.
    pub fn capture(name: impl Into<String>, session: &Session) -> Self {
        let snapshot = |role: TrackRole| {
            session
                .track_id_by_role(role)
                .and_then(|id| session.track(id))
                .map(|track| (track.eq.clone(), track.sends, track.volume))
                .unwrap_or((EqSettings::default(), SendLevels::default(), 1.0))
        };
        let (vocal_eq, vocal_sends, vocal_volume) = snapshot(TrackRole::LeadVocal);
        let (harmony_eq, harmony_sends, harmony_volume) = snapshot(TrackRole::Harmony);
        let (_, _, instrumental_volume) = snapshot(TrackRole::Instrumental);
        Self {
            name: name.into(),
            vocal_eq,
            vocal_sends,
            harmony_eq,
            harmony_sends,
            instrumental_volume,
            vocal_volume,
            harmony_volume,
            created_at: Utc::now(),
        }
    }

    /// Push this preset's parameters onto the session
    ///
    /// Roles the session does not currently have are skipped.
    pub fn apply(&self, session: &mut Session) -> Result<()> {
        if let Some(id) = session.track_id_by_role(TrackRole::LeadVocal) {
            session.set_eq(id, self.vocal_eq.clone())?;
            session.set_sends(id, self.vocal_sends)?;
            session.set_volume(id, self.vocal_volume)?;
        }
        if let Some(id) = session.track_id_by_role(TrackRole::Harmony) {
            session.set_eq(id, self.harmony_eq.clone())?;
            session.set_sends(id, self.harmony_sends)?;
            session.set_volume(id, self.harmony_volume)?;
        }
        if let Some(id) = session.track_id_by_role(TrackRole::Instrumental) {
            session.set_volume(id, self.instrumental_volume)?;
        }
        Ok(())
    }
}

/// Directory-backed preset storage, one JSON file per record
#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Persist a preset under a freshly generated key
    pub fn save(&self, preset: &FxPreset) -> Result<String> {
        let key = Uuid::new_v4().to_string();
        let json = serde_json::to_string_pretty(preset)?;
        fs::write(self.record_path(&key), json)?;
        debug!(key = %key, name = %preset.name, "preset saved");
        Ok(key)
    }

    /// Load a preset by key
    ///
    /// Missing and unparsable records both come back as `None`.
    pub fn load(&self, key: &str) -> Option<FxPreset> {
        let path = self.record_path(key);
        let json = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&json) {
            Ok(preset) => Some(preset),
            Err(err) => {
                warn!(key = %key, error = %err, "discarding unreadable preset record");
                None
            }
        }
    }

    /// All readable presets in the store, newest first
    pub fn list(&self) -> Result<Vec<(String, FxPreset)>> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if let Some(preset) = self.load(key) {
                records.push((key.to_string(), preset));
            }
        }
        records.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(records)
    }

    /// Remove a preset; deleting an absent key is not an error
    pub fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::eq::ThreeBandEq;
    use crate::engine::context::ContextConfig;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_preset(name: &str) -> FxPreset {
        FxPreset {
            name: name.to_string(),
            vocal_eq: EqSettings::ThreeBand(ThreeBandEq::new(2.0, -1.5, 3.0)),
            vocal_sends: SendLevels {
                reverb_mix: 0.25,
                delay_mix: 0.1,
            },
            harmony_eq: EqSettings::default(),
            harmony_sends: SendLevels::default(),
            instrumental_volume: 0.8,
            vocal_volume: 1.0,
            harmony_volume: 0.6,
            created_at: Utc::now(),
        }
    }

    fn test_session() -> Session {
        Session::new(ContextConfig {
            sample_rate: 8000,
            num_channels: 1,
            ir_duration_secs: 0.05,
            ..ContextConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = PresetStore::new(dir.path()).unwrap();
        let preset = sample_preset("warm vocal");
        let key = store.save(&preset).unwrap();
        let loaded = store.load(&key).unwrap();
        assert_eq!(loaded, preset);
    }

    #[test]
    fn test_missing_key_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = PresetStore::new(dir.path()).unwrap();
        assert!(store.load("no-such-key").is_none());
    }

    #[test]
    fn test_corrupt_record_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = PresetStore::new(dir.path()).unwrap();
        let key = store.save(&sample_preset("ok")).unwrap();
        fs::write(dir.path().join(format!("{key}.json")), "{not json").unwrap();
        assert!(store.load(&key).is_none());
    }

    #[test]
    fn test_list_skips_unreadable_records() {
        let dir = TempDir::new().unwrap();
        let store = PresetStore::new(dir.path()).unwrap();
        store.save(&sample_preset("a")).unwrap();
        store.save(&sample_preset("b")).unwrap();
        fs::write(dir.path().join("broken.json"), "[]").unwrap();
        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_delete_then_absent() {
        let dir = TempDir::new().unwrap();
        let store = PresetStore::new(dir.path()).unwrap();
        let key = store.save(&sample_preset("gone")).unwrap();
        store.delete(&key).unwrap();
        assert!(store.load(&key).is_none());
        store.delete(&key).unwrap();
    }

    #[test]
    fn test_capture_and_apply_round_trip() {
        let mut session = test_session();
        let vocal = session.add_track(TrackRole::LeadVocal);
        session.add_track(TrackRole::Harmony);
        let instrumental = session.add_track(TrackRole::Instrumental);
        session
            .set_sends(
                vocal,
                SendLevels {
                    reverb_mix: 0.4,
                    delay_mix: 0.15,
                },
            )
            .unwrap();
        session.set_volume(instrumental, 0.7).unwrap();

        let preset = FxPreset::capture("my mix", &session);
        assert_eq!(preset.vocal_sends.reverb_mix, 0.4);
        assert_eq!(preset.instrumental_volume, 0.7);

        let mut fresh = test_session();
        let fresh_vocal = fresh.add_track(TrackRole::LeadVocal);
        fresh.add_track(TrackRole::Instrumental);
        preset.apply(&mut fresh).unwrap();
        assert_eq!(fresh.track(fresh_vocal).unwrap().sends.reverb_mix, 0.4);
    }

    #[test]
    fn test_capture_defaults_for_absent_roles() {
        let session = test_session();
        let preset = FxPreset::capture("empty", &session);
        assert_eq!(preset.vocal_sends, SendLevels::default());
        assert_eq!(preset.vocal_volume, 1.0);
    }
}

//! Legacy fixed-column authoring record.
//!
//! Before per-user workflows, every song carried the same fifteen boolean
//! authoring columns. Songs that never received dynamic progress rows are
//! still read through this record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::models::SongId;

/// The historical step identifiers, in their fixed order.
pub const LEGACY_STEP_FIELDS: [&str; 15] = [
    "demucs",
    "midi",
    "tempo_map",
    "fake_ending",
    "drums",
    "bass",
    "guitar",
    "vocals",
    "harmonies",
    "pro_keys",
    "keys",
    "animations",
    "drum_fills",
    "overdrive",
    "compile",
];

/// True if `step_name` is one of the fifteen legacy columns.
pub fn is_legacy_step(step_name: &str) -> bool {
    LEGACY_STEP_FIELDS.contains(&step_name)
}

/// Whether the legacy authoring table exists in this deployment.
///
/// Decided once when the store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyAvailability {
    Available,
    Unavailable,
}

impl LegacyAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// One song's legacy authoring columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyAuthoringRecord {
    pub song_id: SongId,
    pub demucs: bool,
    pub midi: bool,
    pub tempo_map: bool,
    pub fake_ending: bool,
    pub drums: bool,
    pub bass: bool,
    pub guitar: bool,
    pub vocals: bool,
    pub harmonies: bool,
    pub pro_keys: bool,
    pub keys: bool,
    pub animations: bool,
    pub drum_fills: bool,
    pub overdrive: bool,
    pub compile: bool,
}

impl LegacyAuthoringRecord {
    /// Empty record with every column false.
    pub fn new(song_id: SongId) -> Self {
        Self {
            song_id,
            ..Self::default()
        }
    }

    /// Record with every column true.
    pub fn all_complete(song_id: SongId) -> Self {
        let mut record = Self::new(song_id);
        for step in LEGACY_STEP_FIELDS {
            record.set(step, true);
        }
        record
    }

    /// Column values paired with their step identifiers, in legacy order.
    pub fn fields(&self) -> [(&'static str, bool); 15] {
        [
            ("demucs", self.demucs),
            ("midi", self.midi),
            ("tempo_map", self.tempo_map),
            ("fake_ending", self.fake_ending),
            ("drums", self.drums),
            ("bass", self.bass),
            ("guitar", self.guitar),
            ("vocals", self.vocals),
            ("harmonies", self.harmonies),
            ("pro_keys", self.pro_keys),
            ("keys", self.keys),
            ("animations", self.animations),
            ("drum_fills", self.drum_fills),
            ("overdrive", self.overdrive),
            ("compile", self.compile),
        ]
    }

    /// Set a column by step identifier. Returns false for unknown steps.
    pub fn set(&mut self, step_name: &str, value: bool) -> bool {
        let slot = match step_name {
            "demucs" => &mut self.demucs,
            "midi" => &mut self.midi,
            "tempo_map" => &mut self.tempo_map,
            "fake_ending" => &mut self.fake_ending,
            "drums" => &mut self.drums,
            "bass" => &mut self.bass,
            "guitar" => &mut self.guitar,
            "vocals" => &mut self.vocals,
            "harmonies" => &mut self.harmonies,
            "pro_keys" => &mut self.pro_keys,
            "keys" => &mut self.keys,
            "animations" => &mut self.animations,
            "drum_fills" => &mut self.drum_fills,
            "overdrive" => &mut self.overdrive,
            "compile" => &mut self.compile,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn with(mut self, step_name: &str, value: bool) -> Self {
        self.set(step_name, value);
        self
    }

    /// Every legacy column is true.
    pub fn is_fully_complete(&self) -> bool {
        self.fields().iter().all(|(_, done)| *done)
    }

    /// The record seen through the dynamic step model.
    pub fn to_progress(&self) -> HashMap<String, bool> {
        self.fields()
            .iter()
            .map(|(step, done)| ((*step).to_string(), *done))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_follow_legacy_order() {
        let record = LegacyAuthoringRecord::new(1);
        let names: Vec<&str> = record.fields().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, LEGACY_STEP_FIELDS.to_vec());
    }

    #[test]
    fn test_set_and_to_progress() {
        let record = LegacyAuthoringRecord::new(4).with("drums", true).with("compile", true);
        let progress = record.to_progress();

        assert_eq!(progress.len(), 15);
        assert!(progress["drums"]);
        assert!(progress["compile"]);
        assert!(!progress["bass"]);
    }

    #[test]
    fn test_set_unknown_step() {
        let mut record = LegacyAuthoringRecord::new(1);
        assert!(!record.set("mixing", true));
        assert!(!record.is_fully_complete());
    }

    #[test]
    fn test_fully_complete() {
        assert!(LegacyAuthoringRecord::all_complete(1).is_fully_complete());
        assert!(!LegacyAuthoringRecord::all_complete(1).with("keys", false).is_fully_complete());
    }

    #[test]
    fn test_is_legacy_step() {
        assert!(is_legacy_step("pro_keys"));
        assert!(!is_legacy_step("mixing"));
    }
}

use crate::common::types::{ProductSpecification, SpecMap};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Normalize a specification label: "Operating System" -> "operating_system"
pub fn normalize_spec_key(label: &str) -> String {
    let lowered = label.trim().trim_end_matches(':').to_lowercase();
    NON_WORD.replace_all(&lowered, "_").trim_matches('_').to_string()
}

impl ProductSpecification {
    /// Split scraped specification pairs into the fixed columns plus overflow.
    ///
    /// Returns `None` when the map is empty. Keys not covered by a fixed column
    /// are serialized as a JSON object into `additional_features`.
    pub fn from_map(specs: &SpecMap) -> Option<Self> {
        if specs.is_empty() {
            return None;
        }

        let mut spec = Self::default();
        let mut extra: BTreeMap<&str, &str> = BTreeMap::new();

        for (key, value) in specs {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_str() {
                "display" => &mut spec.display,
                "processor" => &mut spec.processor,
                "memory" => &mut spec.memory,
                "storage" => &mut spec.storage,
                "camera" => &mut spec.camera,
                "battery" => &mut spec.battery,
                "connectivity" => &mut spec.connectivity,
                "operating_system" => &mut spec.operating_system,
                _ => {
                    extra.insert(key.as_str(), value);
                    continue;
                }
            };
            *slot = Some(value.to_string());
        }

        if !extra.is_empty() {
            // A map of strings always serializes
            spec.additional_features = serde_json::to_string(&extra).ok();
        }

        Some(spec)
    }
}

//! Tag parsing and the tag dictionary.
//!
//! Modules carry free-text tag declarations such as `"mathematics"` or
//! `"pe:0"`. The dictionary groups, per tag name, every module
//! implementation of the semester that declared it, together with the
//! coefficient data the averaging pass needs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{ModuleCode, ModuleId, ModuleImpl, ModuleImplId, UeCode, UeId, UeKind};

/// Separator between a tag name and its optional weight suffix.
pub const WEIGHT_SEPARATOR: char = ':';

/// Split a raw tag declaration into `(name, weight)`.
///
/// The weight is everything after the first separator, parsed as `f64`.
/// No separator means weight 1.0. An unparsable suffix falls back to the
/// whole raw string as the name with weight 1.0, so a typo surfaces as a
/// visible odd tag name instead of a silently corrupted weight.
pub fn parse_tag(raw: &str) -> (String, f64) {
    match raw.split_once(WEIGHT_SEPARATOR) {
        Some((name, suffix)) => match suffix.trim().parse::<f64>() {
            Ok(weight) => (name.to_string(), weight),
            Err(_) => {
                log::warn!("tag {raw:?} has an unparsable weight suffix, keeping it whole");
                (raw.to_string(), 1.0)
            }
        },
        None => (raw.to_string(), 1.0),
    }
}

/// One module implementation's contribution to a tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaggedModule {
    pub module_id: ModuleId,
    /// Module coefficient as declared in the semester
    pub coefficient: f64,
    /// Weight parsed from the tag declaration
    pub tag_weight: f64,
    /// Stable code, matched against capitalized semesters
    pub module_code: ModuleCode,
    pub ue_id: UeId,
    pub ue_code: UeCode,
    pub ue_short_name: String,
}

/// Tag name → (module implementation id → contribution).
///
/// Both levels are ordered maps so iteration order, and therefore every
/// downstream computation, is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TagDictionary {
    entries: BTreeMap<String, BTreeMap<ModuleImplId, TaggedModule>>,
}

impl TagDictionary {
    /// Build the dictionary from the semester's module implementations.
    ///
    /// Only modules owned by `Standard` UEs participate; sport/culture and
    /// other special UE kinds never contribute to tag averages. Duplicate
    /// declarations of the same tag on the same implementation are
    /// last-write-wins.
    pub fn build(module_impls: &[ModuleImpl]) -> Self {
        let mut dictionary = TagDictionary::default();
        for modimpl in module_impls {
            if modimpl.ue.kind != UeKind::Standard {
                continue;
            }
            for raw in &modimpl.tags {
                let (name, tag_weight) = parse_tag(raw);
                dictionary.insert(name, modimpl, tag_weight);
            }
        }
        dictionary
    }

    fn insert(&mut self, name: String, modimpl: &ModuleImpl, tag_weight: f64) {
        let contribution = TaggedModule {
            module_id: modimpl.module_id.clone(),
            coefficient: modimpl.coefficient,
            tag_weight,
            module_code: modimpl.code.clone(),
            ue_id: modimpl.ue.id.clone(),
            ue_code: modimpl.ue.code.clone(),
            ue_short_name: modimpl.ue.short_name.clone(),
        };
        let replaced = self
            .entries
            .entry(name.clone())
            .or_default()
            .insert(modimpl.id.clone(), contribution);
        if replaced.is_some() {
            log::debug!(
                "tag {name:?}: replaced earlier entry for module impl {}",
                modimpl.id
            );
        }
    }

    /// Tag names in sorted order
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn modules_for(&self, tag: &str) -> Option<&BTreeMap<ModuleImplId, TaggedModule>> {
        self.entries.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Consumed data contracts.
//!
//! The engine never talks to storage. A surrounding system hands it one
//! [`NotesSnapshot`] per semester (enrollments, module structure, raw
//! per-module scores, precomputed UE and general averages) plus a
//! [`SnapshotStore`] to reach the semesters capitalized UEs came from.
//! [`MemorySnapshot`] and [`MemoryStore`] are plain serde-friendly
//! implementations used by tests and by callers feeding data from their
//! own layers.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::core::{
    CapitalizedUe, Enrollment, ModuleImpl, ModuleImplId, Score, SemesterId, SemesterInfo,
    StudentId, StudentIdentity, Ue, UeId,
};

/// Read-only view of one semester's notes table.
pub trait NotesSnapshot {
    fn semester(&self) -> &SemesterInfo;

    /// Enrolled students in their official order
    fn enrollments(&self) -> &[Enrollment];

    fn identity(&self, student: &StudentId) -> Option<&StudentIdentity>;

    fn module_impls(&self) -> &[ModuleImpl];

    /// UEs in semester order; the order matters to the UE-average helper
    fn ues(&self) -> &[Ue];

    /// Raw score of a student in one module.
    ///
    /// `NotEnrolled` when the student never took the module; never `None`,
    /// a hole here is data.
    fn module_score(&self, modimpl: &ModuleImplId, student: &StudentId) -> Score;

    /// Precomputed current UE average of a student in this semester
    fn ue_average(&self, student: &StudentId, ue: &UeId) -> Option<f64>;

    /// Precomputed general average; `None` when the student is entirely
    /// absent from the snapshot, which callers treat as a contract breach
    fn general_average(&self, student: &StudentId) -> Option<Score>;

    /// UEs the student capitalized from earlier semesters
    fn capitalized_ues(&self, student: &StudentId) -> &[CapitalizedUe];
}

/// Lookup of other semesters' snapshots, used by the capitalization
/// recursion. Returning `None` is a legitimate "history unavailable"
/// answer, not an error.
pub trait SnapshotStore {
    fn snapshot(&self, semester: &SemesterId) -> Option<&dyn NotesSnapshot>;
}

/// In-memory snapshot, deserializable from JSON fixtures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub info: SemesterInfo,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub identities: BTreeMap<StudentId, StudentIdentity>,
    #[serde(default)]
    pub module_impls: Vec<ModuleImpl>,
    #[serde(default)]
    pub ues: Vec<Ue>,
    #[serde(default)]
    pub module_scores: BTreeMap<ModuleImplId, BTreeMap<StudentId, Score>>,
    #[serde(default)]
    pub ue_averages: BTreeMap<StudentId, BTreeMap<UeId, f64>>,
    #[serde(default)]
    pub general_averages: BTreeMap<StudentId, Score>,
    #[serde(default)]
    pub capitalized: BTreeMap<StudentId, Vec<CapitalizedUe>>,
}

impl MemorySnapshot {
    pub fn new(info: SemesterInfo) -> Self {
        Self {
            info,
            enrollments: Vec::new(),
            identities: BTreeMap::new(),
            module_impls: Vec::new(),
            ues: Vec::new(),
            module_scores: BTreeMap::new(),
            ue_averages: BTreeMap::new(),
            general_averages: BTreeMap::new(),
            capitalized: BTreeMap::new(),
        }
    }

    pub fn record_score(&mut self, modimpl: &ModuleImplId, student: &StudentId, score: Score) {
        self.module_scores
            .entry(modimpl.clone())
            .or_default()
            .insert(student.clone(), score);
    }

    pub fn set_ue_average(&mut self, student: &StudentId, ue: &UeId, average: f64) {
        self.ue_averages
            .entry(student.clone())
            .or_default()
            .insert(ue.clone(), average);
    }

    pub fn set_general_average(&mut self, student: &StudentId, score: Score) {
        self.general_averages.insert(student.clone(), score);
    }

    pub fn add_capitalized(&mut self, student: &StudentId, capitalized: CapitalizedUe) {
        self.capitalized
            .entry(student.clone())
            .or_default()
            .push(capitalized);
    }

    /// Load a snapshot from the records system's JSON export
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let snapshot =
            serde_json::from_str(contents).context("invalid notes snapshot document")?;
        Ok(snapshot)
    }

    pub fn to_json_string(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(self).context("snapshot serialization failed")?;
        Ok(json)
    }
}

impl NotesSnapshot for MemorySnapshot {
    fn semester(&self) -> &SemesterInfo {
        &self.info
    }

    fn enrollments(&self) -> &[Enrollment] {
        &self.enrollments
    }

    fn identity(&self, student: &StudentId) -> Option<&StudentIdentity> {
        self.identities.get(student)
    }

    fn module_impls(&self) -> &[ModuleImpl] {
        &self.module_impls
    }

    fn ues(&self) -> &[Ue] {
        &self.ues
    }

    fn module_score(&self, modimpl: &ModuleImplId, student: &StudentId) -> Score {
        self.module_scores
            .get(modimpl)
            .and_then(|scores| scores.get(student))
            .copied()
            .unwrap_or(Score::NotEnrolled)
    }

    fn ue_average(&self, student: &StudentId, ue: &UeId) -> Option<f64> {
        self.ue_averages
            .get(student)
            .and_then(|averages| averages.get(ue))
            .copied()
    }

    fn general_average(&self, student: &StudentId) -> Option<Score> {
        self.general_averages.get(student).copied()
    }

    fn capitalized_ues(&self, student: &StudentId) -> &[CapitalizedUe] {
        self.capitalized
            .get(student)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Snapshot store over a map of semesters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    semesters: BTreeMap<SemesterId, MemorySnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snapshot under its own semester id
    pub fn insert(&mut self, snapshot: MemorySnapshot) {
        self.semesters.insert(snapshot.info.id.clone(), snapshot);
    }

    pub fn len(&self) -> usize {
        self.semesters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.semesters.is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn snapshot(&self, semester: &SemesterId) -> Option<&dyn NotesSnapshot> {
        self.semesters
            .get(semester)
            .map(|snapshot| snapshot as &dyn NotesSnapshot)
    }
}

/// Store with no history at all; every lookup misses.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyStore;

impl SnapshotStore for EmptyStore {
    fn snapshot(&self, _semester: &SemesterId) -> Option<&dyn NotesSnapshot> {
        None
    }
}

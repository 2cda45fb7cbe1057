//! Per-semester tag aggregation.
//!
//! `SemesterTagTable` orchestrates the whole pipeline for one semester:
//! build the tag dictionary, resolve every tagged module score through the
//! capitalization lookup, average per tag, then rank. A synthetic overall
//! tag carries the institution's official general average alongside the
//! thematic tags. The table goes through three states: fresh, dictionary
//! built, averages computed; computing again from the same snapshot yields
//! a bit-identical table.

use std::collections::BTreeMap;

use im::Vector;
use serde::Serialize;

use crate::average::{combine_tag_weights, weighted_mean};
use crate::capitalization::resolve_score;
use crate::config::EngineConfig;
use crate::core::errors::{Error, Result};
use crate::core::{SemesterId, StudentId, StudentIdentity};
use crate::ranking::{compute_ranks, compute_statistics, Rank, TagAverage, TagStatistics};
use crate::snapshot::{NotesSnapshot, SnapshotStore};
use crate::tags::TagDictionary;

/// Everything known about one student under one tag.
///
/// `rank: None` means the tag or the student is unknown to the table;
/// `Some(Rank::Pending)` means known but without a numeric average.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TagSummary {
    pub average: Option<f64>,
    pub total_weight: Option<f64>,
    pub rank: Option<Rank>,
    pub enrolled_count: usize,
    pub statistics: Option<TagStatistics>,
}

/// Ranked tag averages of one semester.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SemesterTagTable {
    name: String,
    semester: SemesterId,
    overall_tag: String,
    /// Active students in enrollment order
    students: Vec<StudentId>,
    identities: BTreeMap<StudentId, StudentIdentity>,
    tags: Option<TagDictionary>,
    results: BTreeMap<String, Vector<TagAverage>>,
    ranks: BTreeMap<String, BTreeMap<StudentId, Rank>>,
    statistics: BTreeMap<String, TagStatistics>,
}

impl SemesterTagTable {
    /// Set up an empty table over the snapshot's active enrollments.
    ///
    /// Withdrawn and failing students are dropped here and never appear in
    /// any average or ranking.
    pub fn new(snapshot: &dyn NotesSnapshot, config: &EngineConfig) -> Self {
        let students: Vec<StudentId> = snapshot
            .enrollments()
            .iter()
            .filter(|enrollment| enrollment.state.is_active())
            .map(|enrollment| enrollment.student.clone())
            .collect();
        let identities = students
            .iter()
            .filter_map(|student| {
                snapshot
                    .identity(student)
                    .map(|identity| (student.clone(), identity.clone()))
            })
            .collect();

        Self {
            name: snapshot.semester().display_name(),
            semester: snapshot.semester().id.clone(),
            overall_tag: config.overall_tag.clone(),
            students,
            identities,
            tags: None,
            results: BTreeMap::new(),
            ranks: BTreeMap::new(),
            statistics: BTreeMap::new(),
        }
    }

    /// Build the table and compute every average in one call
    pub fn build(
        snapshot: &dyn NotesSnapshot,
        store: &dyn SnapshotStore,
        config: &EngineConfig,
    ) -> Result<Self> {
        let mut table = Self::new(snapshot, config);
        table.compute_all(snapshot, store, config)?;
        Ok(table)
    }

    /// Build the tag dictionary once; later calls return the cached one
    pub fn build_tag_dictionary(&mut self, snapshot: &dyn NotesSnapshot) -> &TagDictionary {
        self.tags
            .get_or_insert_with(|| TagDictionary::build(snapshot.module_impls()))
    }

    /// Average one tag for every active student.
    ///
    /// Scores and normalized weights come from the capitalization resolver;
    /// tag weights multiply onto the normalized coefficients before the
    /// mean. A tag unknown to the dictionary produces an empty list.
    pub fn compute_tag_average(
        &mut self,
        snapshot: &dyn NotesSnapshot,
        store: &dyn SnapshotStore,
        config: &EngineConfig,
        tag: &str,
    ) -> Result<Vec<TagAverage>> {
        self.build_tag_dictionary(snapshot);
        let Some(modules) = self.tags.as_ref().and_then(|tags| tags.modules_for(tag)) else {
            return Ok(Vec::new());
        };

        let depth = config.capitalization_depth();
        let mut collected = Vec::with_capacity(self.students.len());
        for student in &self.students {
            let mut scores = Vec::new();
            let mut weights = Vec::new();
            let mut tag_weights = Vec::new();
            for (modimpl_id, tagged) in modules {
                let resolved =
                    resolve_score(snapshot, store, student, modimpl_id, depth, config.ue_scan);
                if let Some(score) = resolved.score {
                    scores.push(score);
                    weights.push(resolved.weight);
                    tag_weights.push(tagged.tag_weight);
                }
            }
            let combined = combine_tag_weights(&weights, &tag_weights)?;
            let outcome = weighted_mean(&scores, &combined, config.force_averages)?;
            collected.push(TagAverage::new(
                student.clone(),
                outcome.average,
                outcome.total_weight,
            ));
        }
        Ok(collected)
    }

    /// Compute every tag plus the synthetic overall tag.
    ///
    /// The overall tag reads each student's precomputed general average with
    /// a fixed weight of 1.0; it is the official average, not a recomputation
    /// from tags. It is stored last, so a module tag sharing its name is
    /// overwritten.
    pub fn compute_all(
        &mut self,
        snapshot: &dyn NotesSnapshot,
        store: &dyn SnapshotStore,
        config: &EngineConfig,
    ) -> Result<()> {
        self.build_tag_dictionary(snapshot);
        self.results.clear();
        self.ranks.clear();
        self.statistics.clear();

        let names: Vec<String> = self
            .tags
            .as_ref()
            .map(|tags| tags.tag_names().map(String::from).collect())
            .unwrap_or_default();
        for name in names {
            let averages = self.compute_tag_average(snapshot, store, config, &name)?;
            self.insert_tag(name, averages);
        }

        if self.results.contains_key(&self.overall_tag) {
            log::warn!(
                "module tag {:?} collides with the overall tag and is overwritten",
                self.overall_tag
            );
        }
        let overall = self.compute_overall(snapshot)?;
        self.insert_tag(self.overall_tag.clone(), overall);
        Ok(())
    }

    /// General average of every active student, as (score, weight 1.0)
    fn compute_overall(&self, snapshot: &dyn NotesSnapshot) -> Result<Vec<TagAverage>> {
        self.students
            .iter()
            .map(|student| {
                let score = snapshot
                    .general_average(student)
                    .ok_or_else(|| Error::student_not_in_snapshot(student, &self.semester))?;
                Ok(TagAverage::new(student.clone(), score.value(), Some(1.0)))
            })
            .collect()
    }

    fn insert_tag(&mut self, tag: String, averages: Vec<TagAverage>) {
        if averages.is_empty() {
            return;
        }
        self.ranks.insert(tag.clone(), compute_ranks(&averages));
        if let Some(stats) = compute_statistics(&averages) {
            self.statistics.insert(tag.clone(), stats);
        }
        self.results.insert(tag, averages.into_iter().collect());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn semester_id(&self) -> &SemesterId {
        &self.semester
    }

    pub fn students(&self) -> &[StudentId] {
        &self.students
    }

    /// Ranking denominator, shared by every tag
    pub fn enrolled_count(&self) -> usize {
        self.students.len()
    }

    pub fn identity(&self, student: &StudentId) -> Option<&StudentIdentity> {
        self.identities.get(student)
    }

    /// Computed tag names in sorted order, overall tag included
    pub fn tag_names(&self) -> Vec<&str> {
        self.results.keys().map(String::as_str).collect()
    }

    /// The dictionary, if built
    pub fn tag_dictionary(&self) -> Option<&TagDictionary> {
        self.tags.as_ref()
    }

    /// Ranked averages of one tag, in enrollment order
    pub fn averages_for(&self, tag: &str) -> Option<&Vector<TagAverage>> {
        self.results.get(tag)
    }

    pub fn average_of(&self, tag: &str, student: &StudentId) -> Option<f64> {
        self.entry_of(tag, student)?.average
    }

    pub fn total_weight_of(&self, tag: &str, student: &StudentId) -> Option<f64> {
        self.entry_of(tag, student)?.total_weight
    }

    pub fn rank_of(&self, tag: &str, student: &StudentId) -> Option<Rank> {
        self.ranks.get(tag)?.get(student).copied()
    }

    pub fn statistics_of(&self, tag: &str) -> Option<TagStatistics> {
        self.statistics.get(tag).copied()
    }

    pub fn student_summary(&self, tag: &str, student: &StudentId) -> TagSummary {
        TagSummary {
            average: self.average_of(tag, student),
            total_weight: self.total_weight_of(tag, student),
            rank: self.rank_of(tag, student),
            enrolled_count: self.enrolled_count(),
            statistics: self.statistics_of(tag),
        }
    }

    fn entry_of(&self, tag: &str, student: &StudentId) -> Option<&TagAverage> {
        self.results
            .get(tag)?
            .iter()
            .find(|entry| entry.student == *student)
    }
}

//! Score resolution across capitalized UEs.
//!
//! A student who capitalized a UE in an earlier semester keeps its grades.
//! When a tag average needs a module score, the resolver decides whether to
//! read the current semester or to follow the capitalization back to the
//! semester the UE was earned in, keeping whichever UE average is better.

use serde::{Deserialize, Serialize};

use crate::core::{ModuleImpl, ModuleImplId, Score, StudentId, UeKind};
use crate::snapshot::{NotesSnapshot, SnapshotStore};

/// How to locate a student's UE average inside a snapshot.
///
/// `FirstUeOnly` reproduces the historical lookup, which only ever examined
/// the first UE of the semester and answered `None` for every other one.
/// `ScanAll` looks the UE up wherever it sits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UeScanPolicy {
    #[default]
    FirstUeOnly,
    ScanAll,
}

/// Outcome of resolving one module score for one student.
///
/// `score: None` means the pair is excluded from the tag average entirely.
/// `score: Some(..)` hands the value to the mean, markers included, so a
/// `-NA-` or `-NI-` still shows up in diagnostics and counts as invalid
/// there.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedScore {
    pub score: Option<Score>,
    pub weight: Option<f64>,
}

impl ResolvedScore {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(score: Score, weight: f64) -> Self {
        Self {
            score: Some(score),
            weight: Some(weight),
        }
    }

    /// Whether the pair participates in the tag average
    pub fn is_countable(&self) -> bool {
        self.score.is_some()
    }
}

/// Resolve the score and normalized weight of `student` in module `modimpl`.
///
/// Outside any capitalized UE this is the current score together with the
/// module coefficient divided by the semester coefficient sum. Inside a
/// capitalized UE, the current and prior UE averages are compared and the
/// better semester wins, a tie keeping the current one; following the prior
/// semester recurses with `depth - 1` since that UE may itself have been
/// capitalized. A negative depth, an unknown module, a missing prior
/// snapshot or an absent prior module all resolve to nothing.
pub fn resolve_score(
    snapshot: &dyn NotesSnapshot,
    store: &dyn SnapshotStore,
    student: &StudentId,
    modimpl: &ModuleImplId,
    depth: i32,
    policy: UeScanPolicy,
) -> ResolvedScore {
    let Some(module) = find_module(snapshot, modimpl) else {
        log::debug!(
            "module {} not present in semester {}",
            modimpl,
            snapshot.semester().id
        );
        return ResolvedScore::none();
    };
    if depth < 0 {
        log::debug!("capitalization depth exhausted at module {}", module.code);
        return ResolvedScore::none();
    }

    let capitalized = snapshot.capitalized_ues(student);
    if !capitalized.iter().any(|cap| cap.ue_id == module.ue.id) {
        return current_semester_score(snapshot, student, module);
    }

    // Capitalized UEs are matched on their code, not their id, since the
    // curriculum may have been renumbered between the two semesters.
    let Some(prior_semester) = capitalized
        .iter()
        .find(|cap| cap.ue_code == module.ue.code)
        .map(|cap| cap.semester.clone())
    else {
        return ResolvedScore::none();
    };
    let Some(prior_snapshot) = store.snapshot(&prior_semester) else {
        log::debug!(
            "snapshot for semester {} unavailable, ignoring capitalized UE {}",
            prior_semester,
            module.ue.code
        );
        return ResolvedScore::none();
    };
    let Some(prior_module) = prior_snapshot
        .module_impls()
        .iter()
        .find(|candidate| candidate.code == module.code)
    else {
        // No module with the same code back then, nothing to take over
        return ResolvedScore::none();
    };

    let current_average = ue_average_for_module(snapshot, student, module, policy);
    let prior_average = ue_average_for_module(prior_snapshot, student, prior_module, policy);
    match (current_average, prior_average) {
        (_, None) => current_semester_score(snapshot, student, module),
        (Some(current), Some(prior)) if current >= prior => {
            current_semester_score(snapshot, student, module)
        }
        _ => {
            let prior_id = prior_module.id.clone();
            resolve_score(prior_snapshot, store, student, &prior_id, depth - 1, policy)
        }
    }
}

/// Sum of the module coefficients carried by standard UEs.
///
/// This is the normalization base for per-module weights; sport, culture and
/// other non-standard UEs stay out of it.
pub fn standard_coefficient_sum(snapshot: &dyn NotesSnapshot) -> f64 {
    snapshot
        .module_impls()
        .iter()
        .filter(|module| module.ue.kind == UeKind::Standard)
        .map(|module| module.coefficient)
        .sum()
}

/// UE average used to compare the current semester against a capitalized one
pub fn ue_average_for_module(
    snapshot: &dyn NotesSnapshot,
    student: &StudentId,
    module: &ModuleImpl,
    policy: UeScanPolicy,
) -> Option<f64> {
    match policy {
        UeScanPolicy::FirstUeOnly => {
            let first = snapshot.ues().first()?;
            if first.id == module.ue.id {
                snapshot.ue_average(student, &module.ue.id)
            } else {
                None
            }
        }
        UeScanPolicy::ScanAll => snapshot.ue_average(student, &module.ue.id),
    }
}

fn current_semester_score(
    snapshot: &dyn NotesSnapshot,
    student: &StudentId,
    module: &ModuleImpl,
) -> ResolvedScore {
    let score = snapshot.module_score(&module.id, student);
    let total = standard_coefficient_sum(snapshot);
    let weight = if total != 0.0 {
        module.coefficient / total
    } else {
        0.0
    };
    ResolvedScore::of(score, weight)
}

fn find_module<'a>(
    snapshot: &'a dyn NotesSnapshot,
    modimpl: &ModuleImplId,
) -> Option<&'a ModuleImpl> {
    snapshot
        .module_impls()
        .iter()
        .find(|module| module.id == *modimpl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use crate::core::{
        CapitalizedUe, ModuleCode, ModuleId, SemesterId, SemesterInfo, Ue, UeCode, UeId,
    };
    use crate::snapshot::{EmptyStore, MemorySnapshot, MemoryStore};

    fn info(id: &str, term: u32, year: i32) -> SemesterInfo {
        SemesterInfo {
            id: SemesterId::new(id),
            term,
            title: format!("Semester {term}"),
            start_date: NaiveDate::from_ymd_opt(year, 9, 1).unwrap(),
            academic_year_start: year,
            academic_year_end: year + 1,
        }
    }

    fn ue(id: &str, code: &str, kind: UeKind) -> Ue {
        Ue {
            id: UeId::new(id),
            code: UeCode::new(code),
            short_name: code.to_string(),
            kind,
        }
    }

    fn module(id: &str, code: &str, coefficient: f64, ue: Ue) -> ModuleImpl {
        ModuleImpl {
            id: ModuleImplId::new(id),
            module_id: ModuleId::new(format!("m-{id}")),
            code: ModuleCode::new(code),
            coefficient,
            ue,
            tags: Vec::new(),
        }
    }

    fn student() -> StudentId {
        StudentId::new("e-1")
    }

    /// One semester, one standard UE, two modules weighing 3 and 7
    fn plain_snapshot() -> MemorySnapshot {
        let mut snapshot = MemorySnapshot::new(info("S2", 2, 2021));
        let ue21 = ue("ue-21", "UE21", UeKind::Standard);
        snapshot.ues.push(ue21.clone());
        snapshot
            .module_impls
            .push(module("mi-a", "M2101", 3.0, ue21.clone()));
        snapshot.module_impls.push(module("mi-b", "M2102", 7.0, ue21));
        snapshot.record_score(&ModuleImplId::new("mi-a"), &student(), Score::Value(12.0));
        snapshot.record_score(&ModuleImplId::new("mi-b"), &student(), Score::Value(9.0));
        snapshot
    }

    #[test]
    fn uncapitalized_module_uses_current_score_and_normalized_weight() {
        let snapshot = plain_snapshot();
        let resolved = resolve_score(
            &snapshot,
            &EmptyStore,
            &student(),
            &ModuleImplId::new("mi-a"),
            2,
            UeScanPolicy::FirstUeOnly,
        );
        assert_eq!(resolved.score, Some(Score::Value(12.0)));
        assert_eq!(resolved.weight, Some(0.3));
        assert!(resolved.is_countable());
    }

    #[test]
    fn markers_pass_through_with_their_weight() {
        let snapshot = plain_snapshot();
        let resolved = resolve_score(
            &snapshot,
            &EmptyStore,
            &StudentId::new("e-unknown"),
            &ModuleImplId::new("mi-b"),
            2,
            UeScanPolicy::FirstUeOnly,
        );
        assert_eq!(resolved.score, Some(Score::NotEnrolled));
        assert_eq!(resolved.weight, Some(0.7));
    }

    #[test]
    fn non_standard_ues_stay_out_of_the_coefficient_sum() {
        let mut snapshot = plain_snapshot();
        let sport = ue("ue-sport", "UESPORT", UeKind::SportCulture);
        snapshot.ues.push(sport.clone());
        snapshot.module_impls.push(module("mi-sport", "SPORT", 90.0, sport));
        assert_eq!(standard_coefficient_sum(&snapshot), 10.0);
    }

    #[test]
    fn zero_coefficient_sum_yields_zero_weight() {
        let mut snapshot = MemorySnapshot::new(info("S1", 1, 2021));
        let ue11 = ue("ue-11", "UE11", UeKind::Standard);
        snapshot.ues.push(ue11.clone());
        snapshot.module_impls.push(module("mi-a", "M1101", 0.0, ue11));
        snapshot.record_score(&ModuleImplId::new("mi-a"), &student(), Score::Value(15.0));
        let resolved = resolve_score(
            &snapshot,
            &EmptyStore,
            &student(),
            &ModuleImplId::new("mi-a"),
            2,
            UeScanPolicy::FirstUeOnly,
        );
        assert_eq!(resolved.score, Some(Score::Value(15.0)));
        assert_eq!(resolved.weight, Some(0.0));
    }

    #[test]
    fn unknown_module_resolves_to_nothing() {
        let snapshot = plain_snapshot();
        let resolved = resolve_score(
            &snapshot,
            &EmptyStore,
            &student(),
            &ModuleImplId::new("mi-missing"),
            2,
            UeScanPolicy::FirstUeOnly,
        );
        assert_eq!(resolved, ResolvedScore::none());
        assert!(!resolved.is_countable());
    }

    #[test]
    fn negative_depth_resolves_to_nothing() {
        let snapshot = plain_snapshot();
        let resolved = resolve_score(
            &snapshot,
            &EmptyStore,
            &student(),
            &ModuleImplId::new("mi-a"),
            -1,
            UeScanPolicy::FirstUeOnly,
        );
        assert_eq!(resolved, ResolvedScore::none());
    }

    /// Current semester whose only UE is capitalized from semester `prior`
    fn capitalized_current(prior: &str) -> MemorySnapshot {
        let mut snapshot = MemorySnapshot::new(info("S3", 3, 2022));
        let uea = ue("ue-31", "UEA", UeKind::Standard);
        snapshot.ues.push(uea.clone());
        snapshot
            .module_impls
            .push(module("mi-cur", "M31", 4.0, uea.clone()));
        snapshot.module_impls.push(module("mi-oth", "M32", 6.0, uea));
        snapshot.record_score(&ModuleImplId::new("mi-cur"), &student(), Score::Value(8.0));
        snapshot.add_capitalized(
            &student(),
            CapitalizedUe {
                ue_id: UeId::new("ue-31"),
                ue_code: UeCode::new("UEA"),
                semester: SemesterId::new(prior),
            },
        );
        snapshot
    }

    /// Prior semester holding the same module codes under the same UE code
    fn capitalized_prior(id: &str, score: f64) -> MemorySnapshot {
        let mut snapshot = MemorySnapshot::new(info(id, 1, 2020));
        let uea = ue("ue-old", "UEA", UeKind::Standard);
        snapshot.ues.push(uea.clone());
        snapshot
            .module_impls
            .push(module("mi-old", "M31", 2.0, uea.clone()));
        snapshot.module_impls.push(module("mi-old2", "M32", 3.0, uea));
        snapshot.record_score(&ModuleImplId::new("mi-old"), &student(), Score::Value(score));
        snapshot
    }

    #[test]
    fn missing_prior_snapshot_resolves_to_nothing() {
        let current = capitalized_current("S1");
        let resolved = resolve_score(
            &current,
            &EmptyStore,
            &student(),
            &ModuleImplId::new("mi-cur"),
            2,
            UeScanPolicy::FirstUeOnly,
        );
        assert_eq!(resolved, ResolvedScore::none());
    }

    #[test]
    fn missing_prior_module_code_resolves_to_nothing() {
        let current = capitalized_current("S1");
        let mut prior = MemorySnapshot::new(info("S1", 1, 2020));
        let uea = ue("ue-old", "UEA", UeKind::Standard);
        prior.ues.push(uea.clone());
        prior.module_impls.push(module("mi-old", "OTHER", 2.0, uea));
        let mut store = MemoryStore::new();
        store.insert(prior);

        let resolved = resolve_score(
            &current,
            &store,
            &student(),
            &ModuleImplId::new("mi-cur"),
            2,
            UeScanPolicy::FirstUeOnly,
        );
        assert_eq!(resolved, ResolvedScore::none());
    }

    #[test]
    fn unknown_prior_ue_average_keeps_current_values() {
        let current = capitalized_current("S1");
        let mut store = MemoryStore::new();
        store.insert(capitalized_prior("S1", 17.0));

        // Neither semester recorded a UE average row for the student
        let resolved = resolve_score(
            &current,
            &store,
            &student(),
            &ModuleImplId::new("mi-cur"),
            2,
            UeScanPolicy::FirstUeOnly,
        );
        assert_eq!(resolved.score, Some(Score::Value(8.0)));
        assert_eq!(resolved.weight, Some(0.4));
    }

    #[test]
    fn tie_between_ue_averages_keeps_current_values() {
        let mut current = capitalized_current("S1");
        current.set_ue_average(&student(), &UeId::new("ue-31"), 11.0);
        let mut prior = capitalized_prior("S1", 17.0);
        prior.set_ue_average(&student(), &UeId::new("ue-old"), 11.0);
        let mut store = MemoryStore::new();
        store.insert(prior);

        let resolved = resolve_score(
            &current,
            &store,
            &student(),
            &ModuleImplId::new("mi-cur"),
            2,
            UeScanPolicy::FirstUeOnly,
        );
        assert_eq!(resolved.score, Some(Score::Value(8.0)));
        assert_eq!(resolved.weight, Some(0.4));
    }

    #[test]
    fn better_prior_ue_average_reads_the_prior_semester() {
        let mut current = capitalized_current("S1");
        current.set_ue_average(&student(), &UeId::new("ue-31"), 9.0);
        let mut prior = capitalized_prior("S1", 17.0);
        prior.set_ue_average(&student(), &UeId::new("ue-old"), 14.0);
        let mut store = MemoryStore::new();
        store.insert(prior);

        let resolved = resolve_score(
            &current,
            &store,
            &student(),
            &ModuleImplId::new("mi-cur"),
            2,
            UeScanPolicy::FirstUeOnly,
        );
        // 17 from the prior semester, weighted 2 over its sum of 5
        assert_eq!(resolved.score, Some(Score::Value(17.0)));
        assert_eq!(resolved.weight, Some(0.4));
    }

    #[test]
    fn unknown_current_ue_average_still_follows_the_better_prior() {
        let current = capitalized_current("S1");
        let mut prior = capitalized_prior("S1", 17.0);
        prior.set_ue_average(&student(), &UeId::new("ue-old"), 14.0);
        let mut store = MemoryStore::new();
        store.insert(prior);

        let resolved = resolve_score(
            &current,
            &store,
            &student(),
            &ModuleImplId::new("mi-cur"),
            2,
            UeScanPolicy::FirstUeOnly,
        );
        assert_eq!(resolved.score, Some(Score::Value(17.0)));
    }

    #[test]
    fn first_ue_only_ignores_averages_of_later_ues() {
        let mut snapshot = plain_snapshot();
        snapshot.ues.insert(0, ue("ue-20", "UE20", UeKind::Standard));
        snapshot.set_ue_average(&student(), &UeId::new("ue-21"), 13.0);

        let target = module("mi-a", "M2101", 3.0, ue("ue-21", "UE21", UeKind::Standard));
        assert_eq!(
            ue_average_for_module(&snapshot, &student(), &target, UeScanPolicy::FirstUeOnly),
            None
        );
        assert_eq!(
            ue_average_for_module(&snapshot, &student(), &target, UeScanPolicy::ScanAll),
            Some(13.0)
        );
    }

    #[test]
    fn recursion_follows_a_two_semester_chain() {
        // S3 capitalizes UEA from S2, which itself capitalized it from S1.
        let mut current = capitalized_current("S2");
        current.set_ue_average(&student(), &UeId::new("ue-31"), 9.0);

        let mut middle = capitalized_prior("S2", 10.0);
        middle.set_ue_average(&student(), &UeId::new("ue-old"), 12.0);
        middle.add_capitalized(
            &student(),
            CapitalizedUe {
                ue_id: UeId::new("ue-old"),
                ue_code: UeCode::new("UEA"),
                semester: SemesterId::new("S1"),
            },
        );

        let mut oldest = MemorySnapshot::new(info("S1", 1, 2019));
        let first_ue = ue("ue-first", "UEA", UeKind::Standard);
        oldest.ues.push(first_ue.clone());
        oldest
            .module_impls
            .push(module("mi-first", "M31", 5.0, first_ue.clone()));
        oldest
            .module_impls
            .push(module("mi-first2", "M32", 5.0, first_ue));
        oldest.record_score(&ModuleImplId::new("mi-first"), &student(), Score::Value(16.0));
        oldest.set_ue_average(&student(), &UeId::new("ue-first"), 15.0);

        let mut store = MemoryStore::new();
        store.insert(middle);
        store.insert(oldest);

        let resolved = resolve_score(
            &current,
            &store,
            &student(),
            &ModuleImplId::new("mi-cur"),
            2,
            UeScanPolicy::FirstUeOnly,
        );
        // S1 wins twice over, 16.0 weighted 5 over its sum of 10
        assert_eq!(resolved.score, Some(Score::Value(16.0)));
        assert_eq!(resolved.weight, Some(0.5));

        // With no recursion budget left the chain cannot be followed
        let starved = resolve_score(
            &current,
            &store,
            &student(),
            &ModuleImplId::new("mi-cur"),
            0,
            UeScanPolicy::FirstUeOnly,
        );
        assert_eq!(starved, ResolvedScore::none());
    }
}

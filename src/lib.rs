// Export modules for library usage
pub mod average;
pub mod bonus;
pub mod capitalization;
pub mod config;
pub mod core;
pub mod diagnostics;
pub mod ranking;
pub mod semester;
pub mod snapshot;
pub mod tags;
pub mod validation;

// Re-export commonly used types
pub use crate::core::errors::{Error, Result};

pub use crate::core::{
    CapitalizedUe, Enrollment, EnrollmentState, ModuleCode, ModuleId, ModuleImpl, ModuleImplId,
    Score, SemesterId, SemesterInfo, StudentId, StudentIdentity, Ue, UeCode, UeId, UeKind,
    UeStatus,
};

pub use crate::average::{combine_tag_weights, uniform_mean, weighted_mean, MeanOutcome};

pub use crate::bonus::{
    apply_with_guard, default_registry, rules::builtin_rules, BonusContext, BonusRegistry,
    BonusRule,
};

pub use crate::capitalization::{
    resolve_score, standard_coefficient_sum, ue_average_for_module, ResolvedScore, UeScanPolicy,
};

pub use crate::config::EngineConfig;

pub use crate::diagnostics::{table_csv, tag_catalog, tag_detail};

pub use crate::ranking::{compute_ranks, compute_statistics, Rank, TagAverage, TagStatistics};

pub use crate::semester::{SemesterTagTable, TagSummary};

pub use crate::snapshot::{EmptyStore, MemorySnapshot, MemoryStore, NotesSnapshot, SnapshotStore};

pub use crate::tags::{parse_tag, TagDictionary, TaggedModule};

pub use crate::validation::{CurriculumRules, JuryCode, GRADE_TOLERANCE};

pub mod errors;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Opaque student identifier assigned by the records system
    StudentId
);
string_id!(
    /// Identifier of one module offering within one semester instance
    ModuleImplId
);
string_id!(
    /// Identifier of a module in the curriculum catalog
    ModuleId
);
string_id!(
    /// Identifier of a UE within one curriculum version
    UeId
);
string_id!(
    /// Identifier of a semester instance
    SemesterId
);
string_id!(
    /// Stable module code, preserved across curriculum versions
    ModuleCode
);
string_id!(
    /// Stable UE code, preserved across curriculum versions
    UeCode
);

/// A per-module grade as recorded in a notes snapshot.
///
/// The non-`Value` variants are the markers the records system uses for
/// grade "holes": no grade entered, student not enrolled in the module, or
/// grade replaced by a capitalized UE. All three are invalid for averaging;
/// they are kept distinct so reports can tell them apart.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    Value(f64),
    Missing,
    NotEnrolled,
    Capitalized,
}

impl Score {
    /// The numeric grade, if one is present
    pub fn value(self) -> Option<f64> {
        match self {
            Score::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_value(self) -> bool {
        matches!(self, Score::Value(_))
    }
}

impl From<f64> for Score {
    fn from(value: f64) -> Self {
        Score::Value(value)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Value(v) => write!(f, "{v:.2}"),
            Score::Missing => f.write_str("-NA-"),
            Score::NotEnrolled => f.write_str("-NI-"),
            Score::Capitalized => f.write_str("-c-"),
        }
    }
}

/// Enrollment state of a student within one semester.
///
/// Only `Enrolled` students take part in tag aggregation and ranking;
/// withdrawn and failing students keep their records but are excluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
    Enrolled,
    Withdrawn,
    Failing,
}

impl EnrollmentState {
    pub fn is_active(self) -> bool {
        self == EnrollmentState::Enrolled
    }

    /// Single-letter state code used by the upstream records system
    pub fn code(self) -> &'static str {
        match self {
            EnrollmentState::Enrolled => "I",
            EnrollmentState::Withdrawn => "D",
            EnrollmentState::Failing => "DEF",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub student: StudentId,
    pub state: EnrollmentState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentIdentity {
    pub last_name: String,
    pub first_name: String,
}

impl StudentIdentity {
    pub fn new(last_name: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.into(),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

/// Kind of a UE, which decides how its modules enter the various averages.
/// Only `Standard` UEs contribute to tag aggregation; `SportCulture`
/// modules feed the bonus rules instead of any UE average.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UeKind {
    Standard,
    SportCulture,
    InternshipLp,
    Internship10,
    Elective,
    Professional,
    Optional,
}

impl UeKind {
    /// Fundamental UEs count toward fundamental-credit totals
    pub fn is_fundamental(self) -> bool {
        matches!(
            self,
            UeKind::Standard | UeKind::InternshipLp | UeKind::Professional
        )
    }

    pub fn is_professional(self) -> bool {
        self == UeKind::Professional
    }
}

impl fmt::Display for UeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        static DISPLAY_STRINGS: &[(UeKind, &str)] = &[
            (UeKind::Standard, "Standard"),
            (UeKind::SportCulture, "Sport/Culture (bonus points)"),
            (UeKind::InternshipLp, "Tutored project and internship"),
            (UeKind::Internship10, "Internship (minimum average 10/20)"),
            (UeKind::Elective, "Elective"),
            (UeKind::Professional, "Professional"),
            (UeKind::Optional, "Optional"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(k, _)| k == self)
            .map(|(_, s)| *s)
            .unwrap_or("Unknown");

        write!(f, "{display_str}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ue {
    pub id: UeId,
    pub code: UeCode,
    pub short_name: String,
    pub kind: UeKind,
}

/// One offering of a teaching module within a specific semester instance.
///
/// The implementation id is only meaningful within its semester; the module
/// `code` is the stable handle used to match modules across semesters when
/// resolving capitalized UEs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleImpl {
    pub id: ModuleImplId,
    pub module_id: ModuleId,
    pub code: ModuleCode,
    pub coefficient: f64,
    pub ue: Ue,
    /// Raw tag declarations, e.g. `"mathematics"` or `"pe:0"`
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A UE validated in an earlier semester and retained by a student.
///
/// Carries the originating semester by id only; the snapshot store resolves
/// it on demand, so no chain of semester snapshots is ever owned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapitalizedUe {
    pub ue_id: UeId,
    pub ue_code: UeCode,
    pub semester: SemesterId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemesterInfo {
    pub id: SemesterId,
    /// Term number within the program (S1, S2, ...)
    pub term: u32,
    pub title: String,
    pub start_date: NaiveDate,
    pub academic_year_start: i32,
    pub academic_year_end: i32,
}

impl SemesterInfo {
    pub fn display_name(&self) -> String {
        format!(
            "S{} {}-{}",
            self.term, self.academic_year_start, self.academic_year_end
        )
    }
}

/// Per-student, per-UE status handed to bonus rules and threshold checks.
///
/// `current_average` is the average computed in the current semester;
/// `retained_average` is the one actually counted, which differs when a
/// better capitalized occurrence replaces the current one. Mutating bonus
/// rules update the current shadow average and only propagate it to the
/// retained average when the UE is not capitalized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UeStatus {
    pub ue: Ue,
    /// Sum of the module coefficients that produced the current average
    pub coefficient_sum: f64,
    pub current_average: Option<f64>,
    pub retained_average: Option<f64>,
    pub is_capitalized: bool,
}

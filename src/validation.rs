//! Jury codes and curriculum threshold rules.
//!
//! Jury decisions travel as short uppercase codes inherited from the
//! national student-records vocabulary (ADM, ADC, ...). Curriculum rules
//! carry the grade bars a semester or UE average is checked against;
//! different curricula override the per-UE-kind bars.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{UeKind, UeStatus};

/// Comparisons against a bar subtract this first, so an average stored as
/// 9.999999 still passes a 10.0 bar instead of displaying as "10.00,
/// below the bar".
pub const GRADE_TOLERANCE: f64 = 0.00499999999999;

/// Jury decision code for a semester or a UE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JuryCode {
    /// Validated: general average, UE bars and attendance all met
    Adm,
    /// Validated by compensation between semesters
    Adc,
    /// Validated by jury decision
    Adj,
    /// Decision deferred, average not reached
    Att,
    /// Decision deferred, at least one UE below its bar
    Atb,
    /// Decision deferred, insufficient attendance
    Atj,
    /// Not validated
    Aj,
    /// UE acquired because its semester is acquired
    Cmp,
    /// Failed, not allowed to repeat
    Nar,
    /// Awaiting resit
    Rat,
    /// Withdrawn; a state more than a decision, kept for completeness
    Def,
}

impl JuryCode {
    /// True when the code validates the semester it applies to
    pub fn validates_semester(self) -> bool {
        matches!(self, JuryCode::Adm | JuryCode::Adc | JuryCode::Adj)
    }

    /// True when the decision is deferred to a later semester
    pub fn awaits_decision(self) -> bool {
        matches!(self, JuryCode::Att | JuryCode::Atb | JuryCode::Atj)
    }

    /// True when the code validates the UE it applies to
    pub fn validates_ue(self) -> bool {
        matches!(self, JuryCode::Adm | JuryCode::Cmp)
    }

    pub fn explanation(self) -> &'static str {
        match self {
            JuryCode::Adm => "Validated",
            JuryCode::Adc => "Validated by compensation",
            JuryCode::Adj => "Validated by the jury",
            JuryCode::Att => "Decision deferred to another semester (average not reached)",
            JuryCode::Atb => "Decision deferred to another semester (UE below the bar)",
            JuryCode::Atj => "Decision deferred to another semester (insufficient attendance)",
            JuryCode::Aj => "Not validated",
            JuryCode::Cmp => "UE acquired because the semester is acquired",
            JuryCode::Nar => "Failed, not allowed to repeat",
            JuryCode::Rat => "Awaiting resit",
            JuryCode::Def => "Withdrawn",
        }
    }
}

impl fmt::Display for JuryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            JuryCode::Adm => "ADM",
            JuryCode::Adc => "ADC",
            JuryCode::Adj => "ADJ",
            JuryCode::Att => "ATT",
            JuryCode::Atb => "ATB",
            JuryCode::Atj => "ATJ",
            JuryCode::Aj => "AJ",
            JuryCode::Cmp => "CMP",
            JuryCode::Nar => "NAR",
            JuryCode::Rat => "RAT",
            JuryCode::Def => "DEF",
        };
        f.write_str(code)
    }
}

/// Grade bars of one curriculum.
///
/// `ue_bars` overrides the default bar for specific UE kinds; everything
/// else falls back to `ue_bar_default`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurriculumRules {
    /// Bar on the general average for validating the semester
    pub semester_bar: f64,
    /// Bar below which a UE blocks the semester
    pub ue_bar_default: f64,
    pub ue_bars: BTreeMap<UeKind, f64>,
    /// Threshold for capitalizing a UE on its own
    pub ue_validation_bar: f64,
}

impl Default for CurriculumRules {
    fn default() -> Self {
        Self {
            semester_bar: 10.0,
            ue_bar_default: 8.0,
            ue_bars: BTreeMap::new(),
            ue_validation_bar: 10.0,
        }
    }
}

impl CurriculumRules {
    /// Four-semester technology diploma: default bars
    pub fn dut() -> Self {
        Self::default()
    }

    /// Professional licence: no bar on ordinary UEs, but the tutored
    /// project and internship UE must reach 10/20
    pub fn licence_pro() -> Self {
        let mut ue_bars = BTreeMap::new();
        ue_bars.insert(UeKind::InternshipLp, 10.0);
        Self {
            ue_bar_default: 0.0,
            ue_bars,
            ..Self::default()
        }
    }

    /// Bar applicable to a UE of the given kind
    pub fn ue_bar(&self, kind: UeKind, with_tolerance: bool) -> f64 {
        let tolerance = if with_tolerance { GRADE_TOLERANCE } else { 0.0 };
        self.ue_bars.get(&kind).copied().unwrap_or(self.ue_bar_default) - tolerance
    }

    pub fn meets_semester_bar(&self, general_average: f64) -> bool {
        general_average >= self.semester_bar - GRADE_TOLERANCE
    }

    pub fn meets_ue_validation_bar(&self, ue_average: f64) -> bool {
        ue_average >= self.ue_validation_bar - GRADE_TOLERANCE
    }

    /// UEs whose retained average sits below their bar.
    ///
    /// Only UEs that actually weigh something count: zero-coefficient UEs
    /// and UEs without a numeric retained average never block anything.
    pub fn ues_below_bar<'a>(&self, statuses: &'a [UeStatus]) -> Vec<&'a UeStatus> {
        statuses
            .iter()
            .filter(|status| {
                status.coefficient_sum > 0.0
                    && status
                        .retained_average
                        .is_some_and(|avg| avg < self.ue_bar(status.ue.kind, true))
            })
            .collect()
    }

    /// Check every UE against its bar, with a short operator message
    pub fn check_ue_bars(&self, statuses: &[UeStatus]) -> (bool, String) {
        let below = self.ues_below_bar(statuses).len();
        if below == 0 {
            (true, "every UE is above its bar".to_string())
        } else {
            (false, format!("{below} UE below the bar"))
        }
    }
}

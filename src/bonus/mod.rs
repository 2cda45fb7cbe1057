//! Institution-specific bonus rules for sport and culture activities.
//!
//! Modules attached to a `SportCulture` UE never enter any UE average;
//! their scores feed a per-institution bonus formula instead. Most rules
//! return an additive delta on the general average; a few rescale or
//! shift every UE average in place and return the general-average part
//! only. Both forms share the [`BonusRule`] trait, and
//! [`apply_with_guard`] wraps the dispatch with the input checks every
//! call site needs.

pub mod rules;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;

use crate::core::{UeId, UeStatus};

static DEFAULT_REGISTRY: Lazy<BonusRegistry> = Lazy::new(BonusRegistry::with_builtins);

/// Process-wide registry holding the built-in institutional table.
///
/// Callers that need extra rules build their own [`BonusRegistry`] instead;
/// the shared one is immutable.
pub fn default_registry() -> &'static BonusRegistry {
    &DEFAULT_REGISTRY
}

/// Everything a bonus formula may consult or mutate.
///
/// `general_average` is the pre-bonus general average; rules that rescale
/// it directly (rather than returning a delta) mutate it here. `ues` maps
/// each UE to its per-student status so mutating rules can update the
/// shadow averages.
#[derive(Clone, Debug)]
pub struct BonusContext {
    pub general_average: f64,
    pub semester_start: NaiveDate,
    pub ues: BTreeMap<UeId, UeStatus>,
}

impl BonusContext {
    pub fn new(
        general_average: f64,
        semester_start: NaiveDate,
        ues: BTreeMap<UeId, UeStatus>,
    ) -> Self {
        Self {
            general_average,
            semester_start,
            ues,
        }
    }

    /// Strictly after the given policy-change date
    pub fn semester_starts_after(&self, year: i32, month: u32, day: u32) -> bool {
        let start = self.semester_start;
        (start.year(), start.month(), start.day()) > (year, month, day)
    }

    /// Multiply every weighted UE average by `factor`.
    ///
    /// Zero-coefficient UEs are untouched. The current shadow average is
    /// always updated; the retained average only when the UE is not
    /// capitalized, so a capitalized average from an earlier semester is
    /// never rewritten.
    pub fn rescale_ues(&mut self, factor: f64) {
        for status in self.ues.values_mut() {
            if status.coefficient_sum <= 0.0 {
                continue;
            }
            if let Some(current) = status.current_average {
                let updated = current * factor;
                status.current_average = Some(updated);
                if !status.is_capitalized {
                    status.retained_average = Some(updated);
                }
            }
        }
    }

    /// Add `delta` to every weighted UE average, same rules as
    /// [`rescale_ues`](Self::rescale_ues)
    pub fn shift_ues(&mut self, delta: f64) {
        for status in self.ues.values_mut() {
            if status.coefficient_sum <= 0.0 {
                continue;
            }
            if let Some(current) = status.current_average {
                let updated = current + delta;
                status.current_average = Some(updated);
                if !status.is_capitalized {
                    status.retained_average = Some(updated);
                }
            }
        }
    }
}

/// One institution's bonus formula.
///
/// `scores` are the sport/culture module scores, `weights` their module
/// coefficients (many formulas ignore them). The return value is the
/// additive bonus on the general average; rules that mutate the context
/// return the residual additive part (possibly 0).
pub trait BonusRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn apply(&self, scores: &[f64], weights: &[f64], ctx: &mut BonusContext) -> f64;
}

impl fmt::Debug for dyn BonusRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BonusRule({})", self.name())
    }
}

/// Named registry of bonus rules.
///
/// Starts with the built-in institutional table; callers may register
/// additional strategies under their own names. Lookup is by exact name.
pub struct BonusRegistry {
    rules: BTreeMap<&'static str, Box<dyn BonusRule>>,
}

impl BonusRegistry {
    /// Registry with every built-in institutional rule
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            rules: BTreeMap::new(),
        };
        for rule in rules::builtin_rules() {
            registry.register(rule);
        }
        registry
    }

    /// Empty registry, for callers that want full control
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Insert a rule under its own name, replacing any previous holder
    pub fn register(&mut self, rule: Box<dyn BonusRule>) {
        self.rules.insert(rule.name(), rule);
    }

    pub fn get(&self, name: &str) -> Option<&dyn BonusRule> {
        self.rules.get(name).map(Box::as_ref)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for BonusRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for BonusRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BonusRegistry")
            .field("rules", &self.names())
            .finish()
    }
}

/// Dispatch a rule with the standard input guard and fold the result into
/// the general average.
///
/// An empty score list leaves the context untouched and yields 0. Weights
/// summing to zero or less are invalid unless there is exactly one score,
/// in which case the single weight is irrelevant and replaced by 1.0. The
/// returned bonus is added to `ctx.general_average`, capped at 20.0.
pub fn apply_with_guard(
    rule: &dyn BonusRule,
    scores: &[f64],
    weights: &[f64],
    ctx: &mut BonusContext,
) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }

    let bonus = if weights.iter().sum::<f64>() <= 0.0 && weights.len() != 1 {
        log::warn!(
            "bonus rule {}: invalid or null weights {weights:?} for scores {scores:?}",
            rule.name()
        );
        0.0
    } else if weights.len() == 1 {
        rule.apply(scores, &[1.0], ctx)
    } else {
        rule.apply(scores, weights, ctx)
    };

    ctx.general_average = (ctx.general_average + bonus).min(20.0);
    bonus
}

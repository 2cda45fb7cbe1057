//! The built-in table of institutional bonus formulas.
//!
//! Each rule is a faithful transcription of one institution's published
//! practice. Formulas are deliberately left as-is even where they look
//! redundant; institutions change them by policy date, not by cleanup.

use crate::bonus::{BonusContext, BonusRule};

/// Points above 10, one twentieth each.
pub struct Villetaneuse;

impl BonusRule for Villetaneuse {
    fn name(&self) -> &'static str {
        "villetaneuse"
    }

    fn description(&self) -> &'static str {
        "5% of the cumulated points above 10"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], _ctx: &mut BonusContext) -> f64 {
        scores
            .iter()
            .filter(|score| **score > 10.0)
            .map(|score| (score - 10.0) / 20.0)
            .sum()
    }
}

/// Scores are already bonus points; add them as-is.
pub struct Direct;

impl BonusRule for Direct {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn description(&self) -> &'static str {
        "scores added directly to the general average"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], _ctx: &mut BonusContext) -> f64 {
        scores.iter().sum()
    }
}

/// Like villetaneuse but capped at half a point.
pub struct SaintDenis;

impl BonusRule for SaintDenis {
    fn name(&self) -> &'static str {
        "saint_denis"
    }

    fn description(&self) -> &'static str {
        "5% of the points above 10, capped at 0.5"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], _ctx: &mut BonusContext) -> f64 {
        let points: f64 = scores
            .iter()
            .filter(|score| **score > 10.0)
            .map(|score| score - 10.0)
            .sum();
        (points * 0.05).min(0.5)
    }
}

/// Points above 10 capped at 10, then 5%.
pub struct Colmar;

impl BonusRule for Colmar {
    fn name(&self) -> &'static str {
        "colmar"
    }

    fn description(&self) -> &'static str {
        "5% of the points above 10, at most 10 points counted"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], _ctx: &mut BonusContext) -> f64 {
        let points: f64 = scores
            .iter()
            .filter(|score| **score > 10.0)
            .map(|score| score - 10.0)
            .sum();
        points.min(10.0) / 20.0
    }
}

/// Banded flat bonus on the weighted sport average.
pub struct VilleAvray;

impl BonusRule for VilleAvray {
    fn name(&self) -> &'static str {
        "ville_avray"
    }

    fn description(&self) -> &'static str {
        "0.1 / 0.2 / 0.3 points by sport-average band"
    }

    fn apply(&self, scores: &[f64], weights: &[f64], _ctx: &mut BonusContext) -> f64 {
        // the guard ensures a positive weight sum
        let weight_sum: f64 = weights.iter().sum();
        let average: f64 = scores
            .iter()
            .zip(weights.iter())
            .map(|(score, weight)| score * weight)
            .sum::<f64>()
            / weight_sum;
        if average >= 16.0 {
            0.3
        } else if average >= 12.0 {
            0.2
        } else if average >= 10.0 {
            0.1
        } else {
            0.0
        }
    }
}

/// Sport scored 0 to 5; each quarter point is 1% of the general average.
pub struct Grenoble2017;

impl BonusRule for Grenoble2017 {
    fn name(&self) -> &'static str {
        "grenoble_2017"
    }

    fn description(&self) -> &'static str {
        "sport points (0-5) as a percentage of the general average"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], ctx: &mut BonusContext) -> f64 {
        let points: f64 = scores.iter().sum();
        let factor = (points / 4.0) / 100.0;
        ctx.general_average * factor
    }
}

/// 4% of points above 10, 2% before the August 2010 policy change.
pub struct Lille;

impl BonusRule for Lille {
    fn name(&self) -> &'static str {
        "lille"
    }

    fn description(&self) -> &'static str {
        "4% of the points above 10 (2% before August 2010)"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], ctx: &mut BonusContext) -> f64 {
        let divisor = if ctx.semester_starts_after(2010, 8, 1) {
            25.0
        } else {
            50.0
        };
        scores
            .iter()
            .filter(|score| **score > 10.0)
            .map(|score| (score - 10.0) / divisor)
            .sum()
    }
}

/// Multiplies the general average and every UE average by a common factor.
pub struct LeHavre;

impl BonusRule for LeHavre {
    fn name(&self) -> &'static str {
        "le_havre"
    }

    fn description(&self) -> &'static str {
        "rescales general and UE averages by 1 + 0.005 x points above 10"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], ctx: &mut BonusContext) -> f64 {
        let points: f64 = scores
            .iter()
            .filter(|score| **score > 10.0)
            .map(|score| score - 10.0)
            .sum();
        let factor = 1.0 + 0.005 * points.min(10.0);
        ctx.general_average *= factor;
        ctx.rescale_ues(factor);
        // averages were modified in place, nothing left to add
        0.0
    }
}

/// Scores are bonus items worth 0.2 each, total capped at 0.5.
pub struct Nantes;

impl BonusRule for Nantes {
    fn name(&self) -> &'static str {
        "nantes"
    }

    fn description(&self) -> &'static str {
        "sum of declared bonus items, capped at 0.5"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], _ctx: &mut BonusContext) -> f64 {
        scores.iter().sum::<f64>().min(0.5)
    }
}

/// Direct sum capped at one point.
pub struct Tours;

impl BonusRule for Tours {
    fn name(&self) -> &'static str {
        "tours"
    }

    fn description(&self) -> &'static str {
        "sum of sport and culture scores, capped at 1.0"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], _ctx: &mut BonusContext) -> f64 {
        scores.iter().sum::<f64>().min(1.0)
    }
}

/// Capped sum which also lifts every UE average.
pub struct Roanne;

impl BonusRule for Roanne {
    fn name(&self) -> &'static str {
        "roanne"
    }

    fn description(&self) -> &'static str {
        "sum capped at 0.35, added to every UE average as well"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], ctx: &mut BonusContext) -> f64 {
        let bonus = scores.iter().sum::<f64>().min(0.35);
        ctx.shift_ues(bonus);
        bonus
    }
}

/// Single sport score mapped to a percentage of the general average.
pub struct Amiens;

impl BonusRule for Amiens {
    fn name(&self) -> &'static str {
        "amiens"
    }

    fn description(&self) -> &'static str {
        "0.5% to 5% of the general average, by half-point score band"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], ctx: &mut BonusContext) -> f64 {
        let Some(score) = scores.first() else {
            return 0.0;
        };
        if *score < 10.0 {
            return 0.0;
        }
        let percent = (((2.0 * score - 20.0).trunc()) + 2.0) * 0.25;
        let percent = percent.min(5.0);
        ctx.general_average * percent / 100.0
    }
}

/// Direct sum capped at 0.6.
pub struct SaintEtienne;

impl BonusRule for SaintEtienne {
    fn name(&self) -> &'static str {
        "saint_etienne"
    }

    fn description(&self) -> &'static str {
        "sum of declared bonus items, capped at 0.6"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], _ctx: &mut BonusContext) -> f64 {
        scores.iter().sum::<f64>().min(0.6)
    }
}

/// Only the best score counts, one thirtieth of its points above 10.
pub struct Tarbes;

impl BonusRule for Tarbes {
    fn name(&self) -> &'static str {
        "tarbes"
    }

    fn description(&self) -> &'static str {
        "best score only, (score - 10) / 30"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], _ctx: &mut BonusContext) -> f64 {
        scores
            .iter()
            .filter(|score| **score > 10.0)
            .map(|score| (score - 10.0) / 30.0)
            .fold(0.0, f64::max)
    }
}

/// Sport and culture points (0-5 each) as a percentage of the average.
pub struct SaintNazaire;

impl BonusRule for SaintNazaire {
    fn name(&self) -> &'static str {
        "saint_nazaire"
    }

    fn description(&self) -> &'static str {
        "cumulated points, each worth 1% of the general average"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], ctx: &mut BonusContext) -> f64 {
        let points: f64 = scores.iter().sum();
        ctx.general_average * (points / 100.0)
    }
}

/// Best score's points above 10, half a percent each, on every average.
pub struct Bordeaux1;

impl BonusRule for Bordeaux1 {
    fn name(&self) -> &'static str {
        "bordeaux1"
    }

    fn description(&self) -> &'static str {
        "best score above 10 rescales general and UE averages"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], ctx: &mut BonusContext) -> f64 {
        let best = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !best.is_finite() {
            return 0.0;
        }
        let points = (best - 10.0).max(0.0);
        let factor = (points / 2.0) / 100.0;
        let bonus = ctx.general_average * factor;
        ctx.rescale_ues(1.0 + factor);
        bonus
    }
}

/// 2.5% of the weighted sport average; spread over UEs before August 2013.
pub struct Orleans;

/// UEs excluded from the pre-2013 spread (project and internship UEs)
const ORLEANS_EXCLUDED_UE_CODES: &[&str] = &[
    "ORA14", "ORA24", "ORA34", "ORA44", "ORB34", "ORB44", "ORD42", "ORE14", "ORE25", "ORN44",
    "ORO44", "ORP44", "ORV34", "ORV42", "ORV43",
];

impl BonusRule for Orleans {
    fn name(&self) -> &'static str {
        "orleans"
    }

    fn description(&self) -> &'static str {
        "2.5% of the sport average (spread over UEs before August 2013)"
    }

    fn apply(&self, scores: &[f64], weights: &[f64], ctx: &mut BonusContext) -> f64 {
        // the guard ensures a positive weight sum
        let weight_sum: f64 = weights.iter().sum();
        let average: f64 = scores
            .iter()
            .zip(weights.iter())
            .map(|(score, weight)| score * weight)
            .sum::<f64>()
            / weight_sum;
        let bonus = average * 2.5 / 100.0;
        if ctx.semester_starts_after(2013, 8, 1) {
            return bonus;
        }

        // older rule: the bonus lands on each eligible UE and the general
        // average only gets the share of the UE coefficients it touched
        let mut touched_coefficients = 0.0;
        let mut total_coefficients = 0.0;
        for status in ctx.ues.values_mut() {
            total_coefficients += status.coefficient_sum;
            if ORLEANS_EXCLUDED_UE_CODES.contains(&status.ue.code.as_str()) {
                continue;
            }
            if status.coefficient_sum <= 0.0 {
                continue;
            }
            touched_coefficients += status.coefficient_sum;
            if let Some(current) = status.current_average {
                let updated = current + bonus;
                status.current_average = Some(updated);
                if !status.is_capitalized {
                    status.retained_average = Some(updated);
                }
            }
        }
        if total_coefficients == 0.0 {
            return 0.0;
        }
        bonus * touched_coefficients / total_coefficients
    }
}

/// Integer-truncated half-percent of the general average per point.
pub struct Bethune;

impl BonusRule for Bethune {
    fn name(&self) -> &'static str {
        "bethune"
    }

    fn description(&self) -> &'static str {
        "0.5% of the general average per point above 10, truncated"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], ctx: &mut BonusContext) -> f64 {
        let points: f64 = scores
            .iter()
            .filter(|score| **score > 10.0)
            .map(|score| score - 10.0)
            .sum();
        let points = points.min(10.0);
        (ctx.general_average * points / 2.0).trunc() / 100.0
    }
}

/// 3% of points above 10, capped at 0.3.
pub struct Beziers;

impl BonusRule for Beziers {
    fn name(&self) -> &'static str {
        "beziers"
    }

    fn description(&self) -> &'static str {
        "3% of the points above 10, capped at 0.3"
    }

    fn apply(&self, scores: &[f64], _weights: &[f64], _ctx: &mut BonusContext) -> f64 {
        let bonus: f64 = scores
            .iter()
            .filter(|score| **score > 10.0)
            .map(|score| (score - 10.0) * 0.03)
            .sum();
        bonus.min(0.3)
    }
}

/// Developer aid: logs the context it receives and grants nothing.
pub struct Demo;

impl BonusRule for Demo {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn description(&self) -> &'static str {
        "logs the bonus context at debug level, always 0"
    }

    fn apply(&self, scores: &[f64], weights: &[f64], ctx: &mut BonusContext) -> f64 {
        log::debug!("bonus demo: scores={scores:?} weights={weights:?} context={ctx:?}");
        0.0
    }
}

/// Every built-in rule, in registration order.
pub fn builtin_rules() -> Vec<Box<dyn BonusRule>> {
    vec![
        Box::new(Villetaneuse),
        Box::new(Direct),
        Box::new(SaintDenis),
        Box::new(Colmar),
        Box::new(VilleAvray),
        Box::new(Grenoble2017),
        Box::new(Lille),
        Box::new(LeHavre),
        Box::new(Nantes),
        Box::new(Tours),
        Box::new(Roanne),
        Box::new(Amiens),
        Box::new(SaintEtienne),
        Box::new(Tarbes),
        Box::new(SaintNazaire),
        Box::new(Bordeaux1),
        Box::new(Orleans),
        Box::new(Bethune),
        Box::new(Beziers),
        Box::new(Demo),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Ue, UeCode, UeId, UeKind, UeStatus};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn context(general_average: f64) -> BonusContext {
        BonusContext::new(
            general_average,
            NaiveDate::from_ymd_opt(2019, 9, 2).unwrap(),
            BTreeMap::new(),
        )
    }

    fn context_starting(year: i32, month: u32, day: u32) -> BonusContext {
        BonusContext::new(
            10.0,
            NaiveDate::from_ymd_opt(year, month, day).unwrap(),
            BTreeMap::new(),
        )
    }

    fn ue(id: &str, code: &str, coefficient_sum: f64, average: f64, capitalized: bool) -> UeStatus {
        UeStatus {
            ue: Ue {
                id: UeId::new(id),
                code: UeCode::new(code),
                short_name: code.to_string(),
                kind: UeKind::Standard,
            },
            coefficient_sum,
            current_average: Some(average),
            retained_average: Some(average),
            is_capitalized: capitalized,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn villetaneuse_takes_a_twentieth_of_points_above_ten() {
        let bonus = Villetaneuse.apply(&[12.0, 14.0, 9.0], &[], &mut context(10.0));
        assert!(close(bonus, 0.3));
    }

    #[test]
    fn direct_sums_everything() {
        let bonus = Direct.apply(&[0.25, 0.5], &[], &mut context(10.0));
        assert!(close(bonus, 0.75));
    }

    #[test]
    fn saint_denis_caps_at_half_a_point() {
        let bonus = SaintDenis.apply(&[15.0, 18.0], &[], &mut context(10.0));
        assert_eq!(bonus, 0.5);
        let small = SaintDenis.apply(&[12.0], &[], &mut context(10.0));
        assert!(close(small, 0.1));
    }

    #[test]
    fn colmar_counts_at_most_ten_points() {
        let bonus = Colmar.apply(&[15.0, 18.0], &[], &mut context(10.0));
        assert_eq!(bonus, 0.5);
        let small = Colmar.apply(&[14.0], &[], &mut context(10.0));
        assert!(close(small, 0.2));
    }

    #[test]
    fn ville_avray_bands() {
        let mut ctx = context(10.0);
        assert_eq!(VilleAvray.apply(&[16.0], &[1.0], &mut ctx), 0.3);
        assert_eq!(VilleAvray.apply(&[12.0], &[1.0], &mut ctx), 0.2);
        assert_eq!(VilleAvray.apply(&[10.0], &[1.0], &mut ctx), 0.1);
        assert_eq!(VilleAvray.apply(&[9.9], &[1.0], &mut ctx), 0.0);
        // weighted average decides the band
        assert_eq!(VilleAvray.apply(&[16.0, 8.0], &[1.0, 1.0], &mut ctx), 0.2);
    }

    #[test]
    fn grenoble_scales_with_the_general_average() {
        let bonus = Grenoble2017.apply(&[2.0, 1.0], &[], &mut context(12.0));
        assert!(close(bonus, 12.0 * (3.0 / 4.0) / 100.0));
    }

    #[test]
    fn lille_rate_depends_on_the_policy_date() {
        let recent = Lille.apply(&[14.0], &[], &mut context_starting(2010, 9, 1));
        assert!(close(recent, 0.16));
        let old = Lille.apply(&[14.0], &[], &mut context_starting(2010, 7, 1));
        assert!(close(old, 0.08));
    }

    #[test]
    fn le_havre_rescales_in_place_and_returns_zero() {
        let mut ctx = context(10.0);
        ctx.ues.insert(UeId::new("ue-1"), ue("ue-1", "UE11", 8.0, 12.0, false));
        let bonus = LeHavre.apply(&[15.0, 12.0], &[], &mut ctx);
        assert_eq!(bonus, 0.0);
        assert!(close(ctx.general_average, 10.0 * 1.035));
        let status = &ctx.ues[&UeId::new("ue-1")];
        assert!(close(status.current_average.unwrap(), 12.0 * 1.035));
    }

    #[test]
    fn nantes_caps_at_exactly_half_a_point() {
        let bonus = Nantes.apply(&[0.3, 0.4], &[], &mut context(10.0));
        assert_eq!(bonus, 0.5);
    }

    #[test]
    fn tours_caps_at_one_point() {
        let bonus = Tours.apply(&[0.7, 0.6], &[], &mut context(10.0));
        assert_eq!(bonus, 1.0);
    }

    #[test]
    fn roanne_shifts_ues_by_the_capped_bonus() {
        let mut ctx = context(10.0);
        ctx.ues.insert(UeId::new("ue-1"), ue("ue-1", "UE11", 8.0, 11.0, false));
        let bonus = Roanne.apply(&[0.2, 0.25], &[], &mut ctx);
        assert_eq!(bonus, 0.35);
        let status = &ctx.ues[&UeId::new("ue-1")];
        assert_eq!(status.current_average, Some(11.35));
    }

    #[test]
    fn amiens_bands_and_caps() {
        assert_eq!(Amiens.apply(&[9.9], &[], &mut context(10.0)), 0.0);
        // 10.00 to 10.49 is the 0.5% band
        let low = Amiens.apply(&[10.2], &[], &mut context(10.0));
        assert!(close(low, 0.05));
        // 13.00 to 13.49 is the 2% band
        let mid = Amiens.apply(&[13.2], &[], &mut context(10.0));
        assert!(close(mid, 0.2));
        // the percentage never exceeds 5%
        let high = Amiens.apply(&[19.75], &[], &mut context(10.0));
        assert!(close(high, 0.5));
    }

    #[test]
    fn saint_etienne_caps_at_point_six() {
        let bonus = SaintEtienne.apply(&[0.35, 0.3], &[], &mut context(10.0));
        assert_eq!(bonus, 0.6);
    }

    #[test]
    fn tarbes_keeps_only_the_best_score() {
        let bonus = Tarbes.apply(&[14.0, 16.0], &[], &mut context(10.0));
        assert!(close(bonus, 0.2));
        let nothing = Tarbes.apply(&[8.0, 9.5], &[], &mut context(10.0));
        assert_eq!(nothing, 0.0);
    }

    #[test]
    fn saint_nazaire_is_a_percentage_of_the_average() {
        let bonus = SaintNazaire.apply(&[2.0, 3.0], &[], &mut context(14.0));
        assert!(close(bonus, 0.7));
    }

    #[test]
    fn bordeaux_uses_the_best_score_and_rescales_ues() {
        let mut ctx = context(12.0);
        ctx.ues.insert(UeId::new("ue-1"), ue("ue-1", "UE11", 8.0, 10.0, false));
        let bonus = Bordeaux1.apply(&[13.0, 11.0], &[], &mut ctx);
        assert!(close(bonus, 12.0 * 0.015));
        let status = &ctx.ues[&UeId::new("ue-1")];
        assert!(close(status.current_average.unwrap(), 10.0 * 1.015));
        assert_eq!(Bordeaux1.apply(&[], &[], &mut context(12.0)), 0.0);
    }

    #[test]
    fn orleans_after_the_pivot_touches_only_the_general_average() {
        let mut ctx = context_starting(2013, 9, 1);
        ctx.ues.insert(UeId::new("ue-1"), ue("ue-1", "UE11", 10.0, 11.0, false));
        let bonus = Orleans.apply(&[12.0], &[1.0], &mut ctx);
        assert!(close(bonus, 0.3));
        let status = &ctx.ues[&UeId::new("ue-1")];
        assert_eq!(status.current_average, Some(11.0));
    }

    #[test]
    fn orleans_before_the_pivot_spreads_over_eligible_ues() {
        let mut ctx = context_starting(2012, 9, 1);
        ctx.ues.insert(UeId::new("ue-1"), ue("ue-1", "ORA14", 10.0, 11.0, false));
        ctx.ues.insert(UeId::new("ue-2"), ue("ue-2", "ORX12", 10.0, 12.0, false));
        let bonus = Orleans.apply(&[12.0], &[1.0], &mut ctx);

        // only half of the coefficients were eligible
        assert!(close(bonus, 0.3 * 10.0 / 20.0));
        let excluded = &ctx.ues[&UeId::new("ue-1")];
        assert_eq!(excluded.current_average, Some(11.0));
        let touched = &ctx.ues[&UeId::new("ue-2")];
        assert!(close(touched.current_average.unwrap(), 12.3));
    }

    #[test]
    fn bethune_truncates_to_the_percent() {
        // 12.37 x 2 / 2 = 12.37, truncated to 12, so 0.12 points
        let bonus = Bethune.apply(&[12.0], &[], &mut context(12.37));
        assert_eq!(bonus, 0.12);
    }

    #[test]
    fn beziers_caps_at_point_three() {
        let bonus = Beziers.apply(&[18.0, 16.0], &[], &mut context(10.0));
        assert_eq!(bonus, 0.3);
        let small = Beziers.apply(&[12.0], &[], &mut context(10.0));
        assert!(close(small, 0.06));
    }

    #[test]
    fn demo_grants_nothing() {
        assert_eq!(Demo.apply(&[15.0], &[1.0], &mut context(10.0)), 0.0);
    }

    #[test]
    fn builtin_table_is_complete() {
        let names: Vec<&str> = builtin_rules().iter().map(|rule| rule.name()).collect();
        assert_eq!(names.len(), 20);
        assert!(names.contains(&"villetaneuse"));
        assert!(names.contains(&"demo"));
    }

    #[test]
    fn every_rule_defaults_to_zero_on_empty_scores() {
        for rule in builtin_rules() {
            let mut ctx = context(12.0);
            let bonus = rule.apply(&[], &[1.0], &mut ctx);
            assert_eq!(bonus, 0.0, "rule {} granted a bonus without scores", rule.name());
        }
    }
}

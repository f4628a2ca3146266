//! Feed scorer
//!
//! Deterministic, explainable scoring of one candidate for one viewer:
//!
//! | component  | range | rule |
//! |------------|-------|------|
//! | interest   | 0–40  | 40 × \|shared\| / \|union\|, 0 if either set is empty |
//! | age        | 0–30  | full inside the viewer's range, linear decay to 0 over the grace band |
//! | preference | 0–30  | full if preferences hold in both directions, else 0 |
//!
//! All arithmetic is `Decimal`, rounded to `SCORE_DP` places, so the same
//! inputs give bit-identical scores on every platform.

use std::cmp::Ordering;
use std::collections::HashSet;

use rust_decimal::Decimal;
use types::feed::{ScoreComponents, ScoredCandidate};
use types::ids::UserId;
use types::profile::UserProfile;

use crate::config::ScoringConfig;

/// Decimal places kept on every score
pub const SCORE_DP: u32 = 4;

/// Score one candidate for `user`
pub fn score(user: &UserProfile, candidate: &UserProfile, config: &ScoringConfig) -> ScoredCandidate {
    let components = ScoreComponents {
        interest_score: interest_score(user, candidate, config.interest_max),
        age_score: age_score(user, candidate, config.age_max, config.age_grace_years),
        preference_score: preference_score(user, candidate, config.preference_max),
    };

    let total = (components.interest_score + components.age_score + components.preference_score)
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        .round_dp(SCORE_DP);

    ScoredCandidate {
        candidate_id: candidate.user_id,
        score: total,
        components,
        last_active_at: candidate.last_active_at,
        created_at: candidate.created_at,
    }
}

/// Jaccard overlap of interests scaled to `max`
pub fn interest_score(user: &UserProfile, candidate: &UserProfile, max: Decimal) -> Decimal {
    let mine = user.normalized_interests();
    let theirs = candidate.normalized_interests();
    if mine.is_empty() || theirs.is_empty() {
        return Decimal::ZERO;
    }

    let shared = mine.intersection(&theirs).count();
    let union = mine.union(&theirs).count();

    (max * Decimal::from(shared) / Decimal::from(union))
        .clamp(Decimal::ZERO, max)
        .round_dp(SCORE_DP)
}

/// Candidate age against the viewer's range
pub fn age_score(user: &UserProfile, candidate: &UserProfile, max: Decimal, grace_years: u8) -> Decimal {
    let prefs = &user.preferences;
    if prefs.admits_age(candidate.age) {
        return max;
    }

    let distance = if candidate.age < prefs.min_age {
        prefs.min_age - candidate.age
    } else {
        candidate.age - prefs.max_age
    };
    if grace_years == 0 || distance >= grace_years {
        return Decimal::ZERO;
    }

    let remaining = Decimal::from(grace_years - distance);
    (max * remaining / Decimal::from(grace_years))
        .clamp(Decimal::ZERO, max)
        .round_dp(SCORE_DP)
}

/// Full score when both sides' preferences admit each other
pub fn preference_score(user: &UserProfile, candidate: &UserProfile, max: Decimal) -> Decimal {
    if preferences_compatible(user, candidate) {
        max
    } else {
        Decimal::ZERO
    }
}

/// Mutual preference gate
///
/// The viewer wants the candidate's gender, the candidate wants the
/// viewer's gender, and the candidate's age range admits the viewer. The
/// viewer's own age range is graded by `age_score` instead.
pub fn preferences_compatible(user: &UserProfile, candidate: &UserProfile) -> bool {
    user.preferences.admits_gender(candidate.gender)
        && candidate.preferences.admits_gender(user.gender)
        && candidate.preferences.admits_age(user.age)
}

/// Feed order: score descending, then most recently active, then newest
/// account, then id
pub fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.last_active_at.cmp(&a.last_active_at))
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.candidate_id.cmp(&b.candidate_id))
}

/// Filter, score and order a candidate pool for `user`
///
/// Exclusions are applied before scoring.
pub fn rank(
    user: &UserProfile,
    candidates: &[UserProfile],
    excluded: &HashSet<UserId>,
    config: &ScoringConfig,
) -> Vec<ScoredCandidate> {
    let mut ranked: Vec<ScoredCandidate> = candidates
        .iter()
        .filter(|c| c.user_id != user.user_id && !excluded.contains(&c.user_id))
        .filter(|c| !config.exclude_preference_mismatch || preferences_compatible(user, c))
        .map(|c| score(user, c, config))
        .collect();

    ranked.sort_by(compare);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use types::profile::{Gender, Preferences};

    fn person(age: u8, gender: Gender, interests: &[&str], prefs: Preferences) -> UserProfile {
        UserProfile {
            user_id: UserId::new(),
            age,
            gender,
            interests: interests.iter().map(|s| s.to_string()).collect(),
            preferences: prefs,
            created_at: 0,
            last_active_at: 0,
        }
    }

    fn prefs(min: u8, max: u8, genders: &[Gender]) -> Preferences {
        Preferences {
            min_age: min,
            max_age: max,
            interested_in: genders.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        let cfg = ScoringConfig::default();
        let a = person(30, Gender::Female, &["hiking", "jazz"], prefs(25, 35, &[Gender::Male]));
        let b = person(32, Gender::Male, &["hiking", "film"], prefs(25, 35, &[Gender::Female]));

        let scored = score(&a, &b, &cfg);
        assert_eq!(scored.components.interest_score, dec("13.3333"));
        assert_eq!(scored.components.age_score, dec("30"));
        assert_eq!(scored.components.preference_score, dec("30"));
        assert_eq!(scored.score, dec("73.3333"));
    }

    #[test]
    fn test_empty_interests_score_zero() {
        let cfg = ScoringConfig::default();
        let a = person(30, Gender::Female, &[], Preferences::default());
        let b = person(30, Gender::Male, &["hiking"], Preferences::default());
        assert_eq!(interest_score(&a, &b, cfg.interest_max), Decimal::ZERO);
        assert_eq!(interest_score(&b, &a, cfg.interest_max), Decimal::ZERO);
    }

    #[test]
    fn test_identical_interests_full_score() {
        let cfg = ScoringConfig::default();
        let a = person(30, Gender::Female, &["Hiking", "jazz"], Preferences::default());
        let b = person(30, Gender::Male, &["hiking", "JAZZ "], Preferences::default());
        assert_eq!(interest_score(&a, &b, cfg.interest_max), dec("40"));
    }

    #[test]
    fn test_age_decay() {
        let max = dec("30");
        let viewer = person(30, Gender::Female, &[], prefs(25, 35, &[]));
        let at = |age| person(age, Gender::Male, &[], Preferences::default());

        assert_eq!(age_score(&viewer, &at(35), max, 5), dec("30"));
        assert_eq!(age_score(&viewer, &at(36), max, 5), dec("24"));
        assert_eq!(age_score(&viewer, &at(38), max, 5), dec("12"));
        assert_eq!(age_score(&viewer, &at(40), max, 5), Decimal::ZERO);
        assert_eq!(age_score(&viewer, &at(22), max, 5), dec("12"));
        assert_eq!(age_score(&viewer, &at(36), max, 0), Decimal::ZERO);
    }

    #[test]
    fn test_preference_gate_is_mutual() {
        let a = person(30, Gender::Female, &[], prefs(25, 35, &[Gender::Male]));
        let b_not_into_a = person(32, Gender::Male, &[], prefs(25, 35, &[Gender::Male]));
        let b_too_young_for_a = person(32, Gender::Male, &[], prefs(18, 28, &[Gender::Female]));
        let b_ok = person(32, Gender::Male, &[], prefs(25, 35, &[]));

        assert!(!preferences_compatible(&a, &b_not_into_a));
        assert!(!preferences_compatible(&a, &b_too_young_for_a));
        assert!(preferences_compatible(&a, &b_ok));
    }

    #[test]
    fn test_rank_excludes_before_scoring_and_orders() {
        let cfg = ScoringConfig::default();
        let viewer = person(30, Gender::Female, &["hiking", "jazz"], prefs(25, 35, &[Gender::Male]));

        let best = person(31, Gender::Male, &["hiking", "jazz"], Preferences::default());
        let mid = person(31, Gender::Male, &["hiking"], Preferences::default());
        let swiped = person(31, Gender::Male, &["hiking", "jazz"], Preferences::default());
        let wrong_gender = person(31, Gender::Female, &["hiking", "jazz"], Preferences::default());

        let pool = vec![mid.clone(), swiped.clone(), wrong_gender, best.clone(), viewer.clone()];
        let excluded: HashSet<UserId> = [swiped.user_id].into_iter().collect();

        let ranked = rank(&viewer, &pool, &excluded, &cfg);
        let ids: Vec<UserId> = ranked.iter().map(|c| c.candidate_id).collect();
        assert_eq!(ids, vec![best.user_id, mid.user_id]);
    }

    #[test]
    fn test_tie_break_newest_active_first() {
        let cfg = ScoringConfig::default();
        let viewer = person(30, Gender::Female, &["jazz"], Preferences::default());

        let mut stale = person(30, Gender::Male, &["jazz"], Preferences::default());
        stale.last_active_at = 100;
        let mut fresh = person(30, Gender::Male, &["jazz"], Preferences::default());
        fresh.last_active_at = 200;
        let mut fresh_new_account = person(30, Gender::Male, &["jazz"], Preferences::default());
        fresh_new_account.last_active_at = 200;
        fresh_new_account.created_at = 50;

        let ranked = rank(
            &viewer,
            &[stale.clone(), fresh.clone(), fresh_new_account.clone()],
            &HashSet::new(),
            &cfg,
        );
        let ids: Vec<UserId> = ranked.iter().map(|c| c.candidate_id).collect();
        assert_eq!(ids, vec![fresh_new_account.user_id, fresh.user_id, stale.user_id]);
    }
}

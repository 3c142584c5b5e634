//! Achievement badge types and the threshold eligibility rules.
//!
//! Badges are a ratchet: once awarded they are never revoked, even if the
//! counter that triggered them later drops (mining can be stopped; referral
//! counts cannot decrease). Eligibility is a pure function of the current
//! counters so recomputation is idempotent and safe to re-trigger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BadgeType {
    #[serde(rename = "referrals_5")]
    Referrals5,
    #[serde(rename = "referrals_10")]
    Referrals10,
    #[serde(rename = "referrals_25")]
    Referrals25,
    #[serde(rename = "referrals_50")]
    Referrals50,
    #[serde(rename = "mining_week_1")]
    MiningWeek1,
    #[serde(rename = "mining_month_1")]
    MiningMonth1,
    #[serde(rename = "mining_year_1")]
    MiningYear1,
}

impl BadgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeType::Referrals5 => "referrals_5",
            BadgeType::Referrals10 => "referrals_10",
            BadgeType::Referrals25 => "referrals_25",
            BadgeType::Referrals50 => "referrals_50",
            BadgeType::MiningWeek1 => "mining_week_1",
            BadgeType::MiningMonth1 => "mining_month_1",
            BadgeType::MiningYear1 => "mining_year_1",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "referrals_5" => Some(BadgeType::Referrals5),
            "referrals_10" => Some(BadgeType::Referrals10),
            "referrals_25" => Some(BadgeType::Referrals25),
            "referrals_50" => Some(BadgeType::Referrals50),
            "mining_week_1" => Some(BadgeType::MiningWeek1),
            "mining_month_1" => Some(BadgeType::MiningMonth1),
            "mining_year_1" => Some(BadgeType::MiningYear1),
            _ => None,
        }
    }
}

const REFERRAL_TIERS: &[(i32, BadgeType)] = &[
    (5, BadgeType::Referrals5),
    (10, BadgeType::Referrals10),
    (25, BadgeType::Referrals25),
    (50, BadgeType::Referrals50),
];

/// Whole calendar days since mining started. Measured from the current
/// `mining_started_at` only; a stop/restart resets the clock.
const MINING_DAY_TIERS: &[(i64, BadgeType)] = &[
    (7, BadgeType::MiningWeek1),
    (30, BadgeType::MiningMonth1),
    (365, BadgeType::MiningYear1),
];

/// Every badge the given counters qualify for right now. Tiers are cumulative
/// and independent: 50 referrals qualifies for all four referral badges.
pub fn eligible_badges(
    referral_count: i32,
    mining_started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<BadgeType> {
    let mut eligible = Vec::new();

    for &(threshold, badge) in REFERRAL_TIERS {
        if referral_count >= threshold {
            eligible.push(badge);
        }
    }

    if let Some(started_at) = mining_started_at {
        let days = (now - started_at).num_days();
        for &(threshold, badge) in MINING_DAY_TIERS {
            if days >= threshold {
                eligible.push(badge);
            }
        }
    }

    eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn no_badges_below_first_threshold() {
        assert!(eligible_badges(4, None, Utc::now()).is_empty());
        assert!(eligible_badges(0, None, Utc::now()).is_empty());
    }

    #[test]
    fn referral_tiers_are_cumulative() {
        let now = Utc::now();
        assert_eq!(eligible_badges(5, None, now), vec![BadgeType::Referrals5]);
        assert_eq!(
            eligible_badges(10, None, now),
            vec![BadgeType::Referrals5, BadgeType::Referrals10]
        );
        assert_eq!(
            eligible_badges(50, None, now),
            vec![
                BadgeType::Referrals5,
                BadgeType::Referrals10,
                BadgeType::Referrals25,
                BadgeType::Referrals50,
            ]
        );
    }

    #[test]
    fn no_mining_badges_when_not_mining() {
        assert!(eligible_badges(0, None, Utc::now()).is_empty());
    }

    #[test]
    fn mining_week_badge_after_seven_whole_days() {
        let now = Utc::now();
        assert_eq!(
            eligible_badges(0, Some(now - Duration::days(8)), now),
            vec![BadgeType::MiningWeek1]
        );
        // exactly 7 days counts
        assert_eq!(
            eligible_badges(0, Some(now - Duration::days(7)), now),
            vec![BadgeType::MiningWeek1]
        );
        // 6 days and 23 hours floors to 6
        assert!(eligible_badges(
            0,
            Some(now - Duration::days(6) - Duration::hours(23)),
            now
        )
        .is_empty());
    }

    #[test]
    fn mining_tiers_only_award_crossed_thresholds() {
        let now = Utc::now();
        let badges = eligible_badges(0, Some(now - Duration::days(31)), now);
        assert_eq!(badges, vec![BadgeType::MiningWeek1, BadgeType::MiningMonth1]);

        let badges = eligible_badges(0, Some(now - Duration::days(400)), now);
        assert_eq!(
            badges,
            vec![
                BadgeType::MiningWeek1,
                BadgeType::MiningMonth1,
                BadgeType::MiningYear1,
            ]
        );
    }

    #[test]
    fn future_start_awards_nothing() {
        let now = Utc::now();
        assert!(eligible_badges(0, Some(now + Duration::days(1)), now).is_empty());
    }

    #[test]
    fn referral_and_mining_tiers_combine() {
        let now = Utc::now();
        let badges = eligible_badges(10, Some(now - Duration::days(8)), now);
        assert_eq!(
            badges,
            vec![
                BadgeType::Referrals5,
                BadgeType::Referrals10,
                BadgeType::MiningWeek1,
            ]
        );
    }

    #[test]
    fn badge_names_round_trip() {
        for badge in [
            BadgeType::Referrals5,
            BadgeType::Referrals10,
            BadgeType::Referrals25,
            BadgeType::Referrals50,
            BadgeType::MiningWeek1,
            BadgeType::MiningMonth1,
            BadgeType::MiningYear1,
        ] {
            assert_eq!(BadgeType::parse(badge.as_str()), Some(badge));
        }
        assert_eq!(BadgeType::parse("referrals_100"), None);
    }
}

//! Mastery state machine
//!
//! Per `(user, node)`: absent → started → completed. Graded events add their
//! points to the level, capped at [`MAX_MASTERY_LEVEL`]. Nothing leaves
//! `completed`, and mastery never decays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ceiling of the mastery percentage
pub const MAX_MASTERY_LEVEL: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryStatus {
    Started,
    Completed,
}

impl MasteryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MasteryStatus::Started => "started",
            MasteryStatus::Completed => "completed",
        }
    }

    /// Status implied by a level; keeps the two fields from diverging
    pub fn for_level(level: i64) -> Self {
        if level >= MAX_MASTERY_LEVEL {
            MasteryStatus::Completed
        } else {
            MasteryStatus::Started
        }
    }
}

impl std::str::FromStr for MasteryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(MasteryStatus::Started),
            "completed" => Ok(MasteryStatus::Completed),
            other => Err(format!("unknown mastery status: {}", other)),
        }
    }
}

/// Learner progress on one curriculum node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryRecord {
    pub user_id: String,
    pub node_id: i64,
    pub status: MasteryStatus,
    /// 0..=100
    pub mastery_level: i64,
    pub last_activity: DateTime<Utc>,
}

impl MasteryRecord {
    /// Apply one graded event worth `points` (must be positive)
    ///
    /// `existing = None` is the absent state.
    pub fn apply_event(
        existing: Option<MasteryRecord>,
        user_id: &str,
        node_id: i64,
        points: i64,
        now: DateTime<Utc>,
    ) -> MasteryRecord {
        debug_assert!(points > 0, "graded events carry positive points");

        match existing {
            None => {
                let level = points.clamp(0, MAX_MASTERY_LEVEL);
                MasteryRecord {
                    user_id: user_id.to_string(),
                    node_id,
                    status: MasteryStatus::for_level(level),
                    mastery_level: level,
                    last_activity: now,
                }
            }
            Some(mut record) => {
                if record.status == MasteryStatus::Started {
                    let level = record
                        .mastery_level
                        .saturating_add(points.max(0))
                        .min(MAX_MASTERY_LEVEL);
                    record.mastery_level = level;
                    record.status = MasteryStatus::for_level(level);
                }
                record.last_activity = now;
                record
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MasteryStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_5_5_90_sequence() {
        let r1 = MasteryRecord::apply_event(None, "u1", 279, 5, t(0));
        assert_eq!((r1.status, r1.mastery_level), (MasteryStatus::Started, 5));

        let r2 = MasteryRecord::apply_event(Some(r1), "u1", 279, 5, t(1));
        assert_eq!((r2.status, r2.mastery_level), (MasteryStatus::Started, 10));

        let r3 = MasteryRecord::apply_event(Some(r2), "u1", 279, 90, t(2));
        assert_eq!((r3.status, r3.mastery_level), (MasteryStatus::Completed, 100));
        assert_eq!(r3.last_activity, t(2));
    }

    #[test]
    fn test_overshoot_is_clamped() {
        let r1 = MasteryRecord::apply_event(None, "u1", 1, 60, t(0));
        let r2 = MasteryRecord::apply_event(Some(r1), "u1", 1, 70, t(1));
        assert_eq!(r2.mastery_level, 100);
        assert!(r2.is_completed());
    }

    #[test]
    fn test_first_event_can_complete() {
        let r = MasteryRecord::apply_event(None, "u1", 1, 150, t(0));
        assert_eq!((r.status, r.mastery_level), (MasteryStatus::Completed, 100));
    }

    #[test]
    fn test_completed_is_terminal() {
        let done = MasteryRecord::apply_event(None, "u1", 1, 100, t(0));
        let after = MasteryRecord::apply_event(Some(done), "u1", 1, 5, t(0) + Duration::hours(3));
        assert_eq!(after.status, MasteryStatus::Completed);
        assert_eq!(after.mastery_level, 100);
        assert_eq!(after.last_activity, t(0) + Duration::hours(3));
    }

    #[test]
    fn test_ceiling_and_status_invariant_over_sequences() {
        let mut rng = StdRng::seed_from_u64(0x2545_F491_4F6C_DD1D);
        for _ in 0..200 {
            let mut record: Option<MasteryRecord> = None;
            let mut previous = 0;
            let mut was_completed = false;
            for step in 0..12 {
                let points: i64 = rng.gen_range(1..=40);

                let next = MasteryRecord::apply_event(record.take(), "u", 9, points, t(step));
                assert!(next.mastery_level >= previous, "level never decreases");
                assert!(next.mastery_level <= MAX_MASTERY_LEVEL);
                assert_eq!(next.is_completed(), next.mastery_level == MAX_MASTERY_LEVEL);
                if was_completed {
                    assert!(next.is_completed(), "completed never reverts");
                }
                previous = next.mastery_level;
                was_completed = next.is_completed();
                record = Some(next);
            }
        }
    }
}

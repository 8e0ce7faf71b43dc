//! Incremental maintenance of a movie's (average, count) pair.
//!
//! The average is rebuilt from the stored `average * count` product instead of
//! a running sum, so only the two persisted fields are needed. The `max(.., 1)`
//! guards keep the division defined once the count reaches zero; an aggregate
//! with `count == 0` carries no meaningful average (see [`Aggregate::mean`]).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub average: f64,
    pub count: i64,
}

/// A single score event against an aggregate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreChange {
    Add(f64),
    Replace { old: f64, new: f64 },
    Remove(f64),
}

impl Default for Aggregate {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aggregate {
    pub const EMPTY: Aggregate = Aggregate {
        average: 0.0,
        count: 0,
    };

    pub fn new(average: f64, count: i64) -> Self {
        Self { average, count }
    }

    /// The average, or `None` while nothing has been rated.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.average)
    }

    pub fn apply(self, change: ScoreChange) -> Self {
        match change {
            ScoreChange::Add(score) => add(self, score),
            ScoreChange::Replace { old, new } => replace(self, old, new),
            ScoreChange::Remove(score) => remove(self, score),
        }
    }
}

pub fn add(agg: Aggregate, score: f64) -> Aggregate {
    let count = agg.count + 1;
    Aggregate {
        average: (agg.average * agg.count as f64 + score) / count as f64,
        count,
    }
}

/// A replace never changes the number of participants.
pub fn replace(agg: Aggregate, old: f64, new: f64) -> Aggregate {
    Aggregate {
        average: (agg.average * agg.count as f64 - old + new) / agg.count.max(1) as f64,
        count: agg.count,
    }
}

pub fn remove(agg: Aggregate, score: f64) -> Aggregate {
    Aggregate {
        average: (agg.average * agg.count as f64 - score) / (agg.count - 1).max(1) as f64,
        count: (agg.count - 1).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_close(actual: Aggregate, average: f64, count: i64) {
        assert_eq!(actual.count, count);
        assert!(
            (actual.average - average).abs() < EPS,
            "expected average {average}, got {}",
            actual.average
        );
    }

    #[test]
    fn test_first_rating_becomes_average() {
        let agg = Aggregate::EMPTY.apply(ScoreChange::Add(4.5));
        assert_close(agg, 4.5, 1);
    }

    #[test]
    fn test_add_then_remove_restores_original() {
        let starts = [
            Aggregate::new(3.2, 5),
            Aggregate::new(0.0, 1),
            Aggregate::new(4.75, 4),
            Aggregate::new(2.5, 1000),
        ];
        for start in starts {
            for score in [0.0, 1.3, 2.5, 5.0] {
                let back = start
                    .apply(ScoreChange::Add(score))
                    .apply(ScoreChange::Remove(score));
                assert_close(back, start.average, start.count);
            }
        }
    }

    #[test]
    fn test_replace_preserves_count() {
        let agg = Aggregate::EMPTY
            .apply(ScoreChange::Add(4.0))
            .apply(ScoreChange::Add(4.0));
        assert_close(agg, 4.0, 2);

        let agg = agg.apply(ScoreChange::Replace { old: 4.0, new: 5.0 });
        assert_close(agg, 4.5, 2);
    }

    #[test]
    fn test_remove_decrements() {
        let agg = Aggregate::new(4.5, 2).apply(ScoreChange::Remove(5.0));
        assert_close(agg, 4.0, 1);
    }

    #[test]
    fn test_remove_last_rating_reports_no_mean() {
        let agg = Aggregate::new(3.0, 1).apply(ScoreChange::Remove(3.0));
        assert_close(agg, 0.0, 0);
        assert_eq!(agg.mean(), None);
    }

    #[test]
    fn test_count_never_goes_negative() {
        let agg = Aggregate::EMPTY.apply(ScoreChange::Remove(2.0));
        assert_eq!(agg.count, 0);
    }

    #[test]
    fn test_replace_on_empty_is_guarded() {
        let agg = Aggregate::EMPTY.apply(ScoreChange::Replace { old: 1.0, new: 2.0 });
        assert_eq!(agg.count, 0);
        assert!(agg.average.is_finite());
    }
}

//! Achievement/wellbeing correlation statistics.
//!
//! Pure functions over caller-supplied documents: no I/O, no clock, no
//! errors. Degenerate inputs produce degenerate-but-valid outputs (zero
//! rates, empty buckets) rather than panics.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::dto::{DailyRecordInput, HabitLogInput};

pub const SLEEP_BUCKET_LABELS: [&str; 4] = ["<6h", "6-8h", "8-10h", ">10h"];
pub const MOOD_BUCKET_LABELS: [&str; 3] = ["1-2 (poor)", "3 (neutral)", "4-5 (good)"];

/// Denominator stand-in when the caller supplies no daily records, so the
/// rate stays defined over sparse data. Not a calendar-day count.
const FALLBACK_DAYS_IN_PERIOD: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketStat {
    pub label: &'static str,
    pub achieved: u32,
    pub total: u32,
}

impl BucketStat {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            achieved: 0,
            total: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationStats {
    /// Whole-percent achievement rate, always within 0..=100.
    pub achievement_rate: u32,
    pub total_logs: usize,
    pub total_habits: usize,
    /// Fixed label order, one entry per sleep range.
    pub sleep_buckets: Vec<BucketStat>,
    /// Fixed label order, one entry per mood range.
    pub mood_buckets: Vec<BucketStat>,
}

impl CorrelationStats {
    /// True when no record contributed to any bucket; downstream consumers
    /// treat this as "no wellbeing data", never as a zero rate.
    pub fn has_bucket_data(&self) -> bool {
        self.sleep_buckets.iter().any(|b| !b.is_empty())
            || self.mood_buckets.iter().any(|b| !b.is_empty())
    }
}

/// Aggregate habit logs and daily wellbeing records into bucketed
/// achievement statistics for one scope (a single habit, or all habits
/// when `scope` is `None`).
pub fn correlate(
    logs: &[HabitLogInput],
    records: &[DailyRecordInput],
    total_habits: usize,
    scope: Option<Uuid>,
) -> CorrelationStats {
    let scoped: Vec<&HabitLogInput> = match scope {
        Some(habit_id) => logs.iter().filter(|l| l.habit_id == habit_id).collect(),
        None => logs.iter().collect(),
    };

    let achieved_count = scoped.iter().filter(|l| l.completed).count();

    let days_in_period = if records.is_empty() {
        FALLBACK_DAYS_IN_PERIOD
    } else {
        records.len()
    };
    let denominator = days_in_period * if scope.is_some() { 1 } else { total_habits };
    let achievement_rate = if denominator == 0 {
        0
    } else {
        let rate = (achieved_count as f64 * 100.0 / denominator as f64).round() as u32;
        rate.min(100)
    };

    // A day counts as achieved when any in-scope log that day is completed.
    let mut achieved_by_date: HashMap<NaiveDate, bool> = HashMap::new();
    for log in &scoped {
        let day = achieved_by_date.entry(log.date).or_insert(false);
        *day = *day || log.completed;
    }

    let mut sleep_buckets: Vec<BucketStat> =
        SLEEP_BUCKET_LABELS.iter().map(|&l| BucketStat::new(l)).collect();
    let mut mood_buckets: Vec<BucketStat> =
        MOOD_BUCKET_LABELS.iter().map(|&l| BucketStat::new(l)).collect();

    for record in records {
        let day_achieved = achieved_by_date.get(&record.date).copied().unwrap_or(false);

        if let Some(hours) =
            sleep_duration_hours(record.sleep_start.as_deref(), record.sleep_end.as_deref())
        {
            let bucket = &mut sleep_buckets[sleep_bucket_index(hours)];
            bucket.total += 1;
            if day_achieved {
                bucket.achieved += 1;
            }
        }

        if let Some(average) = mean_mood(record) {
            let bucket = &mut mood_buckets[mood_bucket_index(average)];
            bucket.total += 1;
            if day_achieved {
                bucket.achieved += 1;
            }
        }
    }

    CorrelationStats {
        achievement_rate,
        total_logs: scoped.len(),
        total_habits,
        sleep_buckets,
        mood_buckets,
    }
}

/// Sleep duration in hours between two "HH:MM" clock strings. An end at or
/// before the start crossed midnight; equal endpoints are a full 24h, not
/// zero. `None` when either endpoint is missing or unparseable.
pub fn sleep_duration_hours(start: Option<&str>, end: Option<&str>) -> Option<f64> {
    let start = parse_clock(start?)?;
    let end = parse_clock(end?)?;
    let minutes = if end <= start {
        end + 24 * 60 - start
    } else {
        end - start
    };
    Some(f64::from(minutes) / 60.0)
}

/// Minutes since midnight for a "HH:MM" clock string.
pub(crate) fn parse_clock(clock: &str) -> Option<u32> {
    let (hours, minutes) = clock.split_once(':')?;
    let hours: u32 = hours.trim().parse().ok()?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Average of whichever mood values are present and in 1..=5.
fn mean_mood(record: &DailyRecordInput) -> Option<f64> {
    let values: Vec<i32> = [record.mood_morning, record.mood_noon, record.mood_evening]
        .into_iter()
        .flatten()
        .filter(|mood| (1..=5).contains(mood))
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(f64::from(values.iter().sum::<i32>()) / values.len() as f64)
}

fn sleep_bucket_index(hours: f64) -> usize {
    if hours < 6.0 {
        0
    } else if hours < 8.0 {
        1
    } else if hours < 10.0 {
        2
    } else {
        3
    }
}

fn mood_bucket_index(average: f64) -> usize {
    if average <= 2.0 {
        0
    } else if average <= 3.0 {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(habit_id: Uuid, date: &str, completed: bool) -> HabitLogInput {
        HabitLogInput {
            habit_id,
            date: date.parse().unwrap(),
            value: None,
            notes: None,
            completed,
        }
    }

    fn record(date: &str) -> DailyRecordInput {
        DailyRecordInput {
            date: date.parse().unwrap(),
            sleep_start: None,
            sleep_end: None,
            mood_morning: None,
            mood_noon: None,
            mood_evening: None,
        }
    }

    fn record_with_sleep(date: &str, start: &str, end: &str) -> DailyRecordInput {
        DailyRecordInput {
            sleep_start: Some(start.into()),
            sleep_end: Some(end.into()),
            ..record(date)
        }
    }

    #[test]
    fn sleep_duration_handles_midnight_wraparound() {
        assert_eq!(
            sleep_duration_hours(Some("23:00"), Some("01:00")),
            Some(2.0)
        );
        assert_eq!(
            sleep_duration_hours(Some("22:30"), Some("06:30")),
            Some(8.0)
        );
    }

    #[test]
    fn equal_endpoints_are_a_full_day() {
        assert_eq!(
            sleep_duration_hours(Some("08:00"), Some("08:00")),
            Some(24.0)
        );
    }

    #[test]
    fn missing_or_malformed_endpoints_yield_none() {
        assert_eq!(sleep_duration_hours(Some("23:00"), None), None);
        assert_eq!(sleep_duration_hours(None, Some("07:00")), None);
        assert_eq!(sleep_duration_hours(Some("25:00"), Some("07:00")), None);
        assert_eq!(sleep_duration_hours(Some("bogus"), Some("07:00")), None);
        assert_eq!(sleep_duration_hours(Some("07:61"), Some("09:00")), None);
    }

    #[test]
    fn zero_denominator_yields_zero_rate() {
        let stats = correlate(&[], &[], 0, None);
        assert_eq!(stats.achievement_rate, 0);
        assert_eq!(stats.total_logs, 0);
    }

    #[test]
    fn rate_is_clamped_to_one_hundred() {
        let habit = Uuid::new_v4();
        // Two completed logs on one day against a one-day, one-habit denominator.
        let logs = vec![
            log(habit, "2026-03-01", true),
            log(habit, "2026-03-01", true),
        ];
        let records = vec![record("2026-03-01")];
        let stats = correlate(&logs, &records, 1, None);
        assert_eq!(stats.achievement_rate, 100);
    }

    #[test]
    fn rate_uses_thirty_day_fallback_without_records() {
        let habit = Uuid::new_v4();
        let logs: Vec<HabitLogInput> = (1..=15)
            .map(|day| log(habit, &format!("2026-03-{day:02}"), true))
            .collect();
        let stats = correlate(&logs, &[], 1, Some(habit));
        assert_eq!(stats.achievement_rate, 50);
    }

    #[test]
    fn scope_filter_excludes_other_habits() {
        let tracked = Uuid::new_v4();
        let other = Uuid::new_v4();
        let logs = vec![
            log(tracked, "2026-03-01", true),
            log(other, "2026-03-01", true),
            log(other, "2026-03-02", true),
        ];
        let records = vec![record("2026-03-01"), record("2026-03-02")];
        let stats = correlate(&logs, &records, 2, Some(tracked));
        assert_eq!(stats.total_logs, 1);
        assert_eq!(stats.achievement_rate, 50);
    }

    #[test]
    fn recorded_failures_do_not_count_as_achieved() {
        let habit = Uuid::new_v4();
        let logs = vec![
            log(habit, "2026-03-01", true),
            log(habit, "2026-03-02", false),
        ];
        let records = vec![record("2026-03-01"), record("2026-03-02")];
        let stats = correlate(&logs, &records, 1, Some(habit));
        assert_eq!(stats.achievement_rate, 50);
        assert_eq!(stats.total_logs, 2);
    }

    #[test]
    fn sleep_bucketing_is_exhaustive_and_exclusive_at_boundaries() {
        let habit = Uuid::new_v4();
        let logs = vec![log(habit, "2026-03-01", true)];
        let records = vec![
            record_with_sleep("2026-03-01", "01:00", "06:59"), // 5.98h -> <6h
            record_with_sleep("2026-03-02", "00:00", "06:00"), // 6h    -> 6-8h
            record_with_sleep("2026-03-03", "00:00", "07:59"), // <8h   -> 6-8h
            record_with_sleep("2026-03-04", "00:00", "08:00"), // 8h    -> 8-10h
            record_with_sleep("2026-03-05", "22:00", "08:00"), // 10h   -> >10h
            record_with_sleep("2026-03-06", "20:00", "09:00"), // 13h   -> >10h
        ];
        let stats = correlate(&logs, &records, 1, None);
        let totals: Vec<u32> = stats.sleep_buckets.iter().map(|b| b.total).collect();
        assert_eq!(totals, vec![1, 2, 1, 2]);
        assert_eq!(
            stats.sleep_buckets.iter().map(|b| b.total).sum::<u32>(),
            6,
            "every record with a defined duration falls in exactly one bucket"
        );
        // Only 2026-03-01 had an achieved log.
        assert_eq!(stats.sleep_buckets[0].achieved, 1);
        assert_eq!(stats.sleep_buckets[1].achieved, 0);
    }

    #[test]
    fn mood_bucket_edges() {
        let mut poor = record("2026-03-01");
        poor.mood_morning = Some(2);

        let mut neutral = record("2026-03-02");
        neutral.mood_morning = Some(2);
        neutral.mood_noon = Some(3);
        neutral.mood_evening = Some(4); // average 3.0

        let mut good = record("2026-03-03");
        good.mood_morning = Some(4);

        let stats = correlate(&[], &[poor, neutral, good], 1, None);
        let totals: Vec<u32> = stats.mood_buckets.iter().map(|b| b.total).collect();
        assert_eq!(totals, vec![1, 1, 1]);
    }

    #[test]
    fn single_present_mood_is_its_own_average() {
        let mut rec = record("2026-03-01");
        rec.mood_morning = Some(4);
        let stats = correlate(&[], &[rec], 1, None);
        assert_eq!(stats.mood_buckets[2].total, 1, "average 4.0 lands in good");
    }

    #[test]
    fn out_of_domain_moods_are_excluded_not_defaulted() {
        let mut rec = record("2026-03-01");
        rec.mood_morning = Some(0);
        rec.mood_noon = Some(9);
        let stats = correlate(&[], &[rec], 1, None);
        assert!(stats.mood_buckets.iter().all(|b| b.total == 0));
    }

    #[test]
    fn day_achieved_when_any_log_that_day_is_completed() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let logs = vec![log(a, "2026-03-01", false), log(b, "2026-03-01", true)];
        let records = vec![record_with_sleep("2026-03-01", "23:00", "07:00")];
        let stats = correlate(&logs, &records, 2, None);
        assert_eq!(stats.sleep_buckets[2].achieved, 1);
    }

    #[test]
    fn identical_inputs_produce_identical_outputs() {
        let habit = Uuid::new_v4();
        let logs = vec![
            log(habit, "2026-03-01", true),
            log(habit, "2026-03-02", false),
        ];
        let mut records = vec![
            record_with_sleep("2026-03-01", "23:30", "06:30"),
            record_with_sleep("2026-03-02", "01:00", "09:30"),
        ];
        records[1].mood_evening = Some(5);

        let first = correlate(&logs, &records, 3, None);
        let second = correlate(&logs, &records, 3, None);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}

//! Renders correlation statistics into the generation request.
//!
//! The output contract matters more than the prose: non-empty buckets only,
//! explicit no-data sentinels, and a fixed four-part answer shape so the
//! dashboard can rely on the response structure.

use std::fmt::Write;

use crate::analytics::correlation::{BucketStat, CorrelationStats};

pub struct PromptContext<'a> {
    /// `Some` when a single habit is analyzed, `None` for the aggregate scope.
    pub scope_habit_name: Option<&'a str>,
    pub habit_count: usize,
    pub log_count: usize,
    pub record_count: usize,
    /// In-scope log entries, achieved or not.
    pub total_attempts: usize,
    pub success_count: usize,
}

pub const NO_SLEEP_DATA: &str = "(no sleep data recorded in this period)";
pub const NO_MOOD_DATA: &str = "(no mood data recorded in this period)";

pub fn build_diagnosis_prompt(stats: &CorrelationStats, ctx: &PromptContext<'_>) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(
        "You are a habit coaching assistant. Analyze the following habit \
         tracking data and write a diagnosis for the user.\n\n",
    );

    prompt.push_str("## Data summary\n");
    match ctx.scope_habit_name {
        Some(name) => {
            let _ = writeln!(prompt, "- Analysis scope: the habit \"{name}\"");
        }
        None => {
            let _ = writeln!(
                prompt,
                "- Analysis scope: all {} tracked habits",
                stats.total_habits
            );
        }
    }
    let _ = writeln!(prompt, "- Habits defined: {}", ctx.habit_count);
    let _ = writeln!(
        prompt,
        "- Habit logs in period: {} ({} attempts, {} successes)",
        ctx.log_count, ctx.total_attempts, ctx.success_count
    );
    let _ = writeln!(
        prompt,
        "- Daily wellbeing records in period: {}",
        ctx.record_count
    );
    let _ = writeln!(prompt, "- Achievement rate: {}%", stats.achievement_rate);

    prompt.push_str("\n## Achievement by sleep duration\n");
    push_bucket_table(&mut prompt, &stats.sleep_buckets, NO_SLEEP_DATA);

    prompt.push_str("\n## Achievement by mood\n");
    push_bucket_table(&mut prompt, &stats.mood_buckets, NO_MOOD_DATA);

    prompt.push_str(
        "\n## Instructions\n\
         Write your answer in four parts, in this exact shape:\n\
         1. Summary - two or three sentences on overall achievement.\n\
         2. Correlation analysis - how sleep and mood relate to achievement, citing the numbers above.\n\
         3. Actionable insights - up to three concrete, specific suggestions.\n\
         4. Closing note - one short encouraging sentence.\n\
         \n\
         Do not invent numbers that are not present in the data above.\n",
    );

    if !stats.has_bucket_data() {
        prompt.push_str(
            "\nAll sleep and mood buckets are empty. State explicitly that there \
             is not yet enough wellbeing data for a correlation analysis and \
             suggest what to start recording, instead of giving generic advice.\n",
        );
    }

    prompt
}

/// One line per non-empty bucket; a sentinel line when every bucket is
/// empty. Empty buckets are never rendered, so no rate is ever derived
/// from a zero total.
fn push_bucket_table(prompt: &mut String, buckets: &[BucketStat], sentinel: &str) {
    let mut wrote_any = false;
    for bucket in buckets.iter().filter(|b| !b.is_empty()) {
        let rate = f64::from(bucket.achieved) * 100.0 / f64::from(bucket.total);
        let _ = writeln!(
            prompt,
            "- {}: achieved on {}/{} days ({:.0}%)",
            bucket.label, bucket.achieved, bucket.total, rate
        );
        wrote_any = true;
    }
    if !wrote_any {
        prompt.push_str(sentinel);
        prompt.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::correlation::{correlate, CorrelationStats};
    use crate::dto::{DailyRecordInput, HabitLogInput};
    use uuid::Uuid;

    fn empty_stats() -> CorrelationStats {
        correlate(&[], &[], 0, None)
    }

    fn ctx() -> PromptContext<'static> {
        PromptContext {
            scope_habit_name: None,
            habit_count: 2,
            log_count: 10,
            record_count: 7,
            total_attempts: 10,
            success_count: 8,
        }
    }

    #[test]
    fn empty_buckets_render_sentinels_and_insufficient_data_directive() {
        let prompt = build_diagnosis_prompt(&empty_stats(), &ctx());
        assert!(prompt.contains(NO_SLEEP_DATA));
        assert!(prompt.contains(NO_MOOD_DATA));
        assert!(prompt.contains("not yet enough wellbeing data"));
    }

    #[test]
    fn only_non_empty_buckets_are_rendered() {
        let habit = Uuid::new_v4();
        let logs = vec![HabitLogInput {
            habit_id: habit,
            date: "2026-03-01".parse().unwrap(),
            value: None,
            notes: None,
            completed: true,
        }];
        let records = vec![DailyRecordInput {
            date: "2026-03-01".parse().unwrap(),
            sleep_start: Some("23:00".into()),
            sleep_end: Some("06:00".into()),
            mood_morning: None,
            mood_noon: None,
            mood_evening: None,
        }];
        let stats = correlate(&logs, &records, 1, None);
        let prompt = build_diagnosis_prompt(&stats, &ctx());

        assert!(prompt.contains("6-8h: achieved on 1/1 days (100%)"));
        assert!(!prompt.contains("<6h:"));
        assert!(!prompt.contains(">10h:"));
        assert!(prompt.contains(NO_MOOD_DATA));
        assert!(!prompt.contains("not yet enough wellbeing data"));
    }

    #[test]
    fn scope_line_names_the_habit() {
        let mut context = ctx();
        context.scope_habit_name = Some("Morning run");
        let prompt = build_diagnosis_prompt(&empty_stats(), &context);
        assert!(prompt.contains("the habit \"Morning run\""));

        let aggregate = build_diagnosis_prompt(&empty_stats(), &ctx());
        assert!(aggregate.contains("all 0 tracked habits"));
    }

    #[test]
    fn instruction_block_requests_four_parts() {
        let prompt = build_diagnosis_prompt(&empty_stats(), &ctx());
        assert!(prompt.contains("1. Summary"));
        assert!(prompt.contains("2. Correlation analysis"));
        assert!(prompt.contains("3. Actionable insights"));
        assert!(prompt.contains("4. Closing note"));
    }
}

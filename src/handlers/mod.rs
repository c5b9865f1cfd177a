pub mod analytics;
pub mod daily_records;
pub mod diagnosis;
pub mod habit_logs;
pub mod habits;
pub mod health;

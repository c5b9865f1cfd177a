pub mod daily_record;
pub mod diagnosis;
pub mod habit;
pub mod habit_log;

pub mod diagnoses;

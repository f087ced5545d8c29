pub mod ratings;
pub mod tournaments;

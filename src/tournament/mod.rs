pub mod bracket;
pub mod pairing;
pub mod points;
pub mod standings;
pub mod strategy;

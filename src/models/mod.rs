pub mod impact_score;
pub mod records;
pub mod theme;

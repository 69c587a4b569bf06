pub mod impact;
pub mod sentiment;
pub mod text;
pub mod theme_stats;
pub mod themes;

pub mod chapters;
pub mod config;
pub mod favorites;
pub mod history;
pub mod import;
pub mod quiz;
pub mod stats;

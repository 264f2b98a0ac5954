pub mod markdown;
pub mod stats;

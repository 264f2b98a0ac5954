mod progress;

pub use progress::{MultiProgressNew, ProgressStyleTemplate};

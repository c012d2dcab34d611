pub mod flattener;
pub mod naming;

pub use flattener::{FlattenConfig, FlattenedMetrics, Flattener, ParsePolicy};
pub use naming::{base_key, dot_normalize};

pub mod cache;
pub mod types;

pub use cache::{DEFAULT_GRAPH_DEF_PATH, GraphDefCache, build_schema};
pub use types::{Graph, GraphDef, Graphs, Unit};

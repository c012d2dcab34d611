pub mod exposition;
pub mod source;
pub mod types;

pub use exposition::decode;
pub use source::{DEFAULT_CHANNEL_CAPACITY, HttpSource, MetricFamilySource, StaticSource};
pub use types::{
    FamilyType, HistogramSample, Labels, MetricFamily, Samples, SimpleSample, SummarySample,
};

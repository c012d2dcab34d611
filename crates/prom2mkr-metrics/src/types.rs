use std::collections::BTreeMap;

/// Label name to label value. Ordered so derived keys are stable.
pub type Labels = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FamilyType {
    Counter,
    Gauge,
    Summary,
    Histogram,
    Unknown,
}

impl FamilyType {
    pub fn from_prometheus_type(value: &str) -> Self {
        match value {
            "counter" => Self::Counter,
            "gauge" => Self::Gauge,
            "summary" => Self::Summary,
            "histogram" => Self::Histogram,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "COUNTER",
            Self::Gauge => "GAUGE",
            Self::Summary => "SUMMARY",
            Self::Histogram => "HISTOGRAM",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimpleSample {
    pub labels: Labels,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SummarySample {
    pub labels: Labels,
    /// Quantile label (e.g. `"0.99"`) to value.
    pub quantiles: BTreeMap<String, String>,
    pub count: String,
    pub sum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistogramSample {
    pub labels: Labels,
    /// Upper bound (`le`) to cumulative count.
    pub buckets: BTreeMap<String, String>,
    pub count: String,
    pub sum: String,
}

/// Sample shapes, one variant per declared family type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    Counter(Vec<SimpleSample>),
    Gauge(Vec<SimpleSample>),
    Summary(Vec<SummarySample>),
    Histogram(Vec<HistogramSample>),
    Unknown(Vec<SimpleSample>),
}

impl Samples {
    pub fn empty(family_type: FamilyType) -> Self {
        match family_type {
            FamilyType::Counter => Self::Counter(Vec::new()),
            FamilyType::Gauge => Self::Gauge(Vec::new()),
            FamilyType::Summary => Self::Summary(Vec::new()),
            FamilyType::Histogram => Self::Histogram(Vec::new()),
            FamilyType::Unknown => Self::Unknown(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Counter(samples) | Self::Gauge(samples) | Self::Unknown(samples) => {
                samples.len()
            }
            Self::Summary(samples) => samples.len(),
            Self::Histogram(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricFamily {
    pub name: String,
    pub samples: Samples,
}

impl MetricFamily {
    pub fn new(name: impl Into<String>, samples: Samples) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    pub fn family_type(&self) -> FamilyType {
        match self.samples {
            Samples::Counter(_) => FamilyType::Counter,
            Samples::Gauge(_) => FamilyType::Gauge,
            Samples::Summary(_) => FamilyType::Summary,
            Samples::Histogram(_) => FamilyType::Histogram,
            Samples::Unknown(_) => FamilyType::Unknown,
        }
    }
}

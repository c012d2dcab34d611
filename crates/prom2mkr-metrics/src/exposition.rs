use prom2mkr_common::error::{Prom2mkrError, Result};

use crate::types::{
    FamilyType, HistogramSample, Labels, MetricFamily, Samples, SimpleSample, SummarySample,
};

const QUANTILE_LABEL: &str = "quantile";
const BUCKET_LABEL: &str = "le";

/// Decodes a complete exposition body.
pub fn decode(text: &str) -> Result<Vec<MetricFamily>> {
    let mut decoder = Decoder::new();
    let mut families = Vec::new();
    for line in text.lines() {
        if let Some(family) = decoder.push_line(line)? {
            families.push(family);
        }
    }
    families.extend(decoder.finish());
    Ok(families)
}

/// Streaming decoder for the text exposition format (version 0.0.4). A family
/// is handed back as soon as the next one starts.
#[derive(Debug, Default)]
pub struct Decoder {
    current: Option<FamilyBuilder>,
    line_number: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one line; returns the previous family once a new one begins.
    pub fn push_line(&mut self, line: &str) -> Result<Option<MetricFamily>> {
        self.line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if let Some(comment) = line.strip_prefix('#') {
            return self.push_comment(comment);
        }

        let sample = parse_sample_line(line).map_err(|message| self.error(message))?;
        let line_number = self.line_number;

        if let Some(builder) = self.current.as_mut()
            && let Some(part) = builder.part_of(&sample.name)
        {
            builder
                .add(part, sample)
                .map_err(|message| Prom2mkrError::Decode {
                    line: line_number,
                    message,
                })?;
            return Ok(None);
        }

        // A sample without a preceding TYPE line starts an untyped family.
        let mut builder = FamilyBuilder::new(sample.name.clone(), FamilyType::Unknown);
        builder
            .add(SeriesPart::Value, sample)
            .map_err(|message| self.error(message))?;
        Ok(self.replace_current(builder))
    }

    pub fn finish(&mut self) -> Option<MetricFamily> {
        self.current.take().and_then(FamilyBuilder::build)
    }

    fn push_comment(&mut self, comment: &str) -> Result<Option<MetricFamily>> {
        let mut parts = comment.trim_start().splitn(3, char::is_whitespace);
        let keyword = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default().trim();

        match keyword {
            "HELP" => {
                if name.is_empty() {
                    return Err(self.error("HELP line without metric name".to_string()));
                }
                if self
                    .current
                    .as_ref()
                    .is_some_and(|builder| builder.name == name)
                {
                    return Ok(None);
                }
                let builder = FamilyBuilder::new(name.to_string(), FamilyType::Unknown);
                Ok(self.replace_current(builder))
            }
            "TYPE" => {
                if name.is_empty() || rest.is_empty() {
                    return Err(self.error("TYPE line needs a metric name and a type".to_string()));
                }
                let family_type = FamilyType::from_prometheus_type(rest);
                if let Some(builder) = self.current.as_mut()
                    && builder.name == name
                {
                    if !builder.samples.is_empty() {
                        return Err(self.error(format!("TYPE line for {name} after its samples")));
                    }
                    builder.samples = Samples::empty(family_type);
                    return Ok(None);
                }
                Ok(self.replace_current(FamilyBuilder::new(name.to_string(), family_type)))
            }
            _ => Ok(None),
        }
    }

    fn replace_current(&mut self, builder: FamilyBuilder) -> Option<MetricFamily> {
        self.current
            .replace(builder)
            .and_then(FamilyBuilder::build)
    }

    fn error(&self, message: String) -> Prom2mkrError {
        Prom2mkrError::Decode {
            line: self.line_number,
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeriesPart {
    Value,
    Bucket,
    Sum,
    Count,
}

#[derive(Debug)]
struct FamilyBuilder {
    name: String,
    samples: Samples,
}

impl FamilyBuilder {
    fn new(name: String, family_type: FamilyType) -> Self {
        Self {
            name,
            samples: Samples::empty(family_type),
        }
    }

    fn part_of(&self, sample_name: &str) -> Option<SeriesPart> {
        let suffix = sample_name.strip_prefix(self.name.as_str())?;
        match (&self.samples, suffix) {
            (Samples::Summary(_), "") => Some(SeriesPart::Value),
            (Samples::Histogram(_), "_bucket") => Some(SeriesPart::Bucket),
            (Samples::Summary(_) | Samples::Histogram(_), "_sum") => Some(SeriesPart::Sum),
            (Samples::Summary(_) | Samples::Histogram(_), "_count") => Some(SeriesPart::Count),
            (Samples::Counter(_) | Samples::Gauge(_) | Samples::Unknown(_), "") => {
                Some(SeriesPart::Value)
            }
            _ => None,
        }
    }

    fn add(&mut self, part: SeriesPart, sample: ParsedSample) -> std::result::Result<(), String> {
        let ParsedSample {
            name,
            mut labels,
            value,
        } = sample;

        match &mut self.samples {
            Samples::Counter(samples) | Samples::Gauge(samples) | Samples::Unknown(samples) => {
                samples.push(SimpleSample { labels, value });
            }
            Samples::Summary(samples) => {
                let quantile = labels.remove(QUANTILE_LABEL);
                let entry = series_entry(samples, labels, |sample| &sample.labels, |labels| {
                    SummarySample {
                        labels,
                        count: "0".to_string(),
                        sum: "0".to_string(),
                        ..SummarySample::default()
                    }
                });
                match part {
                    SeriesPart::Value => {
                        let quantile = quantile
                            .ok_or_else(|| format!("summary sample {name} has no quantile label"))?;
                        let quantile = canonical_number(&quantile)
                            .ok_or_else(|| format!("invalid quantile {quantile:?} in {name}"))?;
                        entry.quantiles.insert(quantile, value);
                    }
                    SeriesPart::Sum => entry.sum = value,
                    SeriesPart::Count => entry.count = value,
                    SeriesPart::Bucket => {
                        return Err(format!("unexpected bucket sample {name} in summary"));
                    }
                }
            }
            Samples::Histogram(samples) => {
                let bound = labels.remove(BUCKET_LABEL);
                let entry = series_entry(samples, labels, |sample| &sample.labels, |labels| {
                    HistogramSample {
                        labels,
                        count: "0".to_string(),
                        sum: "0".to_string(),
                        ..HistogramSample::default()
                    }
                });
                match part {
                    SeriesPart::Bucket => {
                        let bound =
                            bound.ok_or_else(|| format!("bucket sample {name} has no le label"))?;
                        let bound = canonical_number(&bound)
                            .ok_or_else(|| format!("invalid bucket bound {bound:?} in {name}"))?;
                        entry.buckets.insert(bound, value);
                    }
                    SeriesPart::Sum => entry.sum = value,
                    SeriesPart::Count => entry.count = value,
                    SeriesPart::Value => {
                        return Err(format!("unexpected plain sample {name} in histogram"));
                    }
                }
            }
        }

        Ok(())
    }

    fn build(self) -> Option<MetricFamily> {
        if self.samples.is_empty() {
            return None;
        }
        Some(MetricFamily {
            name: self.name,
            samples: self.samples,
        })
    }
}

fn series_entry<'a, T>(
    samples: &'a mut Vec<T>,
    labels: Labels,
    labels_of: impl Fn(&T) -> &Labels,
    create: impl FnOnce(Labels) -> T,
) -> &'a mut T {
    let index = match samples.iter().position(|sample| labels_of(sample) == &labels) {
        Some(index) => index,
        None => {
            samples.push(create(labels));
            samples.len() - 1
        }
    };
    &mut samples[index]
}

#[derive(Debug)]
struct ParsedSample {
    name: String,
    labels: Labels,
    value: String,
}

fn parse_sample_line(line: &str) -> std::result::Result<ParsedSample, String> {
    let name_end = line
        .find(|ch: char| ch == '{' || ch.is_whitespace())
        .unwrap_or(line.len());
    let name = &line[..name_end];
    if name.is_empty() {
        return Err("sample line without metric name".to_string());
    }

    let mut rest = &line[name_end..];
    let mut labels = Labels::new();
    if let Some(label_block) = rest.strip_prefix('{') {
        let (parsed, remaining) = parse_labels(label_block)?;
        labels = parsed;
        rest = remaining;
    }

    let mut tokens = rest.split_whitespace();
    let value = tokens
        .next()
        .ok_or_else(|| format!("sample {name} has no value"))?;
    // The optional timestamp is not forwarded; the agent stamps values itself.
    let _timestamp = tokens.next();
    if tokens.next().is_some() {
        return Err(format!("trailing data after sample {name}"));
    }

    Ok(ParsedSample {
        name: name.to_string(),
        labels,
        value: value.to_string(),
    })
}

fn parse_labels(input: &str) -> std::result::Result<(Labels, &str), String> {
    let mut labels = Labels::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((labels, after));
        }
        if rest.is_empty() {
            return Err("unterminated label set".to_string());
        }

        let eq = rest
            .find('=')
            .ok_or_else(|| "label without value".to_string())?;
        let label_name = rest[..eq].trim();
        if label_name.is_empty() {
            return Err("empty label name".to_string());
        }

        rest = rest[eq + 1..].trim_start();
        rest = rest
            .strip_prefix('"')
            .ok_or_else(|| format!("value of label {label_name} is not quoted"))?;

        let mut value = String::new();
        let mut end = None;
        let mut chars = rest.char_indices();
        while let Some((index, ch)) = chars.next() {
            match ch {
                '"' => {
                    end = Some(index);
                    break;
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                other => value.push(other),
            }
        }
        let end = end.ok_or_else(|| format!("unterminated value for label {label_name}"))?;
        labels.insert(label_name.to_string(), value);

        rest = rest[end + 1..].trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after;
        } else if !rest.starts_with('}') {
            return Err(format!("expected ',' or '}}' after label {label_name}"));
        }
    }
}

/// Shortest form of a numeric label, so `"0.50"` and `"0.5"` name the same series.
fn canonical_number(value: &str) -> Option<String> {
    let parsed = value.parse::<f64>().ok()?;
    if parsed.is_infinite() {
        let sign = if parsed.is_sign_positive() { '+' } else { '-' };
        return Some(format!("{sign}Inf"));
    }
    Some(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use prom2mkr_common::Prom2mkrError;

    use super::decode;
    use crate::types::{FamilyType, Samples};

    const EXPOSITION: &str = r#"# HELP http_requests_total Total HTTP requests.
# TYPE http_requests_total counter
http_requests_total{method="GET",code="200"} 1027 1395066363000
http_requests_total{method="POST",code="400"} 3 1395066363000

# TYPE process_open_fds gauge
process_open_fds 12

# HELP rpc_duration_seconds RPC latency.
# TYPE rpc_duration_seconds summary
rpc_duration_seconds{service="a",quantile="0.5"} 4773
rpc_duration_seconds{service="a",quantile="0.99"} 76656
rpc_duration_seconds_sum{service="a"} 1.7560473e+07
rpc_duration_seconds_count{service="a"} 2693
rpc_duration_seconds{service="b",quantile="0.5"} 10
rpc_duration_seconds_count{service="b"} 1

# TYPE request_latency histogram
request_latency_bucket{le="0.1"} 3
request_latency_bucket{le="+Inf"} 5
request_latency_sum 1.25
request_latency_count 5

legacy_untyped{path="/a\"b\\c"} 7
"#;

    #[test]
    fn decodes_each_family_with_its_type() {
        let families = decode(EXPOSITION).unwrap();

        let kinds = families
            .iter()
            .map(|family| (family.name.as_str(), family.family_type()))
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                ("http_requests_total", FamilyType::Counter),
                ("process_open_fds", FamilyType::Gauge),
                ("rpc_duration_seconds", FamilyType::Summary),
                ("request_latency", FamilyType::Histogram),
                ("legacy_untyped", FamilyType::Unknown),
            ]
        );
    }

    #[test]
    fn keeps_counter_labels_and_raw_values() {
        let families = decode(EXPOSITION).unwrap();
        let Samples::Counter(samples) = &families[0].samples else {
            panic!("expected counter samples");
        };

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].labels["method"], "GET");
        assert_eq!(samples[0].labels["code"], "200");
        assert_eq!(samples[0].value, "1027");
    }

    #[test]
    fn groups_summary_series_by_labels() {
        let families = decode(EXPOSITION).unwrap();
        let Samples::Summary(samples) = &families[2].samples else {
            panic!("expected summary samples");
        };

        assert_eq!(samples.len(), 2);
        let first = &samples[0];
        assert_eq!(first.labels.len(), 1);
        assert_eq!(first.quantiles["0.5"], "4773");
        assert_eq!(first.quantiles["0.99"], "76656");
        assert_eq!(first.sum, "1.7560473e+07");
        assert_eq!(first.count, "2693");

        let second = &samples[1];
        assert_eq!(second.labels["service"], "b");
        assert_eq!(second.sum, "0");
        assert_eq!(second.count, "1");
    }

    #[test]
    fn groups_histogram_buckets() {
        let families = decode(EXPOSITION).unwrap();
        let Samples::Histogram(samples) = &families[3].samples else {
            panic!("expected histogram samples");
        };

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].buckets["+Inf"], "5");
        assert_eq!(samples[0].count, "5");
    }

    #[test]
    fn unescapes_label_values() {
        let families = decode(EXPOSITION).unwrap();
        let Samples::Unknown(samples) = &families[4].samples else {
            panic!("expected untyped samples");
        };

        assert_eq!(samples[0].labels["path"], "/a\"b\\c");
    }

    #[test]
    fn quantile_labels_use_shortest_number_form() {
        let families = decode(
            "# TYPE rpc summary\n\
rpc{quantile=\"0.50\"} 1\n\
rpc{quantile=\"1.0\"} 2\n\
rpc_sum 3\n\
rpc_count 4\n",
        )
        .unwrap();
        let Samples::Summary(samples) = &families[0].samples else {
            panic!("expected summary samples");
        };

        let quantiles = samples[0].quantiles.keys().cloned().collect::<Vec<_>>();
        assert_eq!(quantiles, vec!["0.5".to_string(), "1".to_string()]);
        assert_eq!(samples[0].quantiles["0.5"], "1");
        assert_eq!(samples[0].quantiles["1"], "2");
    }

    #[test]
    fn rejects_quantile_that_is_not_a_number() {
        let err = decode("# TYPE rpc summary\nrpc{quantile=\"median\"} 1\n").unwrap_err();

        assert!(matches!(err, Prom2mkrError::Decode { line: 2, .. }));
    }

    #[test]
    fn bucket_bounds_are_normalized_and_validated() {
        let families = decode(
            "# TYPE lat histogram\nlat_bucket{le=\"0.10\"} 1\nlat_bucket{le=\"+Inf\"} 2\n",
        )
        .unwrap();
        let Samples::Histogram(samples) = &families[0].samples else {
            panic!("expected histogram samples");
        };
        assert_eq!(samples[0].buckets["0.1"], "1");
        assert_eq!(samples[0].buckets["+Inf"], "2");

        let err = decode("# TYPE lat histogram\nlat_bucket{le=\"big\"} 1\n").unwrap_err();
        assert!(matches!(err, Prom2mkrError::Decode { line: 2, .. }));
    }

    #[test]
    fn drops_families_without_samples() {
        let families = decode("# TYPE empty gauge\n# TYPE up gauge\nup 1\n").unwrap();

        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, "up");
    }

    #[test]
    fn reports_line_of_malformed_sample() {
        let err = decode("# TYPE up gauge\nup 1\nbroken{job=\"x\" 1\n").unwrap_err();

        match err {
            Prom2mkrError::Decode { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_summary_sample_without_quantile() {
        let err = decode("# TYPE rpc summary\nrpc{job=\"x\"} 1\n").unwrap_err();

        assert!(matches!(err, Prom2mkrError::Decode { line: 2, .. }));
    }
}

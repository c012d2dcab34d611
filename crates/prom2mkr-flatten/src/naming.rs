use prom2mkr_metrics::Labels;

/// `http_requests_total` becomes `http.requests.total`.
pub fn dot_normalize(family_name: &str) -> String {
    family_name.replace('_', ".")
}

pub fn base_key(prefix: &str, family_name: &str) -> String {
    let name = dot_normalize(family_name);
    if prefix.is_empty() {
        name
    } else {
        format!("{prefix}.{name}")
    }
}

/// Appends `.{name}_{value}` for every label not in `ignored`, in label-name order.
pub fn qualify(mut key: String, labels: &Labels, is_ignored: impl Fn(&str) -> bool) -> String {
    for (name, value) in labels {
        if is_ignored(name.as_str()) {
            continue;
        }
        key.push('.');
        key.push_str(name);
        key.push('_');
        key.push_str(value);
    }
    key
}

pub fn quantile_suffix(quantile: &str) -> String {
    quantile.replace('.', "_")
}

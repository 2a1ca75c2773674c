/// Lenient numeric cell parsing: thousands separators, quotes and a trailing
/// percent sign are stripped; anything that still fails to parse is zero.
pub fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .trim_matches('"')
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();
    let cleaned = cleaned.strip_suffix('%').unwrap_or(&cleaned);
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        None
    } else {
        Some(numerator / denominator)
    }
}

pub fn percent(numerator: f64, denominator: f64) -> Option<f64> {
    ratio(numerator, denominator).map(|value| value * 100.0)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    ratio(values.iter().sum(), values.len() as f64)
}

pub fn format_amount(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.1}%", value),
        None => "N/A".to_string(),
    }
}

pub fn format_signed_percent(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:+.1}%", value),
        None => "N/A".to_string(),
    }
}

pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.1}", value),
        None => "N/A".to_string(),
    }
}

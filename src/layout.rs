use crate::models::ProfitColumns;
use crate::util::parse_number;
use chrono::Month;
use std::str::FromStr;

/// Records recovered from one report plus counters describing the pass.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub stats: ParseStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: usize,
    pub noise: usize,
    pub markers: usize,
    pub subtotals: usize,
    pub records: usize,
    pub skipped: usize,
    pub price_mismatches: usize,
}

/// One non-blank line of a report export, split into trimmed fields.
#[derive(Debug, Clone)]
pub struct ReportLine<'a> {
    pub number: usize,
    pub raw: &'a str,
    pub fields: Vec<String>,
}

impl<'a> ReportLine<'a> {
    pub fn new(number: usize, raw: &'a str) -> Self {
        Self {
            number,
            raw,
            fields: split_fields(raw),
        }
    }

    pub fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn first(&self) -> &str {
        self.field(0)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// A marker row carries a label in the first field and nothing in the
    /// second, e.g. `Stories Airport,,,,` or a bare `Stories Airport`.
    pub fn is_label_only(&self) -> bool {
        self.len() < 3 || self.field(1).is_empty()
    }
}

pub fn report_lines(text: &str) -> impl Iterator<Item = ReportLine<'_>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.lines().enumerate().filter_map(|(idx, line)| {
        let line = line.trim();
        if line.is_empty() {
            None
        } else {
            Some(ReportLine::new(idx + 1, line))
        }
    })
}

pub fn split_fields(line: &str) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(clean_field).collect(),
        _ => Vec::new(),
    }
}

fn clean_field(field: &str) -> String {
    field.trim().trim_matches('"').trim().to_string()
}

/// Print-date stamps such as `22-Jan` or `19-Jan-26` repeat on every page.
pub fn is_print_stamp(field: &str) -> bool {
    let mut parts = field.trim().split('-');
    let day = parts.next().unwrap_or("");
    let month = parts.next().unwrap_or("");
    !day.is_empty()
        && day.len() <= 2
        && day.chars().all(|ch| ch.is_ascii_digit())
        && month.len() == 3
        && Month::from_str(month).is_ok()
}

pub fn parse_year(field: &str) -> Option<i32> {
    let field = field.trim();
    if field.len() != 4 || !field.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    field
        .parse::<i32>()
        .ok()
        .filter(|year| (1900..=2200).contains(year))
}

/// `qty, total price, <blank>, cost, cost %, profit, <blank>, profit %`
/// starting at the second field.
pub fn profit_columns(line: &ReportLine<'_>) -> ProfitColumns {
    ProfitColumns {
        qty: parse_number(line.field(1)),
        total_price: parse_number(line.field(2)),
        total_cost: parse_number(line.field(4)),
        cost_pct: parse_number(line.field(5)),
        total_profit: parse_number(line.field(6)),
        profit_pct: parse_number(line.field(8)),
    }
}

/// Fixed per-report token lists for page furniture that never carries data.
#[derive(Debug, Clone, Copy)]
pub struct NoiseFilter {
    pub contains: &'static [&'static str],
    pub starts_with: &'static [&'static str],
}

impl NoiseFilter {
    pub fn is_noise(&self, line: &ReportLine<'_>) -> bool {
        if self.contains.iter().any(|token| line.raw.contains(token)) {
            return true;
        }
        if self
            .starts_with
            .iter()
            .any(|token| line.raw.starts_with(token))
        {
            return true;
        }
        is_print_stamp(line.first())
    }
}

pub const MONTHLY_NOISE: NoiseFilter = NoiseFilter {
    contains: &["Page ", "Comparative", "Copyright"],
    starts_with: &["Stories,,,"],
};

pub const PRODUCT_NOISE: NoiseFilter = NoiseFilter {
    contains: &["Page ", "Theoretical", "Copyright", "REP_S"],
    starts_with: &["Product Desc,"],
};

pub const CATEGORY_NOISE: NoiseFilter = NoiseFilter {
    contains: &["Page ", "Theoretical", "Copyright", "REP_S"],
    starts_with: &["Category,"],
};

pub const GROUP_NOISE: NoiseFilter = NoiseFilter {
    contains: &["Page ", "Sales by Items", "Copyright", "REP_S"],
    starts_with: &["Description,"],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_quoted_fields() {
        let fields = split_fields(r#"Stories Airport,"1,234.50", 80% ,,"#);
        assert_eq!(fields, vec!["Stories Airport", "1,234.50", "80%", "", ""]);
    }

    #[test]
    fn skips_blank_lines_and_bom() {
        let text = "\u{feff}2025,Airport,1\n\n   \nJanuary,February\n";
        let lines: Vec<_> = report_lines(text).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].first(), "2025");
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].number, 4);
    }

    #[test]
    fn detects_print_stamps() {
        assert!(is_print_stamp("22-Jan"));
        assert!(is_print_stamp("9-oct-25"));
        assert!(!is_print_stamp("Jan-22"));
        assert!(!is_print_stamp("2025"));
        assert!(!is_print_stamp("ICED-TEA"));
    }

    #[test]
    fn parses_only_plausible_years() {
        assert_eq!(parse_year("2025"), Some(2025));
        assert_eq!(parse_year(" 2026 "), Some(2026));
        assert_eq!(parse_year("1234"), None);
        assert_eq!(parse_year("20250"), None);
        assert_eq!(parse_year("Total"), None);
    }

    #[test]
    fn noise_filters_page_furniture() {
        let footer = ReportLine::new(1, "Page 1 of 12,,,,");
        let stamp = ReportLine::new(2, "22-Jan-26,,REP_S_00134");
        let banner = ReportLine::new(3, "Stories,,,,,");
        let data = ReportLine::new(4, "2025,Stories Airport,100,200");
        assert!(MONTHLY_NOISE.is_noise(&footer));
        assert!(MONTHLY_NOISE.is_noise(&stamp));
        assert!(MONTHLY_NOISE.is_noise(&banner));
        assert!(!MONTHLY_NOISE.is_noise(&data));
    }

    #[test]
    fn only_a_leading_stamp_is_noise() {
        let item = ReportLine::new(7, "CAFFE LATTE,01-Jan,3,30");
        assert!(!GROUP_NOISE.is_noise(&item));
        let stamp = ReportLine::new(8, "19-Jan,,,");
        assert!(GROUP_NOISE.is_noise(&stamp));
    }

    #[test]
    fn reads_profit_block() {
        let line = ReportLine::new(1, "BEVERAGES,50,,,40,80%,10,,20%");
        let columns = profit_columns(&line);
        assert_eq!(columns.qty, 50.0);
        assert_eq!(columns.total_price, 0.0);
        assert_eq!(columns.total_cost, 40.0);
        assert_eq!(columns.cost_pct, 80.0);
        assert_eq!(columns.total_profit, 10.0);
        assert_eq!(columns.profit_pct, 20.0);
        assert_eq!(columns.revenue(), 50.0);
    }

    #[test]
    fn label_only_rows() {
        assert!(ReportLine::new(1, "Stories Airport").is_label_only());
        assert!(ReportLine::new(1, "Stories Airport,,,,,,,,").is_label_only());
        assert!(!ReportLine::new(1, "Stories Airport,12,400").is_label_only());
    }
}

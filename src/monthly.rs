use crate::layout::{parse_year, report_lines, ParseStats, Parsed, ReportLine, MONTHLY_NOISE};
use crate::models::{MonthlySales, MONTHS};
use crate::normalize::BranchNormalizer;
use crate::util::parse_number;
use chrono::Month;
use std::collections::HashMap;

pub const YEAR_TOTAL_LABEL: &str = "Total By Year";
const VALUE_COLUMN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Month(Month),
    YearTotal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonthlyLine {
    Noise,
    ColumnHeader(Vec<Column>),
    YearMarker(i32),
    Subtotal,
    Data {
        year: Option<i32>,
        branch: String,
        values: Vec<f64>,
    },
    Unrecognized,
}

pub fn classify_monthly_line(line: &ReportLine<'_>) -> MonthlyLine {
    if MONTHLY_NOISE.is_noise(line) {
        return MonthlyLine::Noise;
    }
    if let Some(columns) = header_columns(line) {
        return MonthlyLine::ColumnHeader(columns);
    }

    let year = parse_year(line.first());
    if year.is_none() && !line.first().is_empty() {
        return MonthlyLine::Unrecognized;
    }

    let branch = line.field(1);
    if branch.is_empty() {
        return match year {
            Some(year) => MonthlyLine::YearMarker(year),
            None => MonthlyLine::Unrecognized,
        };
    }
    if is_total_label(branch) {
        return MonthlyLine::Subtotal;
    }

    let values = line
        .fields
        .iter()
        .skip(VALUE_COLUMN)
        .filter(|field| !field.is_empty() && !field.eq_ignore_ascii_case(YEAR_TOTAL_LABEL))
        .map(|field| parse_number(field))
        .collect();

    MonthlyLine::Data {
        year,
        branch: branch.to_string(),
        values,
    }
}

fn is_total_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("Total")
        || label
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("Total "))
}

/// A column header names months (and possibly the year total) in the value
/// columns and carries no numbers. The year and branch positions never hold
/// a month heading.
fn header_columns(line: &ReportLine<'_>) -> Option<Vec<Column>> {
    let mut columns = Vec::new();
    let mut has_month = false;
    for (idx, field) in line.fields.iter().enumerate() {
        if field.is_empty() {
            continue;
        }
        if field.eq_ignore_ascii_case(YEAR_TOTAL_LABEL) {
            columns.push(Column::YearTotal);
            continue;
        }
        if is_numeric(field) {
            return None;
        }
        if idx < VALUE_COLUMN {
            continue;
        }
        if let Some(month) = month_heading(field) {
            columns.push(Column::Month(month));
            has_month = true;
        }
    }
    if has_month {
        Some(columns)
    } else {
        None
    }
}

/// A full month name, optionally followed by a year (`January 2025`).
/// Abbreviations are rejected so branch names like `Mar Elias` never match.
fn month_heading(field: &str) -> Option<Month> {
    let mut words = field.split_whitespace();
    let name = words.next()?;
    let month = MONTHS
        .iter()
        .copied()
        .find(|month| month.name().eq_ignore_ascii_case(name))?;
    match (words.next(), words.next()) {
        (None, _) => Some(month),
        (Some(year), None) if parse_year(year).is_some() => Some(month),
        _ => None,
    }
}

fn is_numeric(field: &str) -> bool {
    let cleaned: String = field.chars().filter(|ch| *ch != ',').collect();
    cleaned.trim_end_matches('%').parse::<f64>().is_ok()
}

pub fn default_columns() -> Vec<Column> {
    MONTHS.iter().copied().map(Column::Month).collect()
}

/// Current year and column layout, carried forward across lines.
#[derive(Debug, Clone, Default)]
pub struct MonthlyContext {
    pub year: Option<i32>,
    pub columns: Option<Vec<Column>>,
}

struct MonthlyAccumulator<'n> {
    normalizer: &'n BranchNormalizer,
    context: MonthlyContext,
    rows: Vec<MonthlySales>,
    index: HashMap<(i32, String), usize>,
    stats: ParseStats,
}

impl<'n> MonthlyAccumulator<'n> {
    fn new(normalizer: &'n BranchNormalizer) -> Self {
        Self {
            normalizer,
            context: MonthlyContext::default(),
            rows: Vec::new(),
            index: HashMap::new(),
            stats: ParseStats::default(),
        }
    }

    fn step(mut self, line: ReportLine<'_>) -> Self {
        self.stats.lines += 1;
        match classify_monthly_line(&line) {
            MonthlyLine::Noise => self.stats.noise += 1,
            MonthlyLine::ColumnHeader(columns) => {
                log::trace!("line {}: columns {:?}", line.number, columns);
                self.context.columns = Some(columns);
                self.stats.markers += 1;
            }
            MonthlyLine::YearMarker(year) => {
                self.context.year = Some(year);
                self.stats.markers += 1;
            }
            MonthlyLine::Subtotal => self.stats.subtotals += 1,
            MonthlyLine::Data {
                year,
                branch,
                values,
            } => {
                if year.is_some() {
                    self.context.year = year;
                }
                match self.context.year {
                    Some(year) => self.apply(year, &branch, &values),
                    None => {
                        log::trace!(
                            "line {}: branch {:?} before any year marker",
                            line.number,
                            branch
                        );
                        self.stats.skipped += 1;
                    }
                }
            }
            MonthlyLine::Unrecognized => {
                log::trace!("line {}: skipped {:?}", line.number, line.raw);
                self.stats.skipped += 1;
            }
        }
        self
    }

    fn apply(&mut self, year: i32, raw_branch: &str, values: &[f64]) {
        let branch = self.normalizer.normalize(raw_branch);
        let key = (year, branch.clone());
        let idx = match self.index.get(&key) {
            Some(idx) => *idx,
            None => {
                self.rows.push(MonthlySales::new(year, branch));
                self.index.insert(key, self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        let row = &mut self.rows[idx];
        let default;
        let columns = match self.context.columns.as_ref() {
            Some(columns) => columns,
            None => {
                default = default_columns();
                &default
            }
        };
        for (column, value) in columns.iter().zip(values) {
            match column {
                Column::Month(month) => row.set(*month, *value),
                Column::YearTotal => row.total_by_year = Some(*value),
            }
        }
        self.stats.records += 1;
    }
}

/// Parses the comparative monthly sales summary. Rows for the same year and
/// branch coming from different column blocks merge into one record.
pub fn parse_monthly(text: &str, normalizer: &BranchNormalizer) -> Parsed<MonthlySales> {
    let acc = report_lines(text).fold(MonthlyAccumulator::new(normalizer), |acc, line| {
        acc.step(line)
    });
    Parsed {
        records: acc.rows,
        stats: acc.stats,
    }
}

use crate::layout::{profit_columns, report_lines, ParseStats, Parsed, ReportLine, CATEGORY_NOISE};
use crate::models::{CategoryRecord, TOTAL_CATEGORY};
use crate::normalize::BranchNormalizer;
use crate::products::{is_branch_header, CATEGORIES};

const BRANCH_TOTAL_LABEL: &str = "Total By Branch";

#[derive(Debug, Clone, PartialEq)]
pub enum CategoryLine {
    Noise,
    Branch(String),
    Category(String),
    BranchTotal,
    Unrecognized,
}

pub fn classify_category_line(line: &ReportLine<'_>, branch_prefix: &str) -> CategoryLine {
    if CATEGORY_NOISE.is_noise(line) {
        return CategoryLine::Noise;
    }
    let name = line.first();
    if is_branch_header(line, branch_prefix) {
        return CategoryLine::Branch(name.to_string());
    }
    if CATEGORIES.contains(&name) {
        return CategoryLine::Category(name.to_string());
    }
    if name.starts_with(BRANCH_TOTAL_LABEL) {
        return CategoryLine::BranchTotal;
    }
    CategoryLine::Unrecognized
}

struct CategoryAccumulator<'n> {
    normalizer: &'n BranchNormalizer,
    branch: Option<String>,
    records: Vec<CategoryRecord>,
    stats: ParseStats,
}

impl<'n> CategoryAccumulator<'n> {
    fn step(mut self, line: ReportLine<'_>) -> Self {
        self.stats.lines += 1;
        let label = match classify_category_line(&line, self.normalizer.prefix()) {
            CategoryLine::Noise => {
                self.stats.noise += 1;
                return self;
            }
            CategoryLine::Branch(raw) => {
                self.branch = Some(self.normalizer.normalize(&raw));
                self.stats.markers += 1;
                return self;
            }
            CategoryLine::Unrecognized => {
                log::trace!("line {}: skipped {:?}", line.number, line.raw);
                self.stats.skipped += 1;
                return self;
            }
            CategoryLine::Category(category) => category,
            CategoryLine::BranchTotal => TOTAL_CATEGORY.to_string(),
        };

        let columns = profit_columns(&line);
        if columns.price_mismatch() {
            self.stats.price_mismatches += 1;
        }
        self.records.push(CategoryRecord {
            branch: self.branch.clone(),
            category: label,
            qty: columns.qty,
            total_price: columns.total_price,
            total_cost: columns.total_cost,
            cost_pct: columns.cost_pct,
            total_profit: columns.total_profit,
            profit_pct: columns.profit_pct,
            revenue: columns.revenue(),
        });
        self.stats.records += 1;
        self
    }
}

/// Parses the category profit summary. Each branch's `Total By Branch` row is
/// kept under the `TOTAL` category.
pub fn parse_categories(text: &str, normalizer: &BranchNormalizer) -> Parsed<CategoryRecord> {
    let acc = CategoryAccumulator {
        normalizer,
        branch: None,
        records: Vec::new(),
        stats: ParseStats::default(),
    };
    let acc = report_lines(text).fold(acc, |acc, line| acc.step(line));
    Parsed {
        records: acc.records,
        stats: acc.stats,
    }
}

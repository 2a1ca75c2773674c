use crate::layout::{profit_columns, report_lines, ParseStats, Parsed, ReportLine, PRODUCT_NOISE};
use crate::models::ProductRecord;
use crate::normalize::BranchNormalizer;

pub const SERVICES: &[&str] = &["TAKE AWAY", "TABLE"];
pub const CATEGORIES: &[&str] = &["BEVERAGES", "FOOD"];
pub const SECTIONS: &[&str] = &[
    "HOT BAR SECTION",
    "COLD BAR SECTION",
    "DONUTS",
    "FOOD SECTION",
    "GRAB AND GO",
];
const SECTION_TOKEN: &str = "SECTION";
const MIN_PRODUCT_FIELDS: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub enum ProductLine {
    Noise,
    Branch(String),
    Service(String),
    Category(String),
    Section(String),
    Subtotal,
    Product(String),
    Unrecognized,
}

pub fn is_branch_header(line: &ReportLine<'_>, prefix: &str) -> bool {
    line.first().starts_with(prefix) && line.is_label_only()
}

pub fn classify_product_line(line: &ReportLine<'_>, branch_prefix: &str) -> ProductLine {
    if PRODUCT_NOISE.is_noise(line) {
        return ProductLine::Noise;
    }
    let name = line.first();
    if is_branch_header(line, branch_prefix) {
        return ProductLine::Branch(name.to_string());
    }
    if SERVICES.contains(&name) {
        return ProductLine::Service(name.to_string());
    }
    if CATEGORIES.contains(&name) {
        return ProductLine::Category(name.to_string());
    }
    if name.contains(SECTION_TOKEN) || SECTIONS.contains(&name) {
        return ProductLine::Section(name.to_string());
    }
    if name.starts_with("Total By") || name.starts_with("Total:") {
        return ProductLine::Subtotal;
    }
    if line.len() >= MIN_PRODUCT_FIELDS && !name.is_empty() {
        return ProductLine::Product(name.to_string());
    }
    ProductLine::Unrecognized
}

/// Branch → service → category → section pointers. Each marker overwrites
/// its own level and leaves the others alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductContext {
    pub branch: Option<String>,
    pub service: Option<String>,
    pub category: Option<String>,
    pub section: Option<String>,
}

struct ProductAccumulator<'n> {
    normalizer: &'n BranchNormalizer,
    context: ProductContext,
    records: Vec<ProductRecord>,
    stats: ParseStats,
}

impl<'n> ProductAccumulator<'n> {
    fn step(mut self, line: ReportLine<'_>) -> Self {
        self.stats.lines += 1;
        match classify_product_line(&line, self.normalizer.prefix()) {
            ProductLine::Noise => self.stats.noise += 1,
            ProductLine::Branch(raw) => {
                self.context.branch = Some(self.normalizer.normalize(&raw));
                self.stats.markers += 1;
            }
            ProductLine::Service(service) => {
                self.context.service = Some(service);
                self.stats.markers += 1;
            }
            ProductLine::Category(category) => {
                self.context.category = Some(category);
                self.stats.markers += 1;
            }
            ProductLine::Section(section) => {
                self.context.section = Some(section);
                self.stats.markers += 1;
            }
            ProductLine::Subtotal => self.stats.subtotals += 1,
            ProductLine::Product(product) => {
                let columns = profit_columns(&line);
                if columns.qty <= 0.0 {
                    self.stats.skipped += 1;
                    return self;
                }
                if columns.price_mismatch() {
                    self.stats.price_mismatches += 1;
                }
                self.records.push(ProductRecord {
                    branch: self.context.branch.clone(),
                    service: self.context.service.clone(),
                    category: self.context.category.clone(),
                    section: self.context.section.clone(),
                    product,
                    qty: columns.qty,
                    total_price: columns.total_price,
                    total_cost: columns.total_cost,
                    cost_pct: columns.cost_pct,
                    total_profit: columns.total_profit,
                    profit_pct: columns.profit_pct,
                    revenue: columns.revenue(),
                });
                self.stats.records += 1;
            }
            ProductLine::Unrecognized => {
                log::trace!("line {}: skipped {:?}", line.number, line.raw);
                self.stats.skipped += 1;
            }
        }
        self
    }
}

pub fn parse_products(text: &str, normalizer: &BranchNormalizer) -> Parsed<ProductRecord> {
    let acc = ProductAccumulator {
        normalizer,
        context: ProductContext::default(),
        records: Vec::new(),
        stats: ParseStats::default(),
    };
    let acc = report_lines(text).fold(acc, |acc, line| acc.step(line));
    Parsed {
        records: acc.records,
        stats: acc.stats,
    }
}

use crate::dataset::Dataset;
use crate::models::{
    month_index, CategoryRecord, GroupRecord, MonthlySales, ProductRecord, MONTHS,
};
use crate::products::CATEGORIES;
use crate::util::{mean, median, percent, ratio};
use chrono::Month;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const UNASSIGNED: &str = "Unassigned";
pub const DEFAULT_TOP: usize = 15;
pub const DEFAULT_MIN_VOLUME: f64 = 100.0;
pub const MENU_MIN_VOLUME: f64 = 500.0;
pub const MENU_MARGIN_LIMIT: f64 = 200.0;

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub year: Option<i32>,
    pub compare_year: Option<i32>,
    pub yoy_month: Month,
    pub top: usize,
    pub min_volume: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            year: None,
            compare_year: None,
            yoy_month: Month::January,
            top: DEFAULT_TOP,
            min_volume: DEFAULT_MIN_VOLUME,
        }
    }
}

/// Sums `value` per key in first-seen order. Records without a key land in
/// `Unassigned`, so every grouping adds up to the same grand total.
pub fn sum_by<T, K, V>(records: &[T], key: K, value: V) -> Vec<(String, f64)>
where
    K: Fn(&T) -> Option<&str>,
    V: Fn(&T) -> f64,
{
    let mut order: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for record in records {
        let label = key(record).unwrap_or(UNASSIGNED);
        match index.get(label) {
            Some(idx) => order[*idx].1 += value(record),
            None => {
                index.insert(label.to_string(), order.len());
                order.push((label.to_string(), value(record)));
            }
        }
    }
    order
}

// ---------------------------------------------------------------------------
// Seasonality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotals {
    pub year: i32,
    pub totals: [Option<f64>; 12],
}

impl MonthlyTotals {
    pub fn get(&self, month: Month) -> Option<f64> {
        self.totals[month_index(month)]
    }

    pub fn present(&self) -> impl Iterator<Item = (Month, f64)> + '_ {
        MONTHS
            .iter()
            .copied()
            .filter_map(move |month| self.get(month).map(|total| (month, total)))
    }

    pub fn peak(&self) -> Option<(Month, f64)> {
        self.present()
            .fold(None, |best: Option<(Month, f64)>, (month, total)| match best {
                Some((_, best_total)) if best_total >= total => best,
                _ => Some((month, total)),
            })
    }

    pub fn trough(&self) -> Option<(Month, f64)> {
        self.present()
            .fold(None, |best: Option<(Month, f64)>, (month, total)| match best {
                Some((_, best_total)) if best_total <= total => best,
                _ => Some((month, total)),
            })
    }

    pub fn peak_trough_ratio(&self) -> Option<f64> {
        match (self.peak(), self.trough()) {
            (Some((_, peak)), Some((_, trough))) => ratio(peak, trough),
            _ => None,
        }
    }
}

pub fn monthly_totals(sales: &[MonthlySales], year: i32) -> MonthlyTotals {
    let mut totals = [None; 12];
    for row in sales.iter().filter(|row| row.year == year) {
        for (slot, value) in totals.iter_mut().zip(row.months.iter()) {
            if let Some(value) = value {
                *slot = Some(slot.unwrap_or(0.0) + value);
            }
        }
    }
    MonthlyTotals { year, totals }
}

/// Sum of the report's year totals, or of the monthly totals when the
/// export carried no `Total By Year` column for that year.
pub fn annual_revenue(sales: &[MonthlySales], year: i32) -> f64 {
    let rows: Vec<&MonthlySales> = sales.iter().filter(|row| row.year == year).collect();
    if rows.iter().any(|row| row.total_by_year.is_some()) {
        rows.iter().filter_map(|row| row.total_by_year).sum()
    } else {
        rows.iter().map(|row| row.monthly_sum()).sum()
    }
}

/// The year with the most populated months; the later year wins a tie.
pub fn default_analysis_year(sales: &[MonthlySales]) -> Option<i32> {
    let mut coverage: BTreeMap<i32, usize> = BTreeMap::new();
    for row in sales {
        let populated = row.months.iter().flatten().count();
        let entry = coverage.entry(row.year).or_insert(0);
        *entry = (*entry).max(populated);
    }
    coverage
        .into_iter()
        .fold(None, |best: Option<(i32, usize)>, (year, months)| match best {
            Some((_, best_months)) if best_months > months => best,
            _ => Some((year, months)),
        })
        .map(|(year, _)| year)
}

pub fn next_year_after(sales: &[MonthlySales], year: i32) -> Option<i32> {
    sales
        .iter()
        .map(|row| row.year)
        .filter(|candidate| *candidate > year)
        .min()
}

// ---------------------------------------------------------------------------
// Branch openings and year-over-year
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchOpening {
    pub branch: String,
    pub first_month: String,
}

/// Branches whose first month with sales in `year` is not January.
pub fn mid_year_openings(sales: &[MonthlySales], year: i32) -> Vec<BranchOpening> {
    sales
        .iter()
        .filter(|row| row.year == year)
        .filter_map(|row| match row.first_active_month() {
            Some(month) if month != Month::January => Some(BranchOpening {
                branch: row.branch.clone(),
                first_month: month.name().to_string(),
            }),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YoyChange {
    pub branch: String,
    pub month: String,
    pub base_year: i32,
    pub compare_year: i32,
    pub base_value: f64,
    pub compare_value: f64,
    pub change_pct: Option<f64>,
}

/// Percentage change for `month` between two years, for branches with sales
/// in both. Sorted from strongest growth to steepest decline.
pub fn yoy_changes(
    sales: &[MonthlySales],
    month: Month,
    base_year: i32,
    compare_year: i32,
) -> Vec<YoyChange> {
    let compare: HashMap<&str, f64> = sales
        .iter()
        .filter(|row| row.year == compare_year)
        .filter_map(|row| row.value(month).map(|value| (row.branch.as_str(), value)))
        .collect();

    let mut changes: Vec<YoyChange> = sales
        .iter()
        .filter(|row| row.year == base_year)
        .filter_map(|row| {
            let base_value = row.value(month)?;
            let compare_value = *compare.get(row.branch.as_str())?;
            if base_value <= 0.0 || compare_value <= 0.0 {
                return None;
            }
            Some(YoyChange {
                branch: row.branch.clone(),
                month: month.name().to_string(),
                base_year,
                compare_year,
                base_value,
                compare_value,
                change_pct: percent(compare_value - base_value, base_value),
            })
        })
        .collect();
    changes.sort_by(|a, b| {
        let a = a.change_pct.unwrap_or(f64::NEG_INFINITY);
        let b = b.change_pct.unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
    changes
}

// ---------------------------------------------------------------------------
// Branch and category profitability
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchProfit {
    pub branch: String,
    pub qty: f64,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub reported_margin: f64,
    pub margin: Option<f64>,
    pub profit_per_unit: Option<f64>,
}

/// Ranks branches by the `TOTAL` rows of the category summary.
pub fn branch_profit_ranking(categories: &[CategoryRecord]) -> Vec<BranchProfit> {
    let mut ranking: Vec<BranchProfit> = categories
        .iter()
        .filter(|record| record.is_branch_total())
        .map(|record| BranchProfit {
            branch: record
                .branch
                .clone()
                .unwrap_or_else(|| UNASSIGNED.to_string()),
            qty: record.qty,
            revenue: record.revenue,
            cost: record.total_cost,
            profit: record.total_profit,
            reported_margin: record.profit_pct,
            margin: percent(record.total_profit, record.revenue),
            profit_per_unit: ratio(record.total_profit, record.qty),
        })
        .collect();
    ranking.sort_by(|a, b| b.profit.total_cmp(&a.profit));
    ranking
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub category: String,
    pub qty: f64,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub margin: Option<f64>,
    pub profit_share: Option<f64>,
    pub revenue_share: Option<f64>,
}

pub fn category_comparison(categories: &[CategoryRecord]) -> Vec<CategoryTotals> {
    let rows: Vec<&CategoryRecord> = categories
        .iter()
        .filter(|record| !record.is_branch_total())
        .collect();
    let total_profit: f64 = rows.iter().map(|record| record.total_profit).sum();
    let total_revenue: f64 = rows.iter().map(|record| record.revenue).sum();

    let mut totals: Vec<CategoryTotals> = Vec::new();
    for record in rows {
        let found = totals
            .iter()
            .position(|item| item.category == record.category);
        let idx = match found {
            Some(idx) => idx,
            None => {
                totals.push(CategoryTotals {
                    category: record.category.clone(),
                    qty: 0.0,
                    revenue: 0.0,
                    cost: 0.0,
                    profit: 0.0,
                    margin: None,
                    profit_share: None,
                    revenue_share: None,
                });
                totals.len() - 1
            }
        };
        let entry = &mut totals[idx];
        entry.qty += record.qty;
        entry.revenue += record.revenue;
        entry.cost += record.total_cost;
        entry.profit += record.total_profit;
    }
    for entry in &mut totals {
        entry.margin = percent(entry.profit, entry.revenue);
        entry.profit_share = percent(entry.profit, total_profit);
        entry.revenue_share = percent(entry.revenue, total_revenue);
    }
    totals.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    totals
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMix {
    pub branch: String,
    pub revenue_by_category: BTreeMap<String, f64>,
    pub total_revenue: f64,
}

impl CategoryMix {
    pub fn share(&self, category: &str) -> Option<f64> {
        let revenue = self.revenue_by_category.get(category).copied().unwrap_or(0.0);
        percent(revenue, self.total_revenue)
    }
}

/// Each branch's revenue split across categories, ordered by the share of
/// the first known category (beverages).
pub fn category_mix(categories: &[CategoryRecord]) -> Vec<CategoryMix> {
    let mut mixes: Vec<CategoryMix> = Vec::new();
    for record in categories.iter().filter(|record| !record.is_branch_total()) {
        let branch = record.branch.as_deref().unwrap_or(UNASSIGNED);
        let found = mixes.iter().position(|mix| mix.branch == branch);
        let idx = match found {
            Some(idx) => idx,
            None => {
                mixes.push(CategoryMix {
                    branch: branch.to_string(),
                    revenue_by_category: BTreeMap::new(),
                    total_revenue: 0.0,
                });
                mixes.len() - 1
            }
        };
        let mix = &mut mixes[idx];
        *mix
            .revenue_by_category
            .entry(record.category.clone())
            .or_insert(0.0) += record.revenue;
        mix.total_revenue += record.revenue;
    }
    let lead = CATEGORIES[0];
    mixes.sort_by(|a, b| {
        let a = a.share(lead).unwrap_or(f64::NEG_INFINITY);
        let b = b.share(lead).unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
    mixes
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub product: String,
    pub qty: f64,
    pub cost: f64,
    pub profit: f64,
    pub revenue: f64,
    pub margin: Option<f64>,
    pub avg_price: Option<f64>,
    pub is_modifier: bool,
}

/// Aggregates product lines across branches, sorted by profit.
pub fn product_summary(products: &[ProductRecord]) -> Vec<ProductSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut summary: Vec<ProductSummary> = Vec::new();
    for record in products {
        let idx = *index.entry(record.product.as_str()).or_insert_with(|| {
            summary.push(ProductSummary {
                product: record.product.clone(),
                qty: 0.0,
                cost: 0.0,
                profit: 0.0,
                revenue: 0.0,
                margin: None,
                avg_price: None,
                is_modifier: record.is_modifier(),
            });
            summary.len() - 1
        });
        let item = &mut summary[idx];
        item.qty += record.qty;
        item.cost += record.total_cost;
        item.profit += record.total_profit;
        item.revenue += record.revenue;
    }
    for item in &mut summary {
        item.margin = percent(item.profit, item.revenue);
        item.avg_price = ratio(item.revenue, item.qty);
    }
    summary.sort_by(|a, b| b.profit.total_cmp(&a.profit));
    summary
}

/// Non-modifier products sold at least `min_volume` times.
pub fn core_products(summary: &[ProductSummary], min_volume: f64) -> Vec<&ProductSummary> {
    summary
        .iter()
        .filter(|item| !item.is_modifier && item.qty >= min_volume)
        .collect()
}

pub fn modifiers(summary: &[ProductSummary]) -> Vec<&ProductSummary> {
    summary.iter().filter(|item| item.is_modifier).collect()
}

pub fn top_by_profit<'a>(items: &[&'a ProductSummary], n: usize) -> Vec<&'a ProductSummary> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| b.profit.total_cmp(&a.profit));
    sorted.truncate(n);
    sorted
}

pub fn top_by_volume<'a>(items: &[&'a ProductSummary], n: usize) -> Vec<&'a ProductSummary> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| b.qty.total_cmp(&a.qty));
    sorted.truncate(n);
    sorted
}

/// Loss-making items, largest loss first.
pub fn loss_makers<'a>(items: &[&'a ProductSummary]) -> Vec<&'a ProductSummary> {
    let mut losses: Vec<&ProductSummary> = items
        .iter()
        .copied()
        .filter(|item| item.profit < 0.0)
        .collect();
    losses.sort_by(|a, b| a.profit.total_cmp(&b.profit));
    losses
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MenuQuadrant {
    Star,
    Workhorse,
    Puzzle,
    Dog,
}

impl MenuQuadrant {
    pub fn classify(qty: f64, margin: f64, median_qty: f64, median_margin: f64) -> Self {
        match (qty >= median_qty, margin >= median_margin) {
            (true, true) => MenuQuadrant::Star,
            (true, false) => MenuQuadrant::Workhorse,
            (false, true) => MenuQuadrant::Puzzle,
            (false, false) => MenuQuadrant::Dog,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuQuadrant::Star => "Stars",
            MenuQuadrant::Workhorse => "Workhorses",
            MenuQuadrant::Puzzle => "Puzzles",
            MenuQuadrant::Dog => "Dogs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuItem {
    pub product: String,
    pub qty: f64,
    pub margin: f64,
    pub profit: f64,
    pub quadrant: MenuQuadrant,
}

/// Volume/margin matrix over high-volume core products, split at the medians.
pub fn menu_engineering(core: &[&ProductSummary]) -> Vec<MenuItem> {
    let eligible: Vec<(&ProductSummary, f64)> = core
        .iter()
        .filter(|item| item.qty >= MENU_MIN_VOLUME && item.revenue > 0.0)
        .filter_map(|item| {
            item.margin
                .filter(|margin| margin.abs() <= MENU_MARGIN_LIMIT)
                .map(|margin| (*item, margin))
        })
        .collect();
    let quantities: Vec<f64> = eligible.iter().map(|(item, _)| item.qty).collect();
    let margins: Vec<f64> = eligible.iter().map(|(_, margin)| *margin).collect();
    let (median_qty, median_margin) = match (median(&quantities), median(&margins)) {
        (Some(qty), Some(margin)) => (qty, margin),
        _ => return Vec::new(),
    };
    eligible
        .into_iter()
        .map(|(item, margin)| MenuItem {
            product: item.product.clone(),
            qty: item.qty,
            margin,
            profit: item.profit,
            quadrant: MenuQuadrant::classify(item.qty, margin, median_qty, median_margin),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sales by groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub label: String,
    pub qty: f64,
    pub total_amount: f64,
}

fn summarize_groups<K>(groups: &[GroupRecord], key: K) -> Vec<GroupSummary>
where
    K: Fn(&GroupRecord) -> Option<&str>,
{
    let qty = sum_by(groups, &key, |record| record.qty);
    let amount = sum_by(groups, &key, |record| record.total_amount);
    let mut summary: Vec<GroupSummary> = qty
        .into_iter()
        .zip(amount)
        .map(|((label, qty), (_, total_amount))| GroupSummary {
            label,
            qty,
            total_amount,
        })
        .collect();
    summary.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));
    summary
}

pub fn group_summary(groups: &[GroupRecord]) -> Vec<GroupSummary> {
    summarize_groups(groups, |record| record.group.as_deref())
}

pub fn division_summary(groups: &[GroupRecord]) -> Vec<GroupSummary> {
    summarize_groups(groups, |record| record.division.as_deref())
}

// ---------------------------------------------------------------------------
// Whole-dataset analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Analysis {
    pub year: Option<i32>,
    pub compare_year: Option<i32>,
    pub yoy_month: Month,
    pub top: usize,
    pub annual_revenue: f64,
    pub monthly_totals: Option<MonthlyTotals>,
    pub branch_count: usize,
    pub product_count: usize,
    pub branch_ranking: Vec<BranchProfit>,
    pub categories: Vec<CategoryTotals>,
    pub category_mix: Vec<CategoryMix>,
    pub products: Vec<ProductSummary>,
    pub min_volume: f64,
    pub menu: Vec<MenuItem>,
    pub groups: Vec<GroupSummary>,
    pub divisions: Vec<GroupSummary>,
    pub yoy: Vec<YoyChange>,
    pub openings: Vec<BranchOpening>,
    pub price_mismatches: usize,
}

impl Analysis {
    pub fn core_products(&self) -> Vec<&ProductSummary> {
        core_products(&self.products, self.min_volume)
    }

    pub fn modifiers(&self) -> Vec<&ProductSummary> {
        modifiers(&self.products)
    }

    pub fn average_branch_margin(&self) -> Option<f64> {
        let margins: Vec<f64> = self
            .branch_ranking
            .iter()
            .filter_map(|branch| branch.margin)
            .collect();
        mean(&margins)
    }

    pub fn yoy_mean_change(&self) -> Option<f64> {
        let changes: Vec<f64> = self.yoy.iter().filter_map(|change| change.change_pct).collect();
        mean(&changes)
    }
}

pub fn analyze(dataset: &Dataset, options: &AnalysisOptions) -> Analysis {
    let sales = &dataset.monthly;
    let year = options.year.or_else(|| default_analysis_year(sales));
    let compare_year = match (options.compare_year, year) {
        (Some(compare), _) => Some(compare),
        (None, Some(year)) => next_year_after(sales, year),
        (None, None) => None,
    };
    log::debug!(
        "analysis year {:?}, comparison year {:?}",
        year,
        compare_year
    );

    let mut branches: Vec<&str> = sales.iter().map(|row| row.branch.as_str()).collect();
    branches.sort_unstable();
    branches.dedup();

    let mut products: Vec<&str> = dataset
        .products
        .iter()
        .map(|record| record.product.as_str())
        .collect();
    products.sort_unstable();
    products.dedup();

    let summary = product_summary(&dataset.products);
    let menu = menu_engineering(&core_products(&summary, options.min_volume));

    Analysis {
        year,
        compare_year,
        yoy_month: options.yoy_month,
        top: options.top,
        annual_revenue: year.map(|year| annual_revenue(sales, year)).unwrap_or(0.0),
        monthly_totals: year.map(|year| monthly_totals(sales, year)),
        branch_count: branches.len(),
        product_count: products.len(),
        branch_ranking: branch_profit_ranking(&dataset.categories),
        categories: category_comparison(&dataset.categories),
        category_mix: category_mix(&dataset.categories),
        products: summary,
        min_volume: options.min_volume,
        menu,
        groups: group_summary(&dataset.groups),
        divisions: division_summary(&dataset.groups),
        yoy: match (year, compare_year) {
            (Some(base), Some(compare)) => yoy_changes(sales, options.yoy_month, base, compare),
            _ => Vec::new(),
        },
        openings: year
            .map(|year| mid_year_openings(sales, year))
            .unwrap_or_default(),
        price_mismatches: dataset.stats.price_mismatches(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TOTAL_CATEGORY;

    fn sales_row(year: i32, branch: &str, values: &[(Month, f64)], total: Option<f64>) -> MonthlySales {
        let mut row = MonthlySales::new(year, branch.to_string());
        for (month, value) in values {
            row.set(*month, *value);
        }
        row.total_by_year = total;
        row
    }

    fn product(branch: &str, category: &str, name: &str, qty: f64, cost: f64, profit: f64) -> ProductRecord {
        ProductRecord {
            branch: Some(branch.to_string()),
            service: Some("TAKE AWAY".to_string()),
            category: Some(category.to_string()),
            section: None,
            product: name.to_string(),
            qty,
            total_price: 0.0,
            total_cost: cost,
            cost_pct: 0.0,
            total_profit: profit,
            profit_pct: 0.0,
            revenue: cost + profit,
        }
    }

    fn category(branch: &str, label: &str, qty: f64, cost: f64, profit: f64) -> CategoryRecord {
        CategoryRecord {
            branch: Some(branch.to_string()),
            category: label.to_string(),
            qty,
            total_price: 0.0,
            total_cost: cost,
            cost_pct: 0.0,
            total_profit: profit,
            profit_pct: 0.0,
            revenue: cost + profit,
        }
    }

    fn sample_sales() -> Vec<MonthlySales> {
        vec![
            sales_row(
                2025,
                "Airport",
                &[(Month::January, 100.0), (Month::February, 50.0), (Month::March, 300.0)],
                Some(450.0),
            ),
            sales_row(
                2025,
                "Jbeil",
                &[(Month::January, 0.0), (Month::February, 20.0), (Month::March, 30.0)],
                Some(50.0),
            ),
            sales_row(2026, "Airport", &[(Month::January, 150.0)], None),
            sales_row(2026, "Jbeil", &[(Month::January, 40.0)], None),
        ]
    }

    #[test]
    fn seasonality_peak_and_trough() {
        let totals = monthly_totals(&sample_sales(), 2025);
        assert_eq!(totals.get(Month::January), Some(100.0));
        assert_eq!(totals.get(Month::February), Some(70.0));
        assert_eq!(totals.get(Month::April), None);
        assert_eq!(totals.peak(), Some((Month::March, 330.0)));
        assert_eq!(totals.trough(), Some((Month::February, 70.0)));
        assert_eq!(totals.peak_trough_ratio(), Some(330.0 / 70.0));
    }

    #[test]
    fn zero_trough_has_no_ratio() {
        let sales = vec![sales_row(
            2025,
            "Airport",
            &[(Month::January, 0.0), (Month::February, 10.0)],
            None,
        )];
        assert_eq!(monthly_totals(&sales, 2025).peak_trough_ratio(), None);
        assert_eq!(monthly_totals(&sales, 2030).peak(), None);
    }

    #[test]
    fn annual_revenue_prefers_year_totals() {
        let sales = sample_sales();
        assert_eq!(annual_revenue(&sales, 2025), 500.0);
        assert_eq!(annual_revenue(&sales, 2026), 190.0);
        assert_eq!(annual_revenue(&sales, 2030), 0.0);
    }

    #[test]
    fn picks_best_covered_year_and_its_successor() {
        let sales = sample_sales();
        assert_eq!(default_analysis_year(&sales), Some(2025));
        assert_eq!(next_year_after(&sales, 2025), Some(2026));
        assert_eq!(next_year_after(&sales, 2026), None);
        assert_eq!(default_analysis_year(&[]), None);
    }

    #[test]
    fn flags_mid_year_openings() {
        let openings = mid_year_openings(&sample_sales(), 2025);
        assert_eq!(
            openings,
            vec![BranchOpening {
                branch: "Jbeil".to_string(),
                first_month: "February".to_string(),
            }]
        );
    }

    #[test]
    fn yoy_change_for_shared_month() {
        let changes = yoy_changes(&sample_sales(), Month::January, 2025, 2026);
        // Jbeil had no January sales in 2025, so only Airport compares.
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].branch, "Airport");
        assert_eq!(changes[0].change_pct, Some(50.0));
        assert!(yoy_changes(&sample_sales(), Month::March, 2025, 2026).is_empty());
    }

    #[test]
    fn branch_ranking_guards_zero_quantity() {
        let categories = vec![
            category("Airport", TOTAL_CATEGORY, 100.0, 300.0, 700.0),
            category("Jbeil", TOTAL_CATEGORY, 0.0, 0.0, 0.0),
            category("Aley", TOTAL_CATEGORY, 10.0, 100.0, 900.0),
            category("Aley", "FOOD", 10.0, 100.0, 900.0),
        ];
        let ranking = branch_profit_ranking(&categories);
        assert_eq!(ranking.len(), 3);
        assert_eq!(ranking[0].branch, "Aley");
        assert_eq!(ranking[0].profit_per_unit, Some(90.0));
        assert_eq!(ranking[1].margin, Some(70.0));
        assert_eq!(ranking[2].branch, "Jbeil");
        assert_eq!(ranking[2].margin, None);
        assert_eq!(ranking[2].profit_per_unit, None);
    }

    #[test]
    fn category_comparison_and_mix() {
        let categories = vec![
            category("Airport", "BEVERAGES", 50.0, 40.0, 10.0),
            category("Airport", "FOOD", 10.0, 30.0, 20.0),
            category("Airport", TOTAL_CATEGORY, 60.0, 70.0, 30.0),
            category("Jbeil", "BEVERAGES", 20.0, 60.0, 90.0),
        ];
        let totals = category_comparison(&categories);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].category, "BEVERAGES");
        assert_eq!(totals[0].revenue, 200.0);
        assert_eq!(totals[0].profit, 100.0);
        assert_eq!(totals[0].margin, Some(50.0));
        assert_eq!(totals[1].profit_share, percent(20.0, 120.0));

        let mix = category_mix(&categories);
        assert_eq!(mix[0].branch, "Jbeil");
        assert_eq!(mix[0].share("BEVERAGES"), Some(100.0));
        assert_eq!(mix[1].share("BEVERAGES"), Some(50.0));
        assert_eq!(mix[1].share("FOOD"), Some(50.0));
    }

    #[test]
    fn empty_category_mix_share_is_none() {
        let mix = CategoryMix {
            branch: "Closed/Temp".to_string(),
            revenue_by_category: BTreeMap::new(),
            total_revenue: 0.0,
        };
        assert_eq!(mix.share("BEVERAGES"), None);
    }

    #[test]
    fn grouped_profit_totals_agree() {
        let products = vec![
            product("Airport", "BEVERAGES", "LATTE", 10.0, 20.0, 30.0),
            product("Airport", "FOOD", "DONUT", 5.0, 10.0, -4.0),
            product("Jbeil", "BEVERAGES", "LATTE", 3.0, 6.0, 9.0),
            ProductRecord {
                branch: None,
                ..product("x", "FOOD", "WRAP", 2.0, 8.0, 7.0)
            },
        ];
        let total: f64 = products.iter().map(|record| record.total_profit).sum();
        let by_branch: f64 = sum_by(&products, |r| r.branch.as_deref(), |r| r.total_profit)
            .iter()
            .map(|(_, value)| value)
            .sum();
        let by_category: f64 = sum_by(&products, |r| r.category.as_deref(), |r| r.total_profit)
            .iter()
            .map(|(_, value)| value)
            .sum();
        let by_product: f64 = product_summary(&products).iter().map(|item| item.profit).sum();
        assert_eq!(by_branch, total);
        assert_eq!(by_category, total);
        assert_eq!(by_product, total);

        let branches = sum_by(&products, |r| r.branch.as_deref(), |r| r.total_profit);
        assert_eq!(branches.last().map(|(label, _)| label.as_str()), Some(UNASSIGNED));
    }

    #[test]
    fn product_summary_splits_modifiers_and_losses() {
        let products = vec![
            product("Airport", "BEVERAGES", "LATTE", 150.0, 100.0, 200.0),
            product("Jbeil", "BEVERAGES", "LATTE", 50.0, 40.0, 60.0),
            product("Airport", "BEVERAGES", "ADD SHOT", 400.0, 10.0, 90.0),
            product("Airport", "FOOD", "SALAD", 120.0, 500.0, -50.0),
            product("Airport", "FOOD", "COOKIE", 20.0, 5.0, 5.0),
            product("Airport", "FOOD", "FREEBIE", 250.0, 0.0, 0.0),
        ];
        let summary = product_summary(&products);
        let latte = summary.iter().find(|item| item.product == "LATTE").unwrap();
        assert_eq!(latte.qty, 200.0);
        assert_eq!(latte.revenue, 400.0);
        assert_eq!(latte.margin, Some(65.0));
        assert_eq!(latte.avg_price, Some(2.0));

        let freebie = summary.iter().find(|item| item.product == "FREEBIE").unwrap();
        assert_eq!(freebie.margin, None);

        let core = core_products(&summary, DEFAULT_MIN_VOLUME);
        let names: Vec<&str> = core.iter().map(|item| item.product.as_str()).collect();
        assert_eq!(names, vec!["LATTE", "FREEBIE", "SALAD"]);
        assert_eq!(modifiers(&summary)[0].product, "ADD SHOT");

        let losses = loss_makers(&core);
        assert_eq!(losses.len(), 1);
        assert_eq!(losses[0].product, "SALAD");
        assert_eq!(top_by_volume(&core, 1)[0].product, "FREEBIE");
        assert_eq!(top_by_profit(&core, 1)[0].product, "LATTE");
    }

    #[test]
    fn menu_quadrants_split_on_medians() {
        let products = vec![
            product("A", "BEVERAGES", "STAR", 2000.0, 100.0, 900.0),
            product("A", "BEVERAGES", "HORSE", 3000.0, 800.0, 200.0),
            product("A", "FOOD", "PUZZLE", 600.0, 100.0, 900.0),
            product("A", "FOOD", "DOG", 700.0, 900.0, 100.0),
            product("A", "FOOD", "SMALL", 100.0, 10.0, 90.0),
        ];
        let summary = product_summary(&products);
        let menu = menu_engineering(&core_products(&summary, DEFAULT_MIN_VOLUME));
        assert_eq!(menu.len(), 4);
        let quadrant = |name: &str| {
            menu.iter()
                .find(|item| item.product == name)
                .map(|item| item.quadrant)
        };
        assert_eq!(quadrant("STAR"), Some(MenuQuadrant::Star));
        assert_eq!(quadrant("HORSE"), Some(MenuQuadrant::Workhorse));
        assert_eq!(quadrant("PUZZLE"), Some(MenuQuadrant::Puzzle));
        assert_eq!(quadrant("DOG"), Some(MenuQuadrant::Dog));
        assert_eq!(quadrant("SMALL"), None);
    }

    #[test]
    fn group_and_division_summaries() {
        let record = |division: &str, group: &str, qty: f64, amount: f64| GroupRecord {
            branch: Some("Airport".to_string()),
            division: Some(division.to_string()),
            group: Some(group.to_string()),
            product: "X".to_string(),
            qty,
            total_amount: amount,
        };
        let groups = vec![
            record("BEVERAGES", "HOT COFFEE", 10.0, 100.0),
            record("BEVERAGES", "FRAPPE", 5.0, 300.0),
            record("FOOD", "DONUTS", 8.0, 80.0),
            record("BEVERAGES", "HOT COFFEE", 2.0, 20.0),
        ];
        let by_group = group_summary(&groups);
        assert_eq!(by_group[0].label, "FRAPPE");
        assert_eq!(by_group[1].label, "HOT COFFEE");
        assert_eq!(by_group[1].qty, 12.0);
        assert_eq!(by_group[1].total_amount, 120.0);
        let by_division = division_summary(&groups);
        assert_eq!(by_division[0].label, "BEVERAGES");
        assert_eq!(by_division[0].total_amount, 420.0);
    }

    #[test]
    fn analyze_wires_everything_together() {
        let dataset = Dataset {
            monthly: sample_sales(),
            products: vec![product("Airport", "BEVERAGES", "LATTE", 150.0, 100.0, 200.0)],
            categories: vec![
                category("Airport", "BEVERAGES", 150.0, 100.0, 200.0),
                category("Airport", TOTAL_CATEGORY, 150.0, 100.0, 200.0),
            ],
            ..Dataset::default()
        };
        let analysis = analyze(&dataset, &AnalysisOptions::default());
        assert_eq!(analysis.year, Some(2025));
        assert_eq!(analysis.compare_year, Some(2026));
        assert_eq!(analysis.annual_revenue, 500.0);
        assert_eq!(analysis.branch_count, 2);
        assert_eq!(analysis.product_count, 1);
        assert_eq!(analysis.yoy.len(), 1);
        assert_eq!(analysis.openings.len(), 1);
        assert_eq!(analysis.average_branch_margin(), percent(200.0, 300.0));
        assert_eq!(analysis.yoy_mean_change(), Some(50.0));
    }

    #[test]
    fn analyze_empty_dataset_is_defined() {
        let analysis = analyze(&Dataset::default(), &AnalysisOptions::default());
        assert_eq!(analysis.year, None);
        assert_eq!(analysis.annual_revenue, 0.0);
        assert!(analysis.monthly_totals.is_none());
        assert_eq!(analysis.average_branch_margin(), None);
        assert_eq!(analysis.yoy_mean_change(), None);
    }
}

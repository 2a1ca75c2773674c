use chrono::Month;
use serde::{Deserialize, Serialize};

pub const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

pub const TOTAL_CATEGORY: &str = "TOTAL";
pub const MODIFIER_PREFIX: &str = "ADD ";

pub fn month_index(month: Month) -> usize {
    month.number_from_month() as usize - 1
}

/// One branch's row of the monthly sales summary for a single year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySales {
    pub year: i32,
    pub branch: String,
    pub months: [Option<f64>; 12],
    pub total_by_year: Option<f64>,
}

impl MonthlySales {
    pub fn new(year: i32, branch: String) -> Self {
        Self {
            year,
            branch,
            months: [None; 12],
            total_by_year: None,
        }
    }

    pub fn value(&self, month: Month) -> Option<f64> {
        self.months[month_index(month)]
    }

    pub fn set(&mut self, month: Month, value: f64) {
        self.months[month_index(month)] = Some(value);
    }

    pub fn monthly_sum(&self) -> f64 {
        self.months.iter().flatten().sum()
    }

    pub fn first_active_month(&self) -> Option<Month> {
        MONTHS
            .iter()
            .copied()
            .find(|month| self.value(*month).is_some_and(|value| value > 0.0))
    }
}

/// A product line from the product profitability report. `revenue` is always
/// `total_cost + total_profit`; `total_price` keeps the raw report value,
/// which is truncated in the exports this was built against. Treating cost
/// plus profit as the true revenue has not been reconciled against the POS
/// ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub branch: Option<String>,
    pub service: Option<String>,
    pub category: Option<String>,
    pub section: Option<String>,
    pub product: String,
    pub qty: f64,
    pub total_price: f64,
    pub total_cost: f64,
    pub cost_pct: f64,
    pub total_profit: f64,
    pub profit_pct: f64,
    pub revenue: f64,
}

impl ProductRecord {
    pub fn is_modifier(&self) -> bool {
        self.product.starts_with(MODIFIER_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub branch: Option<String>,
    pub category: String,
    pub qty: f64,
    pub total_price: f64,
    pub total_cost: f64,
    pub cost_pct: f64,
    pub total_profit: f64,
    pub profit_pct: f64,
    pub revenue: f64,
}

impl CategoryRecord {
    pub fn is_branch_total(&self) -> bool {
        self.category == TOTAL_CATEGORY
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub branch: Option<String>,
    pub division: Option<String>,
    pub group: Option<String>,
    pub product: String,
    pub qty: f64,
    pub total_amount: f64,
}

/// Numeric block shared by the product and category reports:
/// `qty, total price, <blank>, cost, cost %, profit, <blank>, profit %`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitColumns {
    pub qty: f64,
    pub total_price: f64,
    pub total_cost: f64,
    pub cost_pct: f64,
    pub total_profit: f64,
    pub profit_pct: f64,
}

impl ProfitColumns {
    pub fn revenue(&self) -> f64 {
        self.total_cost + self.total_profit
    }

    /// Raw total price that disagrees with cost + profit by more than half a unit.
    pub fn price_mismatch(&self) -> bool {
        (self.total_price - self.revenue()).abs() > 0.5
    }
}

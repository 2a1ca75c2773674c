use crate::analysis::Analysis;
use crate::dataset::Dataset;
use crate::error::{AnalyticsError, Result};
use crate::models::{MonthlySales, MONTHS};
use crate::monthly::YEAR_TOTAL_LABEL;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const MONTHLY_TABLE: &str = "monthly_sales.csv";
pub const PRODUCTS_TABLE: &str = "products.csv";
pub const CATEGORIES_TABLE: &str = "categories.csv";
pub const GROUPS_TABLE: &str = "groups.csv";
pub const BRANCH_PROFIT_TABLE: &str = "branch_profit.csv";
pub const PRODUCT_SUMMARY_TABLE: &str = "product_summary.csv";
pub const GROUP_SUMMARY_TABLE: &str = "group_summary.csv";
pub const YOY_TABLE: &str = "yoy.csv";

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| AnalyticsError::Write {
        path: dir.to_path_buf(),
        source,
    })
}

pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| AnalyticsError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// One row per (year, branch) with a column per month; absent months stay
/// empty.
pub fn write_monthly_table(path: &Path, rows: &[MonthlySales]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["Year".to_string(), "Branch".to_string()];
    header.extend(MONTHS.iter().map(|month| month.name().to_string()));
    header.push(YEAR_TOTAL_LABEL.to_string());
    writer.write_record(&header)?;

    let cell = |value: Option<f64>| value.map(|value| value.to_string()).unwrap_or_default();
    for row in rows {
        let mut record = vec![row.year.to_string(), row.branch.clone()];
        record.extend(row.months.iter().map(|value| cell(*value)));
        record.push(cell(row.total_by_year));
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|source| AnalyticsError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn export_parsed(dataset: &Dataset, dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    let monthly = dir.join(MONTHLY_TABLE);
    write_monthly_table(&monthly, &dataset.monthly)?;
    let products = dir.join(PRODUCTS_TABLE);
    write_table(&products, &dataset.products)?;
    let categories = dir.join(CATEGORIES_TABLE);
    write_table(&categories, &dataset.categories)?;
    let groups = dir.join(GROUPS_TABLE);
    write_table(&groups, &dataset.groups)?;

    let outputs = vec![monthly, products, categories, groups];
    log::info!("wrote {} parsed tables to {}", outputs.len(), dir.display());
    Ok(outputs)
}

pub fn export_analysis(analysis: &Analysis, dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    let branches = dir.join(BRANCH_PROFIT_TABLE);
    write_table(&branches, &analysis.branch_ranking)?;
    let products = dir.join(PRODUCT_SUMMARY_TABLE);
    write_table(&products, &analysis.products)?;
    let groups = dir.join(GROUP_SUMMARY_TABLE);
    write_table(&groups, &analysis.groups)?;
    let yoy = dir.join(YOY_TABLE);
    write_table(&yoy, &analysis.yoy)?;

    let outputs = vec![branches, products, groups, yoy];
    log::info!("wrote {} aggregate tables to {}", outputs.len(), dir.display());
    Ok(outputs)
}

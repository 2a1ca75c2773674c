use crate::analysis::Analysis;
use crate::error::{AnalyticsError, Result};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;

pub const SUMMARY_FILE: &str = "report_data.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub profit: f64,
    pub profit_share: Option<f64>,
    pub margin: Option<f64>,
}

/// Headline scalars for downstream reporting. Undefined ratios serialize as
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub year: Option<i32>,
    pub compare_year: Option<i32>,
    pub total_revenue: f64,
    pub num_branches: usize,
    pub num_products: usize,
    pub peak_month: Option<String>,
    pub peak_revenue: Option<f64>,
    pub trough_month: Option<String>,
    pub trough_revenue: Option<f64>,
    pub peak_trough_ratio: Option<f64>,
    pub categories: Vec<CategoryShare>,
    pub avg_branch_margin: Option<f64>,
    pub top_branch: Option<String>,
    pub top_branch_profit: Option<f64>,
    pub yoy_month: String,
    pub yoy_mean_change: Option<f64>,
    pub yoy_growing: usize,
    pub yoy_declining: usize,
    pub mid_year_openings: usize,
    pub price_mismatches: usize,
    pub generated_at: String,
}

impl ReportSummary {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let peak = analysis.monthly_totals.as_ref().and_then(|totals| totals.peak());
        let trough = analysis
            .monthly_totals
            .as_ref()
            .and_then(|totals| totals.trough());
        let top = analysis.branch_ranking.first();
        let changes = || analysis.yoy.iter().filter_map(|change| change.change_pct);

        Self {
            year: analysis.year,
            compare_year: analysis.compare_year,
            total_revenue: analysis.annual_revenue,
            num_branches: analysis.branch_count,
            num_products: analysis.product_count,
            peak_month: peak.map(|(month, _)| month.name().to_string()),
            peak_revenue: peak.map(|(_, total)| total),
            trough_month: trough.map(|(month, _)| month.name().to_string()),
            trough_revenue: trough.map(|(_, total)| total),
            peak_trough_ratio: analysis
                .monthly_totals
                .as_ref()
                .and_then(|totals| totals.peak_trough_ratio()),
            categories: analysis
                .categories
                .iter()
                .map(|category| CategoryShare {
                    category: category.category.clone(),
                    profit: category.profit,
                    profit_share: category.profit_share,
                    margin: category.margin,
                })
                .collect(),
            avg_branch_margin: analysis.average_branch_margin(),
            top_branch: top.map(|branch| branch.branch.clone()),
            top_branch_profit: top.map(|branch| branch.profit),
            yoy_month: analysis.yoy_month.name().to_string(),
            yoy_mean_change: analysis.yoy_mean_change(),
            yoy_growing: changes().filter(|change| *change > 0.0).count(),
            yoy_declining: changes().filter(|change| *change < 0.0).count(),
            mid_year_openings: analysis.openings.len(),
            price_mismatches: analysis.price_mismatches,
            generated_at: Utc::now().to_rfc3339(),
        }
    }
}

pub fn write_summary(summary: &ReportSummary, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| AnalyticsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(output, json).map_err(|source| AnalyticsError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    log::info!("summary written to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, AnalysisOptions};
    use crate::dataset::Dataset;
    use crate::normalize::BranchNormalizer;

    const MONTHLY: &str = "\
Stories,,,,
,,January,February,March
2025,Stories Airport,100,300,200
,Stories Jbeil,0,50,40
2026,Stories Airport,120
,Stories Jbeil,30
";

    const CATEGORIES: &str = "\
Stories Airport,,,,,,,,
BEVERAGES,50,50,,40,80%,10,,20%
FOOD,10,90,,60,67%,30,,33%
Total By Branch,60,140,,100,,40,,
Stories Jbeil,,,,,,,,
BEVERAGES,20,,,10,,10,,
Total By Branch,20,,,10,,10,,
";

    fn sample() -> ReportSummary {
        let dataset = Dataset::from_texts(MONTHLY, "", "", CATEGORIES, &BranchNormalizer::default());
        let analysis = analyze(&dataset, &AnalysisOptions::default());
        ReportSummary::from_analysis(&analysis)
    }

    #[test]
    fn summarizes_headline_figures() {
        let summary = sample();
        assert_eq!(summary.year, Some(2025));
        assert_eq!(summary.compare_year, Some(2026));
        assert_eq!(summary.total_revenue, 690.0);
        assert_eq!(summary.num_branches, 2);
        assert_eq!(summary.peak_month.as_deref(), Some("February"));
        assert_eq!(summary.peak_revenue, Some(350.0));
        assert_eq!(summary.trough_month.as_deref(), Some("January"));
        assert_eq!(summary.top_branch.as_deref(), Some("Airport"));
        assert_eq!(summary.top_branch_profit, Some(40.0));
        assert_eq!(summary.mid_year_openings, 1);
        // Both Jbeil rows leave Total Price empty.
        assert_eq!(summary.price_mismatches, 2);
    }

    #[test]
    fn yoy_counts_growth_and_decline_separately() {
        let summary = sample();
        // Jbeil has no January 2025 sales and drops out of the comparison.
        assert_eq!(summary.yoy_growing, 1);
        assert_eq!(summary.yoy_declining, 0);
        assert_eq!(summary.yoy_mean_change, Some(20.0));
    }

    #[test]
    fn writes_pretty_json_with_nulls() {
        let dir = std::env::temp_dir().join(format!("pos-analytics-summary-{}", std::process::id()));
        let output = dir.join("nested").join(SUMMARY_FILE);
        let analysis = analyze(&Dataset::default(), &AnalysisOptions::default());
        write_summary(&ReportSummary::from_analysis(&analysis), &output).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["total_revenue"], 0.0);
        assert!(value["peak_trough_ratio"].is_null());
        assert!(value["avg_branch_margin"].is_null());
        assert_eq!(value["yoy_month"], "January");
        assert!(value["generated_at"].is_string());
        std::fs::remove_dir_all(&dir).ok();
    }
}

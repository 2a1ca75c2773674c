use crate::analysis::{
    loss_makers, top_by_profit, top_by_volume, Analysis, GroupSummary, MenuQuadrant,
};
use crate::logging::emit_info_line;
use crate::products::CATEGORIES;
use crate::util::{format_amount, format_percent, format_ratio, format_signed_percent};

const QUADRANTS: [MenuQuadrant; 4] = [
    MenuQuadrant::Star,
    MenuQuadrant::Workhorse,
    MenuQuadrant::Puzzle,
    MenuQuadrant::Dog,
];

pub fn log_analysis_report(analysis: &Analysis) {
    for line in narrative(analysis) {
        emit_info_line(&line);
    }
}

pub fn narrative(analysis: &Analysis) -> Vec<String> {
    let mut lines = Vec::new();
    seasonality(analysis, &mut lines);
    branches(analysis, &mut lines);
    categories(analysis, &mut lines);
    products(analysis, &mut lines);
    menu(analysis, &mut lines);
    groups("Division", &analysis.divisions, analysis.top, &mut lines);
    groups("Group", &analysis.groups, analysis.top, &mut lines);
    year_over_year(analysis, &mut lines);
    if analysis.price_mismatches > 0 {
        lines.push(format!(
            "Data quality: {} rows with Total Price differing from cost + profit",
            analysis.price_mismatches
        ));
    }
    lines
}

fn seasonality(analysis: &Analysis, lines: &mut Vec<String>) {
    let Some(totals) = analysis.monthly_totals.as_ref() else {
        lines.push("Seasonality: no monthly sales parsed".to_string());
        return;
    };
    lines.push(format!(
        "Seasonality {}: revenue={} branches={} products={}",
        totals.year,
        format_amount(analysis.annual_revenue),
        analysis.branch_count,
        analysis.product_count
    ));
    for (month, total) in totals.present() {
        lines.push(format!("  {:<10} {:>15}", month.name(), format_amount(total)));
    }
    if let (Some((peak, peak_total)), Some((trough, trough_total))) = (totals.peak(), totals.trough())
    {
        lines.push(format!(
            "Peak {} ({}), trough {} ({}), peak/trough ratio {}",
            peak.name(),
            format_amount(peak_total),
            trough.name(),
            format_amount(trough_total),
            format_ratio(totals.peak_trough_ratio())
        ));
    }
    if !analysis.openings.is_empty() {
        let openings: Vec<String> = analysis
            .openings
            .iter()
            .map(|opening| format!("{} ({})", opening.branch, opening.first_month))
            .collect();
        lines.push(format!("Mid-year openings: {}", openings.join(", ")));
    }
}

fn branches(analysis: &Analysis, lines: &mut Vec<String>) {
    lines.push(format!(
        "Branch profitability ({} branches, avg margin {})",
        analysis.branch_ranking.len(),
        format_percent(analysis.average_branch_margin())
    ));
    for (rank, branch) in analysis.branch_ranking.iter().take(analysis.top).enumerate() {
        lines.push(format!(
            "  {:>2}. {:<20} profit={} margin={} profit/unit={}",
            rank + 1,
            branch.branch,
            format_amount(branch.profit),
            format_percent(branch.margin),
            format_ratio(branch.profit_per_unit)
        ));
    }
}

fn categories(analysis: &Analysis, lines: &mut Vec<String>) {
    for category in &analysis.categories {
        lines.push(format!(
            "Category {}: revenue={} profit={} margin={} profit share={}",
            category.category,
            format_amount(category.revenue),
            format_amount(category.profit),
            format_percent(category.margin),
            format_percent(category.profit_share)
        ));
    }
    let lead = CATEGORIES[0];
    for mix in analysis.category_mix.iter().take(analysis.top) {
        lines.push(format!(
            "  {:<20} {} share {}",
            mix.branch,
            lead,
            format_percent(mix.share(lead))
        ));
    }
}

fn products(analysis: &Analysis, lines: &mut Vec<String>) {
    let core = analysis.core_products();
    let modifiers = analysis.modifiers();
    lines.push(format!(
        "Products: {} core (qty >= {}), {} modifiers",
        core.len(),
        analysis.min_volume,
        modifiers.len()
    ));
    for item in top_by_profit(&core, analysis.top) {
        lines.push(format!(
            "  profit {:<30} {:>12} margin={}",
            item.product,
            format_amount(item.profit),
            format_percent(item.margin)
        ));
    }
    for item in top_by_volume(&core, analysis.top) {
        lines.push(format!(
            "  volume {:<30} {:>12}",
            item.product,
            format_amount(item.qty)
        ));
    }
    let modifier_profit: f64 = modifiers.iter().map(|item| item.profit).sum();
    lines.push(format!(
        "Modifier profit: {}",
        format_amount(modifier_profit)
    ));
    let losses = loss_makers(&core);
    if !losses.is_empty() {
        lines.push(format!("Loss makers: {}", losses.len()));
        for item in losses.iter().take(analysis.top) {
            lines.push(format!(
                "  {:<30} {:>12}",
                item.product,
                format_amount(item.profit)
            ));
        }
    }
}

fn menu(analysis: &Analysis, lines: &mut Vec<String>) {
    if analysis.menu.is_empty() {
        return;
    }
    let counts: Vec<String> = QUADRANTS
        .iter()
        .map(|quadrant| {
            let count = analysis
                .menu
                .iter()
                .filter(|item| item.quadrant == *quadrant)
                .count();
            format!("{}={}", quadrant.label(), count)
        })
        .collect();
    lines.push(format!("Menu engineering: {}", counts.join(" ")));
}

fn groups(label: &str, summary: &[GroupSummary], top: usize, lines: &mut Vec<String>) {
    if summary.is_empty() {
        return;
    }
    lines.push(format!("Sales by {}:", label.to_lowercase()));
    for item in summary.iter().take(top) {
        lines.push(format!(
            "  {:<30} qty={} amount={}",
            item.label,
            format_amount(item.qty),
            format_amount(item.total_amount)
        ));
    }
}

fn year_over_year(analysis: &Analysis, lines: &mut Vec<String>) {
    let (Some(base), Some(compare)) = (analysis.year, analysis.compare_year) else {
        return;
    };
    lines.push(format!(
        "YoY {} {} vs {}: {} branches, mean change {}",
        analysis.yoy_month.name(),
        compare,
        base,
        analysis.yoy.len(),
        format_signed_percent(analysis.yoy_mean_change())
    ));
    for change in analysis.yoy.iter().take(analysis.top) {
        lines.push(format!(
            "  {:<20} {} -> {} ({})",
            change.branch,
            format_amount(change.base_value),
            format_amount(change.compare_value),
            format_signed_percent(change.change_pct)
        ));
    }
}

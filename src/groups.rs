use crate::layout::{report_lines, ParseStats, Parsed, ReportLine, GROUP_NOISE};
use crate::models::GroupRecord;
use crate::normalize::BranchNormalizer;
use crate::util::parse_number;

const BRANCH_MARKER: &str = "Branch:";
const DIVISION_MARKER: &str = "Division:";
const GROUP_MARKER: &str = "Group:";
const MIN_GROUP_FIELDS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum GroupLine {
    Noise,
    Branch(String),
    Division(String),
    Group(String),
    Subtotal,
    Item(String),
    Unrecognized,
}

pub fn classify_group_line(line: &ReportLine<'_>) -> GroupLine {
    if GROUP_NOISE.is_noise(line) {
        return GroupLine::Noise;
    }
    let name = line.first();
    if let Some(rest) = name.strip_prefix(BRANCH_MARKER) {
        return GroupLine::Branch(rest.trim().to_string());
    }
    if let Some(rest) = name.strip_prefix(DIVISION_MARKER) {
        return GroupLine::Division(rest.trim().to_string());
    }
    if let Some(rest) = name.strip_prefix(GROUP_MARKER) {
        return GroupLine::Group(rest.trim().to_string());
    }
    if name.starts_with("Total by") || name.starts_with("Total By") {
        return GroupLine::Subtotal;
    }
    if line.len() >= MIN_GROUP_FIELDS && !name.is_empty() {
        return GroupLine::Item(name.to_string());
    }
    GroupLine::Unrecognized
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupContext {
    pub branch: Option<String>,
    pub division: Option<String>,
    pub group: Option<String>,
}

struct GroupAccumulator<'n> {
    normalizer: &'n BranchNormalizer,
    context: GroupContext,
    records: Vec<GroupRecord>,
    stats: ParseStats,
}

impl<'n> GroupAccumulator<'n> {
    fn step(mut self, line: ReportLine<'_>) -> Self {
        self.stats.lines += 1;
        match classify_group_line(&line) {
            GroupLine::Noise => self.stats.noise += 1,
            GroupLine::Branch(raw) => {
                self.context.branch = Some(self.normalizer.normalize(&raw));
                self.stats.markers += 1;
            }
            GroupLine::Division(division) => {
                self.context.division = Some(division);
                self.stats.markers += 1;
            }
            GroupLine::Group(group) => {
                self.context.group = Some(group);
                self.stats.markers += 1;
            }
            GroupLine::Subtotal => self.stats.subtotals += 1,
            GroupLine::Item(product) => {
                let qty = parse_number(line.field(2));
                let total_amount = parse_number(line.field(3));
                if qty > 0.0 {
                    self.records.push(GroupRecord {
                        branch: self.context.branch.clone(),
                        division: self.context.division.clone(),
                        group: self.context.group.clone(),
                        product,
                        qty,
                        total_amount,
                    });
                    self.stats.records += 1;
                } else {
                    self.stats.skipped += 1;
                }
            }
            GroupLine::Unrecognized => {
                log::trace!("line {}: skipped {:?}", line.number, line.raw);
                self.stats.skipped += 1;
            }
        }
        self
    }
}

/// Parses the sales-by-groups report (`Description, Barcode, Qty, Total Amount`).
pub fn parse_groups(text: &str, normalizer: &BranchNormalizer) -> Parsed<GroupRecord> {
    let acc = GroupAccumulator {
        normalizer,
        context: GroupContext::default(),
        records: Vec::new(),
        stats: ParseStats::default(),
    };
    let acc = report_lines(text).fold(acc, |acc, line| acc.step(line));
    Parsed {
        records: acc.records,
        stats: acc.stats,
    }
}

use crate::categories::parse_categories;
use crate::error::{AnalyticsError, Result};
use crate::groups::parse_groups;
use crate::layout::ParseStats;
use crate::models::{CategoryRecord, GroupRecord, MonthlySales, ProductRecord};
use crate::monthly::parse_monthly;
use crate::normalize::BranchNormalizer;
use crate::products::parse_products;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const MONTHLY_FILE: &str = "REP_S_00134_SMRY.csv";
pub const PRODUCTS_FILE: &str = "rep_s_00014_SMRY.csv";
pub const GROUPS_FILE: &str = "rep_s_00191_SMRY-3.csv";
pub const CATEGORIES_FILE: &str = "rep_s_00673_SMRY.csv";

pub const DEFAULT_DATA_DIRS: &[&str] = &["data", "../data", "."];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputPaths {
    pub monthly: PathBuf,
    pub products: PathBuf,
    pub groups: PathBuf,
    pub categories: PathBuf,
}

impl InputPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            monthly: dir.join(MONTHLY_FILE),
            products: dir.join(PRODUCTS_FILE),
            groups: dir.join(GROUPS_FILE),
            categories: dir.join(CATEGORIES_FILE),
        }
    }

    pub fn all(&self) -> [&Path; 4] {
        [
            self.monthly.as_path(),
            self.products.as_path(),
            self.groups.as_path(),
            self.categories.as_path(),
        ]
    }

    pub fn missing(&self) -> Vec<PathBuf> {
        self.all()
            .iter()
            .filter(|path| !path.is_file())
            .map(|path| path.to_path_buf())
            .collect()
    }

    /// First candidate directory holding all four exports.
    pub fn discover<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        let mut first_missing = None;
        for dir in candidates {
            let paths = Self::in_dir(dir.as_ref());
            let missing = paths.missing();
            if missing.is_empty() {
                log::debug!("using report exports in {}", dir.as_ref().display());
                return Ok(paths);
            }
            if first_missing.is_none() {
                first_missing = Some(missing);
            }
        }
        Err(AnalyticsError::MissingInputs(
            first_missing.unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatasetStats {
    pub monthly: ParseStats,
    pub products: ParseStats,
    pub groups: ParseStats,
    pub categories: ParseStats,
}

impl DatasetStats {
    pub fn price_mismatches(&self) -> usize {
        self.products.price_mismatches + self.categories.price_mismatches
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub monthly: Vec<MonthlySales>,
    pub products: Vec<ProductRecord>,
    pub groups: Vec<GroupRecord>,
    pub categories: Vec<CategoryRecord>,
    pub stats: DatasetStats,
}

impl Dataset {
    pub fn from_texts(
        monthly: &str,
        products: &str,
        groups: &str,
        categories: &str,
        normalizer: &BranchNormalizer,
    ) -> Self {
        let monthly = parse_monthly(monthly, normalizer);
        let products = parse_products(products, normalizer);
        let groups = parse_groups(groups, normalizer);
        let categories = parse_categories(categories, normalizer);
        Self {
            monthly: monthly.records,
            products: products.records,
            groups: groups.records,
            categories: categories.records,
            stats: DatasetStats {
                monthly: monthly.stats,
                products: products.stats,
                groups: groups.stats,
                categories: categories.stats,
            },
        }
    }

    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.monthly.iter().map(|row| row.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}

/// Reads an export as text. Exports carry a UTF-8 BOM and occasionally bytes
/// that are not valid UTF-8; both are tolerated.
pub fn read_report(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| AnalyticsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.strip_prefix('\u{feff}').unwrap_or(&*text).to_string())
}

pub fn load_dataset(paths: &InputPaths, normalizer: &BranchNormalizer) -> Result<Dataset> {
    let missing = paths.missing();
    if !missing.is_empty() {
        return Err(AnalyticsError::MissingInputs(missing));
    }
    let monthly = read_report(&paths.monthly)?;
    let products = read_report(&paths.products)?;
    let groups = read_report(&paths.groups)?;
    let categories = read_report(&paths.categories)?;
    let dataset = Dataset::from_texts(&monthly, &products, &groups, &categories, normalizer);

    for (label, stats) in [
        ("monthly sales", &dataset.stats.monthly),
        ("product profitability", &dataset.stats.products),
        ("sales by groups", &dataset.stats.groups),
        ("category summary", &dataset.stats.categories),
    ] {
        log::info!(
            "parsed {}: records={} lines={} noise={} markers={} subtotals={} skipped={}",
            label,
            stats.records,
            stats.lines,
            stats.noise,
            stats.markers,
            stats.subtotals,
            stats.skipped
        );
    }
    let mismatches = dataset.stats.price_mismatches();
    if mismatches > 0 {
        log::warn!(
            "{} rows report a Total Price that differs from cost + profit; revenue uses cost + profit",
            mismatches
        );
    }
    Ok(dataset)
}

/// Completed parses for the lifetime of one process, keyed by input paths.
/// Only a normalizer change or `clear` forces a re-read.
#[derive(Debug, Default)]
pub struct DatasetCache {
    normalizer: BranchNormalizer,
    entries: HashMap<InputPaths, Rc<Dataset>>,
}

impl DatasetCache {
    /// Branch names are baked into cached parses, so swapping the
    /// normalizer drops them.
    pub fn set_normalizer(&mut self, normalizer: BranchNormalizer) {
        self.normalizer = normalizer;
        self.clear();
    }

    pub fn get_or_load(&mut self, paths: &InputPaths) -> Result<Rc<Dataset>> {
        if let Some(dataset) = self.entries.get(paths) {
            log::debug!("reusing cached parse");
            return Ok(Rc::clone(dataset));
        }
        let dataset = Rc::new(load_dataset(paths, &self.normalizer)?);
        self.entries.insert(paths.clone(), Rc::clone(&dataset));
        Ok(dataset)
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("dropping {} cached parse(s)", self.entries.len());
        }
        self.entries.clear();
    }
}

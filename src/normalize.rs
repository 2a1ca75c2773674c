use crate::error::{AnalyticsError, Result};
use std::collections::HashMap;
use std::path::Path;

pub const BRANCH_PREFIX: &str = "Stories";
pub const CLOSED_BRANCH: &str = "Closed/Temp";

const BRANCH_CORRECTIONS: &[(&str, &str)] = &[
    ("Alay", "Aley"),
    ("Lau", "LAU"),
    (".", CLOSED_BRANCH),
    ("", CLOSED_BRANCH),
];

#[derive(Debug, Clone)]
pub struct BranchNormalizer {
    prefix: String,
    corrections: HashMap<String, String>,
}

impl Default for BranchNormalizer {
    fn default() -> Self {
        Self::new(BRANCH_PREFIX)
    }
}

impl BranchNormalizer {
    pub fn new(prefix: &str) -> Self {
        let corrections = BRANCH_CORRECTIONS
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        Self {
            prefix: prefix.to_string(),
            corrections,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Adds a correction. The key is compared against the title-cased name,
    /// so it is title-cased here as well.
    pub fn add_correction(&mut self, from: &str, to: &str) {
        self.corrections
            .insert(title_case(from.trim()), to.trim().to_string());
    }

    /// Loads extra corrections from a JSON object of `"raw": "canonical"` pairs.
    pub fn load_corrections(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path).map_err(|source| AnalyticsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table: HashMap<String, String> =
            serde_json::from_str(&content).map_err(|err| AnalyticsError::InvalidAliases {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        let count = table.len();
        for (from, to) in table {
            self.add_correction(&from, &to);
        }
        log::debug!(
            "loaded {} branch corrections from {}",
            count,
            path.display()
        );
        Ok(count)
    }

    pub fn normalize(&self, raw: &str) -> String {
        let stripped = strip_prefix_ignore_case(raw.trim(), &self.prefix);
        let titled = title_case(stripped);
        match self.corrections.get(&titled) {
            Some(canonical) => canonical.clone(),
            None => titled,
        }
    }
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return name;
    }
    let head = match name.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => head,
        _ => return name,
    };
    let rest = &name[head.len()..];
    if rest.chars().next().is_some_and(|ch| ch.is_alphanumeric()) {
        return name;
    }
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('-').unwrap_or(rest);
    rest.trim()
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the
/// rest, so `"SIN EL FIL"` and `"sin el fil"` both become `"Sin El Fil"`.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_alpha = false;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                // Only the first char of a multi-char upper case mapping (ß -> SS)
                // stays upper, matching title case.
                let mut upper = ch.to_uppercase();
                out.extend(upper.next());
                out.extend(upper.flat_map(char::to_lowercase));
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_and_title_cases() {
        let normalizer = BranchNormalizer::default();
        assert_eq!(normalizer.normalize("Stories - AIRPORT"), "Airport");
        assert_eq!(normalizer.normalize("  stories sin el fil "), "Sin El Fil");
        assert_eq!(normalizer.normalize("STORIES-Sour 2"), "Sour 2");
        assert_eq!(normalizer.normalize("Branch A"), "Branch A");
        assert_eq!(normalizer.normalize("Storiesville"), "Storiesville");
    }

    #[test]
    fn applies_correction_table() {
        let normalizer = BranchNormalizer::default();
        assert_eq!(normalizer.normalize("Stories Alay"), "Aley");
        assert_eq!(normalizer.normalize("Stories LAU"), "LAU");
        assert_eq!(normalizer.normalize("Stories."), CLOSED_BRANCH);
        assert_eq!(normalizer.normalize("Stories"), CLOSED_BRANCH);
        assert_eq!(normalizer.normalize("   "), CLOSED_BRANCH);
    }

    #[test]
    fn normalizing_twice_is_stable() {
        let normalizer = BranchNormalizer::default();
        let names = [
            "Stories Alay",
            "Stories LAU",
            "Stories.",
            "stories - ramlet el bayda",
            "Stories Centro Mall",
            "O'NEIL street",
            "Event Starco",
            "Stories ßaida",
            "ﬁdar",
            "",
        ];
        for name in names {
            let once = normalizer.normalize(name);
            let twice = normalizer.normalize(&once);
            assert_eq!(once, twice, "not idempotent for {name:?}");
        }
    }

    #[test]
    fn title_case_handles_punctuation() {
        assert_eq!(title_case("o'neil"), "O'Neil");
        assert_eq!(title_case("ain el-mreisseh"), "Ain El-Mreisseh");
        assert_eq!(title_case("closed/temp"), "Closed/Temp");
        assert_eq!(title_case("ßaida"), "Ssaida");
    }

    #[test]
    fn runtime_corrections_are_title_case_keyed() {
        let mut normalizer = BranchNormalizer::default();
        normalizer.add_correction("BIR HASSAN", "Bir Hasan");
        assert_eq!(normalizer.normalize("Stories bir hassan"), "Bir Hasan");
    }

    #[test]
    fn loads_corrections_from_json() {
        let path = std::env::temp_dir().join(format!(
            "pos-analytics-aliases-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"Jounieh 2": "Jounieh", "kaslik": "Kaslik Souk"}"#).unwrap();
        let mut normalizer = BranchNormalizer::default();
        assert_eq!(normalizer.load_corrections(&path).unwrap(), 2);
        assert_eq!(normalizer.normalize("Stories JOUNIEH 2"), "Jounieh");
        assert_eq!(normalizer.normalize("Stories Kaslik"), "Kaslik Souk");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_malformed_alias_file() {
        let path = std::env::temp_dir().join(format!(
            "pos-analytics-bad-aliases-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "[1, 2]").unwrap();
        let mut normalizer = BranchNormalizer::default();
        let err = normalizer.load_corrections(&path).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidAliases { .. }));
        std::fs::remove_file(&path).ok();
    }
}

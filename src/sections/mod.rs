//! Flat section/key-value documents and their three-way merge.
//!
//! These are config-style text files: `[section]` headers, `key = value`
//! lines, `#`/`;` comments. Keys before any header belong to a reserved
//! root pseudo-section. The merge is pure and returns its diagnostics;
//! the caller decides how to surface them.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::tier::Tier;

/// Reserved pseudo-section for keys declared before any `[section]`
/// header. Always serialized first, never with a header line.
pub const ROOT_SECTION: &str = "__root__";

/// Non-fatal diagnostic recorded when an incoming tier overwrites an
/// existing key with a different value. Observability only; it never
/// alters the merged output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictRecord {
    pub section: String,
    pub key: String,
    pub winner: Tier,
    pub value: String,
}

impl std::fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} overridden by {} value '{}'",
            self.section, self.key, self.winner, self.value
        )
    }
}

/// Parsed representation of a flat key-value-with-headers document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTable {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl SectionTable {
    /// Parse a document. Lines are trimmed; blank lines and `#`/`;`
    /// comments are skipped; a leading UTF-8 BOM is ignored; a line
    /// without `=` that is not a header is ignored.
    pub fn parse(input: &str) -> SectionTable {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let mut table = SectionTable::default();
        let mut current = ROOT_SECTION.to_string();

        for raw in input.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                current = name.trim().to_string();
                table.sections.entry(current.clone()).or_default();
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                table
                    .sections
                    .entry(current.clone())
                    .or_default()
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        table
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)?
            .get(key)
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(BTreeMap::is_empty)
    }

    /// Apply a higher-priority table on top of this one, recording a
    /// conflict for every key it overwrites with a different value.
    fn apply(&mut self, incoming: SectionTable, tier: Tier, conflicts: &mut Vec<ConflictRecord>) {
        for (section, entries) in incoming.sections {
            let target = self.sections.entry(section.clone()).or_default();
            for (key, value) in entries {
                if let Some(existing) = target.get(&key) {
                    if *existing != value {
                        conflicts.push(ConflictRecord {
                            section: section.clone(),
                            key: key.clone(),
                            winner: tier,
                            value: value.clone(),
                        });
                    }
                }
                target.insert(key, value);
            }
        }
    }

    /// Serialize deterministically: root pseudo-section keys first
    /// (sorted), then named sections in ascending order, keys sorted,
    /// one `key = value` per line, blank line after each block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.sections.get(ROOT_SECTION) {
            if !root.is_empty() {
                for (key, value) in root {
                    let _ = writeln!(out, "{key} = {value}");
                }
                out.push('\n');
            }
        }
        for (section, entries) in &self.sections {
            if section == ROOT_SECTION {
                continue;
            }
            let _ = writeln!(out, "[{section}]");
            for (key, value) in entries {
                let _ = writeln!(out, "{key} = {value}");
            }
            out.push('\n');
        }
        out
    }
}

/// Merge three tier tables, lowest priority first. Override always wins;
/// conflicts are reported, Patch's fully before Overlay's, and within a
/// tier in section/key order.
pub fn merge_sections(
    base: SectionTable,
    patch: SectionTable,
    overlay: SectionTable,
) -> (SectionTable, Vec<ConflictRecord>) {
    let mut merged = base;
    let mut conflicts = Vec::new();
    merged.apply(patch, Tier::Patch, &mut conflicts);
    merged.apply(overlay, Tier::Overlay, &mut conflicts);
    (merged, conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_comments_and_root_keys() {
        let table = SectionTable::parse(
            "\u{feff}top = 1\n# comment\n; also comment\n\n[Sounds]\nvolume = 50\n  spacy key  =  padded value  \nnot a kv line\n",
        );
        assert_eq!(table.get(ROOT_SECTION, "top"), Some("1"));
        assert_eq!(table.get("Sounds", "volume"), Some("50"));
        assert_eq!(table.get("Sounds", "spacy key"), Some("padded value"));
    }

    #[test]
    fn value_may_contain_equals() {
        let table = SectionTable::parse("formula = a=b+c\n");
        assert_eq!(table.get(ROOT_SECTION, "formula"), Some("a=b+c"));
    }

    #[test]
    fn conflict_example_from_sounds_section() {
        let base = SectionTable::parse("[Sounds]\nvolume=50\n");
        let patch = SectionTable::parse("[Sounds]\nvolume=80\n");
        let overlay = SectionTable::default();

        let (merged, conflicts) = merge_sections(base, patch, overlay);
        assert_eq!(merged.render(), "[Sounds]\nvolume = 80\n\n");
        assert_eq!(
            conflicts,
            vec![ConflictRecord {
                section: "Sounds".to_string(),
                key: "volume".to_string(),
                winner: Tier::Patch,
                value: "80".to_string(),
            }]
        );
    }

    #[test]
    fn same_value_restated_is_not_a_conflict() {
        let base = SectionTable::parse("[S]\nk=1\n");
        let patch = SectionTable::parse("[S]\nk=1\n");
        let (_, conflicts) = merge_sections(base, patch, SectionTable::default());
        assert!(conflicts.is_empty());
    }

    #[test]
    fn overlay_wins_after_patch_and_both_conflicts_reported_in_order() {
        let base = SectionTable::parse("[S]\nk=1\n");
        let patch = SectionTable::parse("[S]\nk=2\n");
        let overlay = SectionTable::parse("[S]\nk=3\n");

        let (merged, conflicts) = merge_sections(base, patch, overlay);
        assert_eq!(merged.get("S", "k"), Some("3"));
        let winners: Vec<Tier> = conflicts.iter().map(|c| c.winner).collect();
        assert_eq!(winners, [Tier::Patch, Tier::Overlay]);
    }

    #[test]
    fn new_sections_and_keys_insert_silently() {
        let base = SectionTable::parse("[A]\nx=1\n");
        let patch = SectionTable::parse("[A]\ny=2\n[B]\nz=3\n");
        let (merged, conflicts) = merge_sections(base, patch, SectionTable::default());
        assert!(conflicts.is_empty());
        assert_eq!(merged.get("A", "x"), Some("1"));
        assert_eq!(merged.get("A", "y"), Some("2"));
        assert_eq!(merged.get("B", "z"), Some("3"));
    }

    #[test]
    fn render_orders_root_first_then_sections_sorted() {
        let table = SectionTable::parse(
            "[Zeta]\nb=2\na=1\n[Alpha]\nk=v\n",
        );
        let (merged, _) = merge_sections(
            table,
            SectionTable::parse("zz_root = yes\naa_root = also\n"),
            SectionTable::default(),
        );
        assert_eq!(
            merged.render(),
            "aa_root = also\nzz_root = yes\n\n[Alpha]\nk = v\n\n[Zeta]\na = 1\nb = 2\n\n"
        );
    }

    #[test]
    fn render_is_independent_of_input_line_order() {
        let a = SectionTable::parse("[S]\nb=2\na=1\n");
        let b = SectionTable::parse("[S]\na=1\nb=2\n");
        assert_eq!(a.render(), b.render());
    }

    #[test]
    fn header_only_section_renders_empty_block() {
        let table = SectionTable::parse("[Empty]\n");
        assert_eq!(table.render(), "[Empty]\n\n");
    }
}

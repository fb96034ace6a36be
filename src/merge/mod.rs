//! Hierarchical tree merger for catalog documents.
//!
//! Merges two parsed documents pairwise, the second ("source") taking
//! priority on conflicts. A three-tier merge chains pairwise, low to
//! high priority: `merge(merge(Base, Patch), Overlay)`, so later tiers
//! always win.
//!
//! Children are matched across documents by `(tag, IdentityKey)`.
//! Anonymous children, those with no stable identity, are instead
//! deduplicated by structural signature: an exact restatement of a
//! subtree already present is dropped, anything structurally different
//! is appended.

mod identity;

pub use identity::{IdentityKey, StructuralSignature};

use std::collections::HashMap;

use crate::catalog::Node;

/// Merge `source` into `target` in place, with `source` winning
/// conflicts.
///
/// The two roots are assumed to represent the same logical document;
/// mismatched root tags are not reconciled; attributes and children
/// merge under `target`'s root.
pub fn merge_nodes(target: &mut Node, source: Node) {
    // Source attributes overwrite same-named target attributes; target
    // attributes absent from source are left untouched.
    for (name, value) in &source.attrs {
        target.set_attr(name, value);
    }

    // Index target children: identity-bearing children by (tag, key),
    // anonymous children by signature in a per-tag pool.
    let mut by_key: HashMap<(String, IdentityKey), usize> = HashMap::new();
    let mut anonymous: HashMap<String, Vec<StructuralSignature>> = HashMap::new();
    for (i, child) in target.children.iter().enumerate() {
        let key = IdentityKey::resolve(child);
        if key.is_anonymous() {
            anonymous
                .entry(child.tag.clone())
                .or_default()
                .push(StructuralSignature::of(child));
        } else {
            // First occurrence wins the slot, matching merge order.
            by_key.entry((child.tag.clone(), key)).or_insert(i);
        }
    }

    for child in source.children {
        let key = IdentityKey::resolve(&child);
        if key.is_anonymous() {
            let signature = StructuralSignature::of(&child);
            let pool = anonymous.entry(child.tag.clone()).or_default();
            if pool.contains(&signature) {
                // Duplicate restatement of content already present,
                // including content appended earlier in this same pass.
                continue;
            }
            pool.push(signature);
            target.children.push(child);
        } else {
            let slot = (child.tag.clone(), key);
            match by_key.get(&slot) {
                Some(&i) => merge_nodes(&mut target.children[i], child),
                None => {
                    by_key.insert(slot, target.children.len());
                    target.children.push(child);
                }
            }
        }
    }
}

/// Fold per-tier documents, lowest priority first. Absent tiers
/// contribute nothing; a single present tier passes through unmerged;
/// all tiers absent yields `None`.
pub fn merge_documents<I>(documents: I) -> Option<Node>
where
    I: IntoIterator<Item = Option<Node>>,
{
    let mut merged: Option<Node> = None;
    for document in documents {
        match (merged.as_mut(), document) {
            (Some(target), Some(source)) => merge_nodes(target, source),
            (None, Some(source)) => merged = Some(source),
            (_, None) => {}
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{parse_document, ParseOutcome};

    fn parse(input: &str) -> Node {
        match parse_document(input.as_bytes()) {
            ParseOutcome::Parsed(node) => node,
            ParseOutcome::Unparseable(err) => panic!("expected parse: {err}"),
        }
    }

    fn merged(target: &str, source: &str) -> Node {
        let mut t = parse(target);
        merge_nodes(&mut t, parse(source));
        t
    }

    #[test]
    fn source_attributes_overwrite_not_replace() {
        let result = merged(
            "<Catalog version=\"1\" author=\"a\"/>",
            "<Catalog version=\"2\" extra=\"x\"/>",
        );
        assert_eq!(result.attr("version"), Some("2"));
        assert_eq!(result.attr("author"), Some("a"));
        assert_eq!(result.attr("extra"), Some("x"));
    }

    #[test]
    fn identity_match_recurses_in_place() {
        let result = merged(
            "<Catalog><CUnit id=\"marine\" hp=\"10\"><Armor value=\"1\"/></CUnit></Catalog>",
            "<Catalog><CUnit id=\"marine\" hp=\"15\"/></Catalog>",
        );
        assert_eq!(result.children.len(), 1);
        let unit = &result.children[0];
        assert_eq!(unit.attr("hp"), Some("15"));
        // Children only the target defined survive the override.
        assert_eq!(unit.children.len(), 1);
        assert_eq!(unit.children[0].attr("value"), Some("1"));
    }

    #[test]
    fn new_identity_children_append_after_inherited() {
        let result = merged(
            "<Catalog><CUnit id=\"a\"/><CUnit id=\"b\"/></Catalog>",
            "<Catalog><CUnit id=\"c\"/><CUnit id=\"a\"/></Catalog>",
        );
        let ids: Vec<&str> = result
            .children
            .iter()
            .filter_map(|c| c.attr("id"))
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn index_and_value_identities_match() {
        let result = merged(
            "<u><Weapon index=\"0\" dmg=\"6\"/><Flag value=\"f\" on=\"0\"/></u>",
            "<u><Weapon index=\"0\" dmg=\"9\"/><Flag value=\"f\" on=\"1\"/></u>",
        );
        assert_eq!(result.children.len(), 2);
        assert_eq!(result.children[0].attr("dmg"), Some("9"));
        assert_eq!(result.children[1].attr("on"), Some("1"));
    }

    #[test]
    fn attrs_identity_matches_regardless_of_order() {
        let result = merged(
            "<u><Cost food=\"1\" gas=\"2\"><note/></Cost></u>",
            "<u><Cost gas=\"2\" food=\"1\"><extra/></Cost></u>",
        );
        assert_eq!(result.children.len(), 1);
        assert_eq!(result.children[0].children.len(), 2);
    }

    #[test]
    fn anonymous_duplicate_is_dropped() {
        let result = merged(
            "<u><effect><amount>5</amount></effect></u>",
            "<u><effect><amount>5</amount></effect></u>",
        );
        assert_eq!(result.children.len(), 1);
    }

    #[test]
    fn anonymous_duplicate_detected_across_reordered_children() {
        let result = merged(
            "<u><effect><a/><b/></effect></u>",
            "<u><effect><b/><a/></effect></u>",
        );
        assert_eq!(result.children.len(), 1);
    }

    #[test]
    fn structurally_different_anonymous_nodes_both_kept() {
        let result = merged(
            "<u><effect><amount>5</amount></effect></u>",
            "<u><effect><amount>7</amount></effect></u>",
        );
        assert_eq!(result.children.len(), 2);
    }

    #[test]
    fn anonymous_dedup_includes_nodes_appended_same_pass() {
        let result = merged(
            "<u/>",
            "<u><effect><amount>5</amount></effect><effect><amount>5</amount></effect></u>",
        );
        assert_eq!(result.children.len(), 1);
    }

    #[test]
    fn no_two_children_share_tag_and_identity() {
        let result = merged(
            "<Catalog><CUnit id=\"m\"/><CAbil id=\"m\"/></Catalog>",
            "<Catalog><CUnit id=\"m\" hp=\"1\"/><CUnit id=\"n\"/></Catalog>",
        );
        // Same id under a different tag is a different logical entity.
        assert_eq!(result.children.len(), 3);
        let mut seen = std::collections::HashSet::new();
        for child in &result.children {
            let key = (child.tag.clone(), IdentityKey::resolve(child));
            assert!(seen.insert(key));
        }
    }

    #[test]
    fn merge_against_itself_is_idempotent() {
        let doc = "<Catalog v=\"1\"><CUnit id=\"m\" hp=\"10\"><W index=\"0\"/></CUnit>\
                   <effect><amount>5</amount></effect></Catalog>";
        let result = merge_documents([
            Some(parse(doc)),
            Some(parse(doc)),
            Some(parse(doc)),
        ])
        .unwrap();
        assert_eq!(result, parse(doc));
    }

    #[test]
    fn chained_merge_lets_overlay_win() {
        let result = merge_documents([
            Some(parse("<u hp=\"10\"/>")),
            Some(parse("<u hp=\"15\"/>")),
            Some(parse("<u hp=\"20\"/>")),
        ])
        .unwrap();
        assert_eq!(result.attr("hp"), Some("20"));
    }

    #[test]
    fn absent_tiers_pass_through() {
        let result = merge_documents([None, Some(parse("<u hp=\"1\"/>")), None]).unwrap();
        assert_eq!(result.attr("hp"), Some("1"));
        assert_eq!(merge_documents([None, None, None]), None);
    }
}

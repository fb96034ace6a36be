//! Identity resolution and structural fingerprints for catalog nodes.

use std::collections::BTreeMap;

use crate::catalog::Node;

/// Stable comparison key used to match a node against nodes from another
/// tier. Resolution precedence is fixed: an `id` attribute, else `index`,
/// else `value`, else the full sorted attribute set; a node with no
/// attributes at all has no stable identity.
///
/// Two nodes with equal tag and equal non-anonymous key are the same
/// logical entity. Anonymous nodes are matched only by full structural
/// equality via [`StructuralSignature`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    ById(String),
    ByIndex(String),
    ByValue(String),
    ByAttrs(Vec<(String, String)>),
    Anonymous,
}

impl IdentityKey {
    /// Resolve a node's identity. Pure function of the attribute set;
    /// declaration order never affects the result.
    pub fn resolve(node: &Node) -> IdentityKey {
        if let Some(v) = node.attr("id") {
            return IdentityKey::ById(v.to_string());
        }
        if let Some(v) = node.attr("index") {
            return IdentityKey::ByIndex(v.to_string());
        }
        if let Some(v) = node.attr("value") {
            return IdentityKey::ByValue(v.to_string());
        }
        if !node.attrs.is_empty() {
            return IdentityKey::ByAttrs(node.sorted_attrs());
        }
        IdentityKey::Anonymous
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, IdentityKey::Anonymous)
    }
}

/// Canonical, order-insensitive fingerprint of an entire subtree.
///
/// Child signatures aggregate as a counted multiset, so two subtrees
/// whose children appear in different orders but are otherwise identical
/// compare equal. Used only for anonymous nodes, to detect duplicate
/// restatements of the same content across tiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructuralSignature {
    tag: String,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<(StructuralSignature, usize)>,
}

impl StructuralSignature {
    /// Sign a subtree, recursively signing every descendant.
    pub fn of(node: &Node) -> StructuralSignature {
        let mut counts: BTreeMap<StructuralSignature, usize> = BTreeMap::new();
        for child in &node.children {
            *counts.entry(StructuralSignature::of(child)).or_insert(0) += 1;
        }
        StructuralSignature {
            tag: node.tag.clone(),
            attrs: node.sorted_attrs(),
            text: node.normalized_text().map(str::to_string),
            children: counts.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(tag: &str, attrs: &[(&str, &str)]) -> Node {
        let mut n = Node::new(tag);
        for (k, v) in attrs {
            n.set_attr(k, v);
        }
        n
    }

    #[test]
    fn id_outranks_index_value_and_attrs() {
        let n = node("u", &[("value", "3"), ("index", "2"), ("id", "1")]);
        assert_eq!(IdentityKey::resolve(&n), IdentityKey::ById("1".into()));

        let n = node("u", &[("value", "3"), ("index", "2")]);
        assert_eq!(IdentityKey::resolve(&n), IdentityKey::ByIndex("2".into()));

        let n = node("u", &[("other", "x"), ("value", "3")]);
        assert_eq!(IdentityKey::resolve(&n), IdentityKey::ByValue("3".into()));
    }

    #[test]
    fn attr_key_ignores_declaration_order() {
        let a = node("u", &[("b", "2"), ("a", "1")]);
        let b = node("u", &[("a", "1"), ("b", "2")]);
        assert_eq!(IdentityKey::resolve(&a), IdentityKey::resolve(&b));
    }

    #[test]
    fn attributeless_node_is_anonymous() {
        assert!(IdentityKey::resolve(&node("effect", &[])).is_anonymous());
    }

    #[test]
    fn signature_is_child_order_insensitive() {
        let mut a = node("effect", &[]);
        a.children.push(node("amount", &[("value", "5")]));
        a.children.push(node("kind", &[("value", "fire")]));

        let mut b = node("effect", &[]);
        b.children.push(node("kind", &[("value", "fire")]));
        b.children.push(node("amount", &[("value", "5")]));

        assert_eq!(StructuralSignature::of(&a), StructuralSignature::of(&b));
    }

    #[test]
    fn signature_counts_repeated_children() {
        let mut a = node("effect", &[]);
        a.children.push(node("amount", &[]));
        a.children.push(node("amount", &[]));

        let mut b = node("effect", &[]);
        b.children.push(node("amount", &[]));

        assert_ne!(StructuralSignature::of(&a), StructuralSignature::of(&b));
    }

    #[test]
    fn signature_normalizes_text_whitespace() {
        let mut a = node("note", &[]);
        a.text = Some("  hello  ".to_string());
        let mut b = node("note", &[]);
        b.text = Some("hello".to_string());
        assert_eq!(StructuralSignature::of(&a), StructuralSignature::of(&b));

        let mut blank = node("note", &[]);
        blank.text = Some("   ".to_string());
        assert_eq!(
            StructuralSignature::of(&blank),
            StructuralSignature::of(&node("note", &[]))
        );
    }

    #[test]
    fn signature_distinguishes_different_text() {
        let mut a = node("amount", &[]);
        a.text = Some("5".to_string());
        let mut b = node("amount", &[]);
        b.text = Some("7".to_string());
        assert_ne!(StructuralSignature::of(&a), StructuralSignature::of(&b));
    }
}

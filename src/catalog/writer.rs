//! Deterministic serialization of catalog documents.
//!
//! Output shape is fixed: XML declaration, two-space indentation, one
//! element per line, self-closing tags for childless, textless elements.
//! Byte-identical output for logically identical trees.

use super::Node;

/// Serialize a document with the standard declaration header.
pub fn write_document(root: &Node) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    write_node(root, 0, &mut out);
    out
}

fn write_node(node: &Node, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push('<');
    out.push_str(&node.tag);
    for (name, value) in &node.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }

    let text = node.normalized_text();
    if node.children.is_empty() && text.is_none() {
        out.push_str("/>\n");
        return;
    }
    out.push('>');

    if node.children.is_empty() {
        // Text-only element stays on one line.
        escape_into(text.unwrap_or(""), false, out);
    } else {
        out.push('\n');
        if let Some(text) = text {
            for _ in 0..=depth {
                out.push_str("  ");
            }
            escape_into(text, false, out);
            out.push('\n');
        }
        for child in &node.children {
            write_node(child, depth + 1, out);
        }
        for _ in 0..depth {
            out.push_str("  ");
        }
    }
    out.push_str("</");
    out.push_str(&node.tag);
    out.push_str(">\n");
}

fn escape_into(raw: &str, in_attribute: bool, out: &mut String) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

//! Tolerant parser for catalog markup.
//!
//! Accepts the XML subset catalog files actually use: one root element,
//! attributes with single or double quotes, nested elements, text
//! content, comments, CDATA, processing instructions, and a DOCTYPE.
//! Namespaces and DTD internals are not interpreted.

use super::{CatalogError, Node};

/// Result of attempting to parse one tier's copy of a catalog file.
///
/// An unparseable copy is treated as absent for its tier; the caller
/// applies the absent-tier fallback policy.
#[derive(Debug)]
pub enum ParseOutcome {
    Parsed(Node),
    Unparseable(CatalogError),
}

impl ParseOutcome {
    pub fn into_node(self) -> Option<Node> {
        match self {
            ParseOutcome::Parsed(node) => Some(node),
            ParseOutcome::Unparseable(_) => None,
        }
    }
}

/// Parse a catalog document from raw file bytes.
pub fn parse_document(bytes: &[u8]) -> ParseOutcome {
    let text = match std::str::from_utf8(bytes) {
        Ok(t) => t,
        Err(_) => return ParseOutcome::Unparseable(CatalogError::NotUtf8),
    };
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    match parse_root(text) {
        Ok(node) => ParseOutcome::Parsed(node),
        Err(err) => ParseOutcome::Unparseable(err),
    }
}

fn parse_root(input: &str) -> Result<Node, CatalogError> {
    let mut cur = Cursor::new(input);
    cur.skip_misc()?;
    if cur.eof() {
        return Err(CatalogError::NoRoot);
    }
    let node = cur.parse_element()?;
    cur.skip_misc()?;
    if !cur.eof() {
        return Err(CatalogError::TrailingContent(cur.pos));
    }
    Ok(node)
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Cursor { input, pos: 0 }
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn malformed(&self, reason: &str) -> CatalogError {
        CatalogError::Malformed {
            offset: self.pos,
            reason: reason.to_string(),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Skip a delimited region (comment, PI, DOCTYPE) ending at `close`.
    fn skip_until(&mut self, close: &str) -> Result<(), CatalogError> {
        match self.rest().find(close) {
            Some(at) => {
                self.pos += at + close.len();
                Ok(())
            }
            None => Err(CatalogError::UnexpectedEof(self.input.len())),
        }
    }

    /// Skip whitespace, XML declarations, comments, and a DOCTYPE.
    fn skip_misc(&mut self) -> Result<(), CatalogError> {
        loop {
            self.skip_ws();
            if self.rest().starts_with("<?") {
                self.skip_until("?>")?;
            } else if self.rest().starts_with("<!--") {
                self.skip_until("-->")?;
            } else if self.rest().starts_with("<!") {
                self.skip_until(">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn read_name(&mut self) -> Result<&'a str, CatalogError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.malformed("expected a name"));
        }
        Ok(&self.input[start..self.pos])
    }

    fn parse_element(&mut self) -> Result<Node, CatalogError> {
        if self.peek() != Some(b'<') {
            return Err(self.malformed("expected '<'"));
        }
        self.pos += 1;
        let mut node = Node::new(self.read_name()?);

        loop {
            self.skip_ws();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok(node);
            }
            if self.peek() == Some(b'>') {
                self.pos += 1;
                self.parse_content(&mut node)?;
                return Ok(node);
            }
            if self.eof() {
                return Err(CatalogError::UnexpectedEof(self.pos));
            }
            let name = self.read_name()?;
            self.skip_ws();
            if self.peek() != Some(b'=') {
                return Err(self.malformed("expected '=' after attribute name"));
            }
            self.pos += 1;
            self.skip_ws();
            let quote = match self.peek() {
                Some(q @ (b'"' | b'\'')) => q as char,
                _ => return Err(self.malformed("expected quoted attribute value")),
            };
            self.pos += 1;
            let end = self
                .rest()
                .find(quote)
                .ok_or(CatalogError::UnexpectedEof(self.input.len()))?;
            let raw = &self.input[self.pos..self.pos + end];
            self.pos += end + 1;
            node.set_attr(name, &decode_entities(raw));
        }
    }

    /// Parse children and text up to the matching close tag.
    fn parse_content(&mut self, node: &mut Node) -> Result<(), CatalogError> {
        let mut text = String::new();
        loop {
            let gap = self
                .rest()
                .find('<')
                .ok_or(CatalogError::UnexpectedEof(self.input.len()))?;
            if gap > 0 {
                text.push_str(&decode_entities(&self.input[self.pos..self.pos + gap]));
                self.pos += gap;
            }

            if self.rest().starts_with("</") {
                self.pos += 2;
                let found_at = self.pos;
                let found = self.read_name()?;
                self.skip_ws();
                if self.peek() != Some(b'>') {
                    return Err(self.malformed("expected '>' after closing tag"));
                }
                self.pos += 1;
                if found != node.tag {
                    return Err(CatalogError::MismatchedClose {
                        offset: found_at,
                        expected: node.tag.clone(),
                        found: found.to_string(),
                    });
                }
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    node.text = Some(trimmed.to_string());
                }
                return Ok(());
            } else if self.rest().starts_with("<!--") {
                self.skip_until("-->")?;
            } else if self.rest().starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                let end = self
                    .rest()
                    .find("]]>")
                    .ok_or(CatalogError::UnexpectedEof(self.input.len()))?;
                text.push_str(&self.input[self.pos..self.pos + end]);
                self.pos += end + 3;
            } else if self.rest().starts_with("<?") {
                self.skip_until("?>")?;
            } else {
                node.children.push(self.parse_element()?);
            }
        }
    }
}

/// Decode the predefined entities plus numeric character references.
/// Unrecognized entities pass through literally.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        let Some(semi) = rest.find(';') else {
            out.push_str(rest);
            return out;
        };
        let entity = &rest[1..semi];
        match entity {
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "amp" => out.push('&'),
            "apos" => out.push('\''),
            "quot" => out.push('"'),
            _ => {
                let decoded = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32);
                match decoded {
                    Some(c) => out.push(c),
                    None => out.push_str(&rest[..=semi]),
                }
            }
        }
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    out
}

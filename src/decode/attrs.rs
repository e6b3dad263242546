//! Attribute mapping from XML elements to constructor arguments.
//!
//! An [`AttributeMap`] flattens one element's direct children into
//! `(tag, text)` pairs. A decode function pulls the tags it knows with
//! [`require`](AttributeMap::require) and [`optional`](AttributeMap::optional)
//! and then calls [`finish`](AttributeMap::finish), which rejects any tag the
//! type never declared.

use std::str::FromStr;

use super::error::DecodeError;

/// Flattened view of one XML element's direct children.
///
/// Text payloads are trimmed; a child with no text (or only whitespace) is
/// treated as absent, both for required and optional tags.
#[derive(Debug)]
pub struct AttributeMap {
    element: String,
    entries: Vec<Entry>,
}

#[derive(Debug)]
struct Entry {
    tag: String,
    text: String,
    consumed: bool,
}

impl AttributeMap {
    /// Collect the direct element children of `node`.
    pub fn of(node: roxmltree::Node<'_, '_>) -> Self {
        let entries = node
            .children()
            .filter(roxmltree::Node::is_element)
            .filter_map(|child| {
                let text = child.text().map(str::trim).unwrap_or_default();
                if text.is_empty() {
                    return None;
                }
                Some(Entry {
                    tag: child.tag_name().name().to_string(),
                    text: text.to_string(),
                    consumed: false,
                })
            })
            .collect();

        Self {
            element: node.tag_name().name().to_string(),
            entries,
        }
    }

    /// The tag name of the element this map was built from.
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Take the text of a required tag.
    pub fn require(&mut self, tag: &'static str) -> Result<String, DecodeError> {
        self.take(tag).ok_or_else(|| DecodeError::MissingField {
            element: self.element.clone(),
            tag,
        })
    }

    /// Take the text of an optional tag, if present.
    pub fn optional(&mut self, tag: &'static str) -> Option<String> {
        self.take(tag)
    }

    /// Fail if any tag was never consumed.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.entries.into_iter().find(|e| !e.consumed) {
            Some(entry) => Err(DecodeError::UnknownField {
                element: self.element,
                tag: entry.tag,
            }),
            None => Ok(()),
        }
    }

    fn take(&mut self, tag: &str) -> Option<String> {
        let entry = self.entries.iter_mut().find(|e| e.tag == tag)?;
        entry.consumed = true;
        Some(entry.text.clone())
    }
}

/// Parse a decimal integer tag value.
pub fn parse_int<T: FromStr>(tag: &'static str, value: &str) -> Result<T, DecodeError> {
    value.parse().map_err(|_| DecodeError::InvalidValue {
        tag,
        value: value.to_string(),
        expected: "an integer",
    })
}

/// Parse a boolean-like tag value (`true`/`false`, case-insensitive).
pub fn parse_bool(tag: &'static str, value: &str) -> Result<bool, DecodeError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(DecodeError::InvalidValue {
            tag,
            value: value.to_string(),
            expected: "true or false",
        })
    }
}

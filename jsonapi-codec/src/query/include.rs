//! Include expressions
//!
//! The `include` query parameter names relationship paths (`author,comments.author`) whose
//! targets are rendered into the `included` member. Paths are held as a tree so that the
//! outbound converter can walk it alongside the resource graph.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncludeParseError {
    #[error("include path at position {0} is empty")]
    EmptyPath(usize),
    #[error("include path '{0}' contains an empty relationship name")]
    EmptySegment(String),
}

/// One relationship in an include tree with the paths continuing below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeElement {
    pub relationship: String,
    pub children: Vec<IncludeElement>,
}

impl IncludeElement {
    pub fn new(relationship: impl Into<String>) -> Self {
        IncludeElement {
            relationship: relationship.into(),
            children: Vec::new(),
        }
    }

    pub fn find(&self, relationship: &str) -> Option<&IncludeElement> {
        self.children
            .iter()
            .find(|child| child.relationship == relationship)
    }
}

/// A tree of relationship paths to include.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeExpression {
    elements: Vec<IncludeElement>,
}

impl IncludeExpression {
    /// Expression that includes nothing (but still renders `included: []`).
    pub fn empty() -> Self {
        IncludeExpression::default()
    }

    /// Parse the query-string form: comma-separated, dot-delimited paths.
    ///
    /// Paths sharing a prefix are merged; an empty string yields an empty expression.
    pub fn parse(text: &str) -> Result<Self, IncludeParseError> {
        let mut expression = IncludeExpression::empty();
        if text.trim().is_empty() {
            return Ok(expression);
        }
        for (position, path) in text.split(',').enumerate() {
            let path = path.trim();
            if path.is_empty() {
                return Err(IncludeParseError::EmptyPath(position));
            }
            let segments: Vec<&str> = path.split('.').map(str::trim).collect();
            if segments.iter().any(|segment| segment.is_empty()) {
                return Err(IncludeParseError::EmptySegment(path.to_string()));
            }
            expression.add_path(&segments);
        }
        Ok(expression)
    }

    /// Merge one relationship path into the tree.
    pub fn add_path<S: AsRef<str>>(&mut self, path: &[S]) {
        let mut level = &mut self.elements;
        for segment in path {
            let name = segment.as_ref();
            let position = match level.iter().position(|e| e.relationship == name) {
                Some(position) => position,
                None => {
                    level.push(IncludeElement::new(name));
                    level.len() - 1
                }
            };
            level = &mut level[position].children;
        }
    }

    /// Builder-style [`IncludeExpression::add_path`] for dotted paths.
    pub fn with_path(mut self, dotted: &str) -> Self {
        let segments: Vec<&str> = dotted.split('.').collect();
        self.add_path(&segments);
        self
    }

    pub fn elements(&self) -> &[IncludeElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Top-level element for a relationship.
    pub fn find(&self, relationship: &str) -> Option<&IncludeElement> {
        self.elements
            .iter()
            .find(|element| element.relationship == relationship)
    }
}

impl FromStr for IncludeExpression {
    type Err = IncludeParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        IncludeExpression::parse(text)
    }
}

fn write_paths(
    f: &mut fmt::Formatter<'_>,
    prefix: &str,
    elements: &[IncludeElement],
    first: &mut bool,
) -> fmt::Result {
    for element in elements {
        let path = if prefix.is_empty() {
            element.relationship.clone()
        } else {
            format!("{prefix}.{}", element.relationship)
        };
        if element.children.is_empty() {
            if !*first {
                f.write_str(",")?;
            }
            *first = false;
            f.write_str(&path)?;
        } else {
            write_paths(f, &path, &element.children, first)?;
        }
    }
    Ok(())
}

/// Renders the leaf paths in query-string form.
impl fmt::Display for IncludeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        write_paths(f, "", &self.elements, &mut first)
    }
}

//! Declarative element matching.
//!
//! A small stand-in for the CSS selectors the host contract is written in.
//! Every specified property must match (AND logic); an empty matcher matches
//! any element.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Document, DomError, NodeId};

/// Attribute criterion of an [`ElementMatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttributeMatch {
    /// Attribute name.
    pub name: String,
    /// Required value. When absent, presence of the attribute is enough.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Matches elements by tag, class and attribute.
///
/// `li[role="tab"]` is written as
/// `ElementMatcher::tag("li").with_attribute("role", "tab")`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ElementMatcher {
    /// Tag name, compared case-insensitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Class the element must carry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Attribute the element must carry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<AttributeMatch>,
}

impl ElementMatcher {
    /// Matches any element with the given tag.
    #[must_use]
    pub fn tag(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            ..Self::default()
        }
    }

    /// Matches any element with the given class.
    #[must_use]
    pub fn class(class: &str) -> Self {
        Self {
            class: Some(class.to_string()),
            ..Self::default()
        }
    }

    /// Adds an attribute equality criterion.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attribute = Some(AttributeMatch {
            name: name.to_string(),
            value: Some(value.to_string()),
        });
        self
    }

    /// Creates a detached element that this matcher matches.
    ///
    /// Unspecified tags become `div`, and an attribute that only has to be
    /// present is set to the empty string.
    ///
    /// # Errors
    ///
    /// Returns an error if the new element cannot be edited.
    pub fn create(&self, doc: &mut Document) -> Result<NodeId, DomError> {
        let element = doc.create_element(self.tag.as_deref().unwrap_or("div"));
        if let Some(class) = &self.class {
            doc.add_class(element, class)?;
        }
        if let Some(attribute) = &self.attribute {
            doc.set_attribute(element, &attribute.name, attribute.value.as_deref().unwrap_or(""))?;
        }
        Ok(element)
    }

    /// Returns `true` if `node` is an element satisfying every criterion.
    #[must_use]
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };

        if let Some(expected) = &self.tag
            && !tag.eq_ignore_ascii_case(expected)
        {
            return false;
        }

        if let Some(class) = &self.class
            && !doc.has_class(node, class)
        {
            return false;
        }

        if let Some(attribute) = &self.attribute {
            match (doc.attribute(node, &attribute.name), &attribute.value) {
                (None, _) => return false,
                (Some(actual), Some(expected)) if actual != expected => return false,
                _ => {}
            }
        }

        true
    }
}

//! Extended identifiers.
//!
//! The data service represents identifiers outside the standard set as an
//! `identity` of type `other` with `other-type-definition` set to `extended`.
//! The real identifier is an XML document (usually entity-escaped) stored in
//! the `name` property. Expansion parses that document into an ordinary
//! [`Identifier`]: the root element's local name becomes the type, every
//! attribute becomes `/path[@attr]` and non-blank element text becomes
//! `/path`. Paths use local names, so namespace prefixes do not matter.

use roxmltree::{Document, Node};

use crate::error::Result;
use crate::model::{Identifier, Properties};

pub const IDENTITY_TYPE: &str = "identity";
pub const IDENTITY_NAME: &str = "/identity[@name]";
pub const IDENTITY_KIND: &str = "/identity[@type]";
pub const IDENTITY_DEFINITION: &str = "/identity[@other-type-definition]";

impl Identifier {
    /// Whether this is an `identity` wrapping an extended identifier document.
    pub fn is_extended(&self) -> bool {
        self.type_name == IDENTITY_TYPE
            && self.property(IDENTITY_KIND) == Some("other")
            && self.property(IDENTITY_DEFINITION) == Some("extended")
    }
}

/// The identifier an extended identity stands for.
///
/// `Ok(None)` when `identifier` is not extended or carries no document.
/// Raw data is kept from the wrapping identity.
pub fn expand_extended(identifier: &Identifier) -> Result<Option<Identifier>> {
    if !identifier.is_extended() {
        return Ok(None);
    }
    let Some(name) = identifier.property(IDENTITY_NAME) else {
        return Ok(None);
    };

    let xml = unescape(name.trim());
    let document = Document::parse(&xml)?;
    let root = document.root_element();

    let mut properties = Properties::new();
    collect(root, &format!("/{}", root.tag_name().name()), &mut properties);

    let mut expanded = Identifier::new(root.tag_name().name(), properties);
    expanded.raw_data = identifier.raw_data.clone();
    Ok(Some(expanded))
}

fn collect(node: Node<'_, '_>, path: &str, properties: &mut Properties) {
    for attribute in node.attributes() {
        properties.insert(format!("{path}[@{}]", attribute.name()), attribute.value());
    }

    let text: String = node
        .children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect();
    let text = text.trim();
    if !text.is_empty() {
        properties.insert(path, text);
    }

    for child in node.children().filter(Node::is_element) {
        collect(child, &format!("{path}/{}", child.tag_name().name()), properties);
    }
}

/// Undo the entity escaping the data service applies to the embedded document.
fn unescape(xml: &str) -> String {
    if xml.starts_with('<') {
        return xml.to_string();
    }
    xml.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

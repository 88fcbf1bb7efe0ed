//! Canonical content form and SHA-256 digest of a graph.
//!
//! The digest covers every identifier with its attached metadata and every
//! link with its endpoints in sorted order, so it is independent of insertion
//! order, link direction, raw data and the graph timestamp.

use sha2::{Digest, Sha256};

use crate::model::{Identifier, Metadata};
use crate::store::MetadataGraph;

fn identifier_form(identifier: &Identifier) -> String {
    serde_json::json!([identifier.type_name, identifier.properties.sorted()]).to_string()
}

fn metadata_form(metadata: &Metadata) -> String {
    serde_json::json!([
        metadata.type_name,
        metadata.cardinality(),
        metadata.properties.sorted()
    ])
    .to_string()
}

impl MetadataGraph {
    /// One line per identifier and one per link, sorted.
    pub fn canonical_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.identifier_count() + self.link_count());

        for identifier in self.identifiers() {
            let mut metadata: Vec<String> =
                self.metadata_of(identifier).iter().map(metadata_form).collect();
            metadata.sort_unstable();
            lines.push(format!("v {} {}", identifier_form(identifier), metadata.join(" ")));
        }

        for link in self.links() {
            let a = identifier_form(&link.source);
            let b = identifier_form(&link.target);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            lines.push(format!("l {} {} {}", lo, hi, metadata_form(&link.metadata)));
        }

        lines.sort_unstable();
        lines
    }

    /// Hex SHA-256 over [`canonical_lines`](Self::canonical_lines).
    pub fn content_digest(&self) -> String {
        let joined = self.canonical_lines().join("\n");
        let digest = Sha256::digest(joined.as_bytes());
        format!("{digest:x}")
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Identifier, Metadata, Properties};
    use crate::store::MetadataGraph;

    fn ident(type_name: &str, value: &str) -> Identifier {
        let props: Properties = [(format!("/{type_name}[@value]"), value.to_string())]
            .into_iter()
            .collect();
        Identifier::new(type_name, props)
    }

    fn link_meta(type_name: &str) -> Metadata {
        let props: Properties = [(format!("/meta:{type_name}[@ifmap-cardinality]"), "multiValue")]
            .into_iter()
            .collect();
        Metadata::new(type_name, props)
    }

    #[test]
    fn digest_ignores_direction_and_order() {
        let mut a = MetadataGraph::new();
        a.add_link(ident("ip-address", "1"), ident("mac-address", "x"), link_meta("ip-mac"));
        a.add_link(ident("ip-address", "1"), ident("mac-address", "y"), link_meta("ip-mac"));

        let mut b = MetadataGraph::new();
        b.add_link(ident("mac-address", "y"), ident("ip-address", "1"), link_meta("ip-mac"));
        b.add_link(ident("mac-address", "x"), ident("ip-address", "1"), link_meta("ip-mac"));
        b.set_last_updated(99);

        assert_eq!(a.content_digest(), b.content_digest());
        assert_eq!(a.content_digest().len(), 64);
    }

    #[test]
    fn digest_distinguishes_swapped_edges() {
        // The additive hash this replaces could not tell these apart when the
        // per-edge hashes happened to sum up equally.
        let mut a = MetadataGraph::new();
        a.add_link(ident("device", "1"), ident("ip-address", "1"), link_meta("device-ip"));
        a.add_link(ident("device", "2"), ident("ip-address", "2"), link_meta("device-ip"));

        let mut b = MetadataGraph::new();
        b.add_link(ident("device", "1"), ident("ip-address", "2"), link_meta("device-ip"));
        b.add_link(ident("device", "2"), ident("ip-address", "1"), link_meta("device-ip"));

        assert_ne!(a.content_digest(), b.content_digest());
    }

    #[test]
    fn digest_covers_identifier_metadata() {
        let mut a = MetadataGraph::new();
        a.add_metadata_to_identifier(ident("device", "1"), link_meta("event"));
        let mut b = MetadataGraph::new();
        b.add_metadata_to_identifier(ident("device", "1"), link_meta("capability"));
        assert_ne!(a.content_digest(), b.content_digest());
    }
}

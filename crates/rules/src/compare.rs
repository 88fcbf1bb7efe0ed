//! Comparison of pattern elements against live graph elements.
//!
//! All comparisons take the relation table of the current search branch.
//! Bindings are made on a scratch copy and written back only when the whole
//! element matched, so a failed comparison never leaks partial bindings.

use gpm_graph::{expand_extended, Identifier, Metadata, Properties};
use tracing::debug;

use crate::pattern::{PatternMetadata, PatternProperties, PatternProperty, PatternVertex};
use crate::relation::RelationTable;

fn satisfies(property: &PatternProperty, live: Option<&str>, relations: &mut RelationTable) -> bool {
    if property.related {
        if let Some(name) = property.value.as_deref() {
            return match relations.get(name).map(|bound| live == Some(bound)) {
                Some(equal) => equal != property.restricted,
                None => {
                    // An absent live value leaves the variable unbound.
                    if let Some(value) = live {
                        relations.bind(name, value);
                    }
                    true
                }
            };
        }
    }
    let equal = live == property.value.as_deref();
    equal != property.restricted
}

/// Type name must match, then every constraint must hold. An absent live
/// value does not end the check; the first failing constraint does.
pub fn compare_properties(
    type_name: &str,
    constraints: &PatternProperties,
    live_type: &str,
    live: &Properties,
    relations: &mut RelationTable,
) -> bool {
    if type_name != live_type {
        return false;
    }
    let mut scratch = relations.clone();
    for (key, property) in constraints {
        if !satisfies(property, live.get(key), &mut scratch) {
            return false;
        }
    }
    *relations = scratch;
    true
}

pub fn compare_metadata(pattern: &PatternMetadata, live: &Metadata, relations: &mut RelationTable) -> bool {
    compare_properties(
        &pattern.type_name,
        &pattern.properties,
        &live.type_name,
        &live.properties,
        relations,
    )
}

/// Compare a pattern vertex with a live identifier and the metadata attached to it.
///
/// An extended identity is compared as the identifier its document describes.
/// Each pattern metadata entry needs some live metadata satisfying it; entries
/// may be satisfied by the same live value.
pub fn compare_vertex(
    pattern: &PatternVertex,
    live: &Identifier,
    live_metadata: &[Metadata],
    relations: &mut RelationTable,
) -> bool {
    let expanded = match expand_extended(live) {
        Ok(expanded) => expanded,
        Err(e) => {
            debug!(identifier = %live, error = %e, "cannot expand extended identifier");
            return false;
        }
    };
    let live = expanded.as_ref().unwrap_or(live);

    let mut scratch = relations.clone();
    if !compare_properties(
        &pattern.type_name,
        &pattern.properties,
        &live.type_name,
        &live.properties,
        &mut scratch,
    ) {
        return false;
    }
    for wanted in &pattern.metadata {
        let found = live_metadata
            .iter()
            .any(|candidate| compare_metadata(wanted, candidate, &mut scratch));
        if !found {
            return false;
        }
    }
    *relations = scratch;
    true
}

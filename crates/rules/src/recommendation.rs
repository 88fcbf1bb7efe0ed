//! `$variable$` substitution in rule recommendations.

use crate::relation::RelationTable;

/// Replace every whitespace-separated `$name$` token by its binding.
///
/// Only whole tokens are replaced, so `$ip$,` stays as it is. Unknown names
/// stay verbatim. Tokens are re-joined with single spaces, so
/// runs of whitespace in the template collapse.
pub fn render_recommendation(template: &str, bindings: &RelationTable) -> String {
    template
        .split_whitespace()
        .map(|token| {
            token
                .strip_prefix('$')
                .and_then(|rest| rest.strip_suffix('$'))
                .and_then(|name| bindings.get(name))
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

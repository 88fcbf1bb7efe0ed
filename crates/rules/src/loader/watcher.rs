//! Filesystem event handler for the notify watcher (hot-reload).

use std::fs;
use std::path::Path;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::schema::PatternRuleDocument;

use super::core::{is_dotfile, is_yaml};
use super::status::RuleChange;
use super::store::LoadedRules;

/// Handle a single filesystem event from the notify watcher.
pub(super) fn handle_fs_event(event: &Event, loaded: &LoadedRules, changes: &UnboundedSender<RuleChange>) {
    for path in &event.paths {
        // Skip dotfiles (including editor swap files) and non-YAML files.
        if !is_yaml(path) || is_dotfile(path) {
            continue;
        }

        match &event.kind {
            EventKind::Create(CreateKind::File)
            | EventKind::Create(CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Name(_)) => {
                if path.exists() {
                    reload(path, loaded, changes);
                } else {
                    // The old name of a rename.
                    remove(path, loaded, changes);
                }
            }
            EventKind::Remove(RemoveKind::File) | EventKind::Remove(RemoveKind::Any) => {
                remove(path, loaded, changes);
            }
            _ => {}
        }
    }
}

fn send(changes: &UnboundedSender<RuleChange>, change: RuleChange) {
    if changes.send(change).is_err() {
        warn!("rule change receiver dropped");
    }
}

fn reload(path: &Path, loaded: &LoadedRules, changes: &UnboundedSender<RuleChange>) {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read file during hot-reload");
            return;
        }
    };

    let doc = match PatternRuleDocument::from_yaml(&contents) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "failed to parse rule during hot-reload, keeping previous version"
            );
            return;
        }
    };

    if !doc.metadata.enabled {
        info!(rule_id = %doc.metadata.id, path = %path.display(), "rule disabled");
        remove(path, loaded, changes);
        return;
    }

    if let Some(owner) = loaded.owner_of(&doc.metadata.id, path) {
        warn!(
            rule_id = %doc.metadata.id,
            path = %path.display(),
            owner = %owner.display(),
            "duplicate rule id during hot-reload, ignoring file"
        );
        return;
    }

    match doc.to_rule() {
        Ok(rule) => {
            info!(rule_id = %rule.key, name = %rule.name, path = %path.display(), "hot-reloaded rule");
            if let Some(old) = loaded.insert(path, rule.clone()) {
                send(changes, RuleChange::Removed { key: old });
            }
            send(changes, RuleChange::Upserted(rule));
        }
        Err(e) => warn!(path = %path.display(), error = %e, "invalid rule during hot-reload"),
    }
}

fn remove(path: &Path, loaded: &LoadedRules, changes: &UnboundedSender<RuleChange>) {
    if let Some(key) = loaded.remove_path(path) {
        info!(rule_id = %key, path = %path.display(), "removed rule after file deletion");
        send(changes, RuleChange::Removed { key });
    }
}

//! Integration tests that verify every example YAML rule in `rules/`
//! loads and behaves like its compiled-in counterpart.

use std::path::PathBuf;

use gpm_graph::{Identifier, Metadata, MetadataGraph, Properties};
use gpm_rules::{builtin_rules, LoadStatus, PatternRule, RuleId, RuleLoader};

/// Resolve the examples directory relative to the workspace root.
/// Integration tests run from the crate directory, so we go up two levels.
fn rules_dir() -> PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../rules")
}

fn load_examples() -> RuleLoader {
    let loader = RuleLoader::new(rules_dir());
    let results = loader.load_all().expect("scan rules dir");
    for result in &results {
        assert!(
            !matches!(result.status, LoadStatus::Failed { .. }),
            "{} failed: {:?}",
            result.path.display(),
            result.status
        );
    }
    loader
}

fn rule(loader: &RuleLoader, key: &str) -> PatternRule {
    loader.get(key).unwrap_or_else(|| panic!("rule {key} not loaded"))
}

fn ident(type_name: &str, props: &[(&str, &str)]) -> Identifier {
    Identifier::new(type_name, props.iter().copied().collect())
}

fn sample_graph() -> MetadataGraph {
    let ip = |value: &str| ident("ip-address", &[("/ip-address[@type]", "IPv4"), ("/ip-address[@value]", value)]);
    let device_ip = || {
        Metadata::new(
            "device-ip",
            [("/meta:device-ip[@ifmap-cardinality]", "singleValue")].into_iter().collect(),
        )
    };

    let mut graph = MetadataGraph::new();
    graph.add_link(ident("device", &[("/device/name", "bronko")]), ip("10.0.0.1"), device_ip());
    graph.add_link(ident("device", &[("/device/name", "laptop")]), ip("10.0.0.2"), device_ip());
    graph.add_link(
        ip("10.0.0.2"),
        ident("access-request", &[("/access-request[@name]", "10.0.0.2")]),
        Metadata::new("access-request-ip", Properties::new()),
    );
    graph.add_link(
        ip("10.0.0.2"),
        ident("mac-address", &[("/mac-address[@value]", "aa:bb:cc:dd:ee:ff")]),
        Metadata::new("ip-mac", Properties::new()),
    );

    let service = ident("service", &[("/service[@name]", "webshop")]);
    let implementation = ident("implementation", &[("/implementation[@name]", "httpd")]);
    graph.add_link(service.clone(), implementation.clone(), Metadata::new("service-implementation", Properties::new()));
    graph.add_link(
        implementation,
        // Vulnerabilities arrive as extended identifiers.
        ident(
            "identity",
            &[
                ("/identity[@type]", "other"),
                ("/identity[@other-type-definition]", "extended"),
                (
                    "/identity[@name]",
                    "&lt;vulnerability xmlns=&quot;http://simu-project.de/XMLSchema/1&quot; \
                     id=&quot;CVE-2014-0160&quot;/&gt;",
                ),
            ],
        ),
        Metadata::new("implementation-vulnerability", Properties::new()),
    );
    graph.add_link(
        ident("ip-address", &[("/ip-address[@value]", "6.6.6.6")]),
        service,
        Metadata::new(
            "attack-detected",
            [("/simu:attack-detected/simu:ref-id", "CVE-2014-0160")].into_iter().collect(),
        ),
    );
    graph
}

#[test]
fn all_examples_load() {
    let loader = load_examples();
    let keys: Vec<String> = loader.rules().into_iter().map(|r| r.key).collect();
    assert_eq!(
        keys,
        vec![
            "access-request-ip",
            "attack-on-vulnerable-service",
            "device-ip",
            "foreign-device-ip",
        ]
    );
}

#[test]
fn disabled_example_is_skipped() {
    let loader = RuleLoader::new(rules_dir());
    let results = loader.load_all().unwrap();
    let skipped = results
        .iter()
        .find(|r| r.path.ends_with("unknown-mac.yml"))
        .expect("unknown-mac.yml scanned");
    assert!(matches!(&skipped.status, LoadStatus::Skipped { reason } if reason == "disabled"));
}

#[test]
fn example_ids_follow_builtin_ids() {
    let loader = load_examples();
    assert_eq!(rule(&loader, "device-ip").id, RuleId(1));
    assert_eq!(rule(&loader, "foreign-device-ip").id, RuleId(2));
    assert_eq!(rule(&loader, "access-request-ip").id, RuleId(3));
    assert_eq!(rule(&loader, "attack-on-vulnerable-service").id, RuleId(4));
}

#[test]
fn examples_match_like_builtin_rules() {
    let loader = load_examples();
    let graph = sample_graph();

    for builtin in builtin_rules() {
        let example = loader
            .rules()
            .into_iter()
            .find(|r| r.id == builtin.id)
            .expect("example for every builtin id");

        let mut from_yaml: Vec<String> = example
            .find_matches(&graph)
            .iter()
            .map(|m| example.recommendation_for(m))
            .collect();
        let mut compiled: Vec<String> = builtin
            .find_matches(&graph)
            .iter()
            .map(|m| builtin.recommendation_for(m))
            .collect();
        from_yaml.sort();
        compiled.sort();
        assert_eq!(from_yaml, compiled, "rule {}", builtin.id);
        assert_eq!(example.actions, builtin.actions, "rule {}", builtin.id);
    }
}

#[test]
fn attack_example_renders_recommendation() {
    let loader = load_examples();
    let rsa = rule(&loader, "attack-on-vulnerable-service");
    let matches = rsa.find_matches(&sample_graph());
    assert_eq!(matches.len(), 1);
    assert_eq!(
        rsa.recommendation_for(&matches[0]),
        "Check if webshop was affected by the attack using vulnerability CVE-2014-0160 \
         and examine quarantined attacker from 6.6.6.6 !"
    );
}

//! Matcher behaviour on a small device / ip / mac graph.

use std::collections::HashSet;

use gpm_graph::{Identifier, Metadata, MetadataGraph, Properties};
use gpm_rules::{PatternGraph, PatternMetadata, PatternProperty, PatternRule, PatternVertex, RuleMatch};

fn identifier(type_name: &str, props: &[(&str, &str)]) -> Identifier {
    Identifier::new(type_name, props.iter().map(|(k, v)| (*k, *v)).collect())
}

fn metadata(type_name: &str, props: &[(&str, &str)]) -> Metadata {
    let props: Properties = props.iter().map(|(k, v)| (*k, *v)).collect();
    Metadata::new(type_name, props)
}

fn ip1() -> Identifier {
    identifier("ip-address", &[("/ip-address[@type]", "IPv4"), ("/ip-address[@value]", "127.0.0.1")])
}

fn device(name: &str) -> Identifier {
    identifier("device", &[("/device/name", name)])
}

fn mac1() -> Identifier {
    identifier("mac-address", &[("/mac-address[@value]", "aa:bb:cc:dd:ee:ff")])
}

fn mac2() -> Identifier {
    identifier("mac-address", &[("/mac-address[@value]", "11:22:33:44:55:66")])
}

fn event(related: Option<&str>) -> Metadata {
    let mut props = vec![("/meta:event[@ifmap-cardinality]", "multiValue")];
    if let Some(value) = related {
        props.push(("related", value));
    }
    metadata("event", &props)
}

fn single(type_name: &str) -> Metadata {
    metadata(type_name, &[("/meta:event[@ifmap-cardinality]", "singleValue")])
}

/// device1, device2 -> ip1 -> mac1, mac2, plus loops device1-mac1 and device3-mac2.
fn live_graph() -> MetadataGraph {
    let mut g = MetadataGraph::new();
    g.add_link(device("device1"), ip1(), single("device-ip"));
    g.add_link(device("device2"), ip1(), single("device-ip"));
    g.add_link(ip1(), mac1(), single("ip-mac"));
    g.add_link(ip1(), mac2(), single("ip-mac"));
    g.add_link(device("device1"), mac1(), metadata("loop", &[]));
    g.add_link(device("device3"), mac2(), metadata("loop", &[]));
    g.add_metadata_to_identifier(device("device1"), event(Some("12345")));
    g.add_metadata_to_identifier(device("device2"), event(Some("67890")));
    g.add_metadata_to_identifier(device("device2"), event(None));
    g
}

fn chain(device_vertex: PatternVertex) -> PatternGraph {
    let mut pattern = PatternGraph::new();
    let dev = pattern.add_vertex(device_vertex);
    let ip = pattern.add_vertex(PatternVertex::new("ip-address"));
    let mac = pattern.add_vertex(PatternVertex::new("mac-address"));
    pattern.add_edge(dev, ip, PatternMetadata::new("device-ip")).unwrap();
    pattern.add_edge(ip, mac, PatternMetadata::new("ip-mac")).unwrap();
    pattern
}

fn run(pattern: PatternGraph, graph: &MetadataGraph) -> Vec<RuleMatch> {
    PatternRule::new(1, "test", "test", pattern).find_matches(graph)
}

fn has_link(m: &RuleMatch, a: &Identifier, b: &Identifier, type_name: &str) -> bool {
    m.graph()
        .links()
        .any(|l| l.connects(a, b) && l.metadata.type_name == type_name)
}

#[test]
fn simple_chain_matches_every_device_mac_combination() {
    let graph = live_graph();
    let matches = run(chain(PatternVertex::new("device")), &graph);
    assert_eq!(matches.len(), 4);

    let mut seen = Vec::new();
    for m in &matches {
        let r = m.graph();
        assert_eq!(r.identifier_count(), 3);
        assert_eq!(r.link_count(), 2);
        assert!(r.contains_identifier(&ip1()));
        assert!(!r.contains_identifier(&device("device3")));
        assert!(r.links().all(|l| l.metadata.type_name != "loop"));
        for v in r.identifiers() {
            assert!(r.metadata_of(v).is_empty(), "irrelevant metadata kept on {v}");
        }

        let dev = ["device1", "device2"]
            .into_iter()
            .find(|d| r.contains_identifier(&device(d)))
            .unwrap();
        let mac = if r.contains_identifier(&mac1()) { mac1() } else { mac2() };
        assert!(has_link(m, &device(dev), &ip1(), "device-ip"));
        assert!(has_link(m, &ip1(), &mac, "ip-mac"));
        seen.push((dev, mac));
        assert_eq!(m.publish_vertex(), &device(dev));
    }
    let distinct: HashSet<(String, String)> = seen
        .iter()
        .map(|(dev, mac)| (dev.to_string(), mac.to_string()))
        .collect();
    assert_eq!(distinct.len(), 4);
}

#[test]
fn triangle_needs_a_real_loop() {
    let graph = live_graph();
    let mut pattern = chain(PatternVertex::new("device"));
    let vertices: Vec<_> = pattern.vertices().map(|(id, _)| id).collect();
    pattern
        .add_edge(vertices[0], vertices[2], PatternMetadata::new("loop"))
        .unwrap();

    let matches = run(pattern, &graph);
    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert!(has_link(m, &device("device1"), &mac1(), "loop"));
    assert!(has_link(m, &device("device1"), &ip1(), "device-ip"));
    assert!(has_link(m, &ip1(), &mac1(), "ip-mac"));
    assert!(!m.graph().contains_identifier(&device("device2")));
    assert!(!m.graph().contains_identifier(&mac2()));
    assert_eq!(m.graph().link_count(), 3);
}

#[test]
fn restricted_property_excludes_value() {
    let graph = live_graph();
    let pattern = chain(
        PatternVertex::new("device").with_property("/device/name", PatternProperty::restricted("device1")),
    );
    let matches = run(pattern, &graph);
    assert_eq!(matches.len(), 2);
    assert!(matches
        .iter()
        .all(|m| m.graph().contains_identifier(&device("device2"))));
}

#[test]
fn restricted_absent_property_accepts_any_value() {
    let graph = live_graph();
    let pattern = chain(PatternVertex::new("device").with_property("/device/owner", PatternProperty::restricted("bob")));
    assert_eq!(run(pattern, &graph).len(), 4);
}

#[test]
fn plain_property_requires_exact_value() {
    let graph = live_graph();
    let pattern = chain(PatternVertex::new("device").with_property("/device/name", PatternProperty::literal("device2")));
    assert_eq!(run(pattern, &graph).len(), 2);

    let absent = chain(PatternVertex::new("device").with_property("/device/owner", PatternProperty::absent()));
    assert_eq!(run(absent, &graph).len(), 4);
}

#[test]
fn vertex_metadata_constraint_keeps_only_relevant_metadata() {
    let graph = live_graph();
    let pattern = chain(
        PatternVertex::new("device")
            .with_metadata(PatternMetadata::new("event").with_property("related", PatternProperty::literal("12345"))),
    );
    let matches = run(pattern, &graph);
    assert_eq!(matches.len(), 2);
    for m in &matches {
        assert_eq!(m.graph().metadata_of(&device("device1")), &[event(Some("12345"))]);
        assert!(m.graph().metadata_of(&ip1()).is_empty());
    }
}

#[test]
fn related_variables_tie_vertices_together() {
    let mut graph = MetadataGraph::new();
    let ip = identifier("ip-address", &[("/ip-address[@type]", "IPv4"), ("/ip-address[@value]", "10.0.0.1")]);
    let same = identifier("access-request", &[("/access-request[@name]", "10.0.0.1")]);
    let other = identifier("access-request", &[("/access-request[@name]", "ar-7")]);
    graph.add_link(ip.clone(), same.clone(), metadata("access-request-ip", &[]));
    graph.add_link(ip.clone(), other, metadata("access-request-ip", &[]));

    let mut pattern = PatternGraph::new();
    let p_ip = pattern.add_vertex(
        PatternVertex::new("ip-address")
            .with_property("/ip-address[@type]", PatternProperty::literal("IPv4"))
            .with_property("/ip-address[@value]", PatternProperty::related("XXX")),
    );
    let p_ar = pattern.add_vertex(
        PatternVertex::new("access-request").with_property("/access-request[@name]", PatternProperty::related("XXX")),
    );
    pattern
        .add_edge(p_ip, p_ar, PatternMetadata::new("access-request-ip"))
        .unwrap();

    let matches = run(pattern, &graph);
    assert_eq!(matches.len(), 1);
    assert!(matches[0].graph().contains_identifier(&same));
    assert_eq!(matches[0].bindings().get("XXX"), Some("10.0.0.1"));
}

#[test]
fn parallel_pattern_edges_may_share_a_live_link() {
    let graph = live_graph();
    let mut pattern = PatternGraph::new();
    let ip = pattern.add_vertex(PatternVertex::new("ip-address"));
    let a = pattern.add_vertex(PatternVertex::new("mac-address"));
    let b = pattern.add_vertex(PatternVertex::new("mac-address"));
    pattern.add_edge(ip, a, PatternMetadata::new("ip-mac")).unwrap();
    pattern.add_edge(ip, b, PatternMetadata::new("ip-mac")).unwrap();

    // Both edges on one link gives {ip, mac1} and {ip, mac2}; (mac1, mac2) and
    // (mac2, mac1) induce the same subgraph and are reported once.
    let matches = run(pattern, &graph);
    assert_eq!(matches.len(), 3);

    let mut sizes: Vec<(usize, usize)> = matches
        .iter()
        .map(|m| (m.graph().identifier_count(), m.graph().link_count()))
        .collect();
    sizes.sort();
    assert_eq!(sizes, vec![(2, 1), (2, 1), (3, 2)]);

    let both = matches.iter().find(|m| m.graph().link_count() == 2).unwrap();
    assert!(has_link(both, &ip1(), &mac1(), "ip-mac"));
    assert!(has_link(both, &ip1(), &mac2(), "ip-mac"));
}

#[test]
fn isolated_pattern_vertex_matches_any_fitting_identifier() {
    let graph = live_graph();
    let mut pattern = PatternGraph::new();
    pattern.add_vertex(PatternVertex::new("device").with_property("/device/name", PatternProperty::literal("device3")));
    let matches = run(pattern, &graph);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].graph().identifier_count(), 1);
    assert_eq!(matches[0].graph().link_count(), 0);
}

#[test]
fn disconnected_components_are_combined() {
    let graph = live_graph();
    let mut pattern = PatternGraph::new();
    let dev = pattern.add_vertex(PatternVertex::new("device").with_property("/device/name", PatternProperty::literal("device1")));
    let ip = pattern.add_vertex(PatternVertex::new("ip-address"));
    pattern.add_vertex(PatternVertex::new("mac-address"));
    pattern.add_edge(dev, ip, PatternMetadata::new("device-ip")).unwrap();

    assert_eq!(run(pattern, &graph).len(), 2);
}

#[test]
fn empty_pattern_never_matches() {
    assert!(run(PatternGraph::new(), &live_graph()).is_empty());
}

#[test]
fn matching_is_stable_across_runs() {
    let graph = live_graph();
    let first: Vec<String> = run(chain(PatternVertex::new("device")), &graph)
        .iter()
        .map(|m| m.digest().to_string())
        .collect();
    let second: Vec<String> = run(chain(PatternVertex::new("device")), &graph.clone())
        .iter()
        .map(|m| m.digest().to_string())
        .collect();
    assert_eq!(first, second);
}

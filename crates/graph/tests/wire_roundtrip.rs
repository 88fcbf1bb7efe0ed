//! Parsing captured data service output and writing it back out.

use gpm_graph::wire::documents_from_json_array;
use gpm_graph::{Identifier, Metadata, MetadataGraph, Properties};

const CAPTURED: &str = r#"[{"timestamp":1409833398907,"links":[
  {"identifiers":[{"typename":"device","properties":{"/device/name":"freeradius-pdp"}},
                  {"typename":"ip-address","properties":{"/ip-address[@type]":"IPv4","/ip-address[@value]":"192.168.0.1"}}],
   "metadata":{"typename":"device-ip","properties":{
      "/meta:device-ip[@ifmap-publisher-id]":"test-4b698afc-1732-42e2-a6df-5063467dc836",
      "/meta:device-ip[@ifmap-cardinality]":"singleValue",
      "/meta:device-ip[@ifmap-timestamp]":"2014-09-04T14:23:08+02:00",
      "/meta:device-ip[@xmlns:meta]":"http://www.trustedcomputinggroup.org/2010/IFMAP-METADATA/2"}}},
  {"identifiers":[{"typename":"mac-address","properties":{"/mac-address[@value]":"aa:bb:cc:dd:ee:ff"}},
                  {"typename":"ip-address","properties":{"/ip-address[@type]":"IPv4","/ip-address[@value]":"192.168.0.1"}}],
   "metadata":{"typename":"ip-mac","properties":{
      "/meta:ip-mac[@ifmap-cardinality]":"multiValue",
      "/meta:ip-mac[@ifmap-publisher-id]":"test-4b698afc-1732-42e2-a6df-5063467dc836",
      "/meta:ip-mac[@xmlns:meta]":"http://www.trustedcomputinggroup.org/2010/IFMAP-METADATA/2",
      "/meta:ip-mac/end-time":"2014-09-04T22:22:50+02:00",
      "/meta:ip-mac/dhcp-server":"ip-mac-cli",
      "/meta:ip-mac/start-time":"2014-09-04T14:22:50+02:00",
      "/meta:ip-mac[@ifmap-timestamp]":"2014-09-04T14:22:51+02:00"}}},
  {"identifiers":[{"typename":"device","properties":{"/device/name":"bronko"}},
                  {"typename":"ip-address","properties":{"/ip-address[@type]":"IPv4","/ip-address[@value]":"192.168.0.1"}}],
   "metadata":{"typename":"device-ip","properties":{
      "/meta:device-ip[@ifmap-publisher-id]":"test-4b698afc-1732-42e2-a6df-5063467dc836",
      "/meta:device-ip[@ifmap-cardinality]":"singleValue",
      "/meta:device-ip[@ifmap-timestamp]":"2014-09-04T14:22:33+02:00",
      "/meta:device-ip[@xmlns:meta]":"http://www.trustedcomputinggroup.org/2010/IFMAP-METADATA/2"}}}
]}]"#;

const PUBLISHER: &str = "test-4b698afc-1732-42e2-a6df-5063467dc836";
const META_NS: &str = "http://www.trustedcomputinggroup.org/2010/IFMAP-METADATA/2";

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

fn device(name: &str) -> Identifier {
    Identifier::new("device", props(&[("/device/name", name)]))
}

fn ip() -> Identifier {
    Identifier::new(
        "ip-address",
        props(&[("/ip-address[@type]", "IPv4"), ("/ip-address[@value]", "192.168.0.1")]),
    )
}

fn mac() -> Identifier {
    Identifier::new("mac-address", props(&[("/mac-address[@value]", "aa:bb:cc:dd:ee:ff")]))
}

fn device_ip(timestamp: &str) -> Metadata {
    Metadata::new(
        "device-ip",
        props(&[
            ("/meta:device-ip[@ifmap-publisher-id]", PUBLISHER),
            ("/meta:device-ip[@ifmap-timestamp]", timestamp),
            ("/meta:device-ip[@ifmap-cardinality]", "singleValue"),
            ("/meta:device-ip[@xmlns:meta]", META_NS),
        ]),
    )
}

fn ip_mac() -> Metadata {
    Metadata::new(
        "ip-mac",
        props(&[
            ("/meta:ip-mac[@ifmap-publisher-id]", PUBLISHER),
            ("/meta:ip-mac[@ifmap-timestamp]", "2014-09-04T14:22:51+02:00"),
            ("/meta:ip-mac/start-time", "2014-09-04T14:22:50+02:00"),
            ("/meta:ip-mac/end-time", "2014-09-04T22:22:50+02:00"),
            ("/meta:ip-mac/dhcp-server", "ip-mac-cli"),
            ("/meta:ip-mac[@ifmap-cardinality]", "multiValue"),
            ("/meta:ip-mac[@xmlns:meta]", META_NS),
        ]),
    )
}

fn expected() -> MetadataGraph {
    let mut g = MetadataGraph::new();
    g.set_last_updated(1409833398907);
    g.add_link(device("freeradius-pdp"), ip(), device_ip("2014-09-04T14:23:08+02:00"));
    g.add_link(ip(), mac(), ip_mac());
    g.add_link(device("bronko"), ip(), device_ip("2014-09-04T14:22:33+02:00"));
    g
}

fn parse_captured() -> MetadataGraph {
    let mut graph = MetadataGraph::new();
    for part in documents_from_json_array(CAPTURED).unwrap() {
        graph.set_last_updated(part.last_updated());
        graph.merge(&part);
    }
    graph
}

#[test]
fn captured_output_parses_into_expected_graph() {
    let graph = parse_captured();
    assert_eq!(graph, expected());
    assert_eq!(graph.last_updated(), 1409833398907);
    assert_eq!(graph.identifier_count(), 4);
    assert_eq!(graph.link_count(), 3);
}

#[test]
fn serialized_graph_parses_back_equal() {
    let graph = expected();
    let json = graph.to_json_string().unwrap();
    let reparsed = MetadataGraph::from_json_str(&json).unwrap();
    assert_eq!(reparsed, graph);
    assert_eq!(reparsed.last_updated(), graph.last_updated());
    assert_eq!(reparsed.content_digest(), graph.content_digest());
}

#[test]
fn grouped_multi_value_links_survive_round_trip() {
    let mut graph = expected();
    let mut second = ip_mac();
    second.properties.insert("/meta:ip-mac/dhcp-server", "other-server");
    let second = Metadata::new(second.type_name.clone(), second.properties.clone());
    graph.add_link(mac(), ip(), second);
    graph.add_metadata_to_identifier(device("bronko"), Metadata::new("capability", Properties::new()));
    assert_eq!(graph.link_count(), 4);

    let doc = graph.to_document();
    // Both ip-mac links share one entry.
    let grouped = doc
        .links
        .iter()
        .filter(|e| match &e.metadata {
            Some(gpm_graph::OneOrMany::Many(items)) => items.len() == 2,
            _ => false,
        })
        .count();
    assert_eq!(grouped, 1);

    let reparsed = MetadataGraph::from_document(doc).unwrap();
    assert_eq!(reparsed, graph);
}

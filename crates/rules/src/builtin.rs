//! Compiled-in example rules, used when no rule directory is configured or
//! the directory holds no rules.

use crate::pattern::{PatternGraph, PatternMetadata, PatternProperty, PatternVertex, PatternVertexId};
use crate::rule::{PatternRule, RuleId};

const IP_TYPE: &str = "/ip-address[@type]";
const IP_VALUE: &str = "/ip-address[@value]";
const DEVICE_IP_CARDINALITY: &str = "/meta:device-ip[@ifmap-cardinality]";

fn device_ip_metadata() -> PatternMetadata {
    PatternMetadata::new("device-ip").with_property(DEVICE_IP_CARDINALITY, PatternProperty::literal("singleValue"))
}

fn ipv4() -> PatternVertex {
    PatternVertex::new("ip-address").with_property(IP_TYPE, PatternProperty::literal("IPv4"))
}

/// device -- device-ip -- IPv4 address, reporting the address.
pub fn device_ip_rule() -> PatternRule {
    let mut pattern = PatternGraph::new();
    let dev = pattern.add_vertex(PatternVertex::new("device"));
    let ip = pattern.add_vertex(ipv4().with_property(IP_VALUE, PatternProperty::related("ip")));
    add_edge(&mut pattern, dev, ip, device_ip_metadata());
    set_publish(&mut pattern, ip);

    PatternRule::new(RuleId(1), "builtin-device-ip", "Rule 1", pattern)
        .with_description("Device holding an IPv4 address")
        .with_recommendation("Please check IP: $ip$")
        .with_action("log")
}

/// Same shape as [`device_ip_rule`] for every device not named `bronko`.
pub fn foreign_device_ip_rule() -> PatternRule {
    let mut pattern = PatternGraph::new();
    let dev = pattern.add_vertex(
        PatternVertex::new("device").with_property("/device/name", PatternProperty::restricted("bronko")),
    );
    let ip = pattern.add_vertex(ipv4());
    add_edge(&mut pattern, dev, ip, device_ip_metadata());
    set_publish(&mut pattern, ip);

    PatternRule::new(RuleId(2), "builtin-foreign-device-ip", "Rule 2", pattern)
        .with_description("IPv4 address held by a device other than bronko")
        .with_recommendation("do something")
        .with_action("webhook")
}

/// An access request whose name equals the value of the IPv4 address it is
/// linked to.
pub fn access_request_ip_rule() -> PatternRule {
    let mut pattern = PatternGraph::new();
    let ip = pattern.add_vertex(ipv4().with_property(IP_VALUE, PatternProperty::related("XXX")));
    let ar = pattern.add_vertex(
        PatternVertex::new("access-request").with_property("/access-request[@name]", PatternProperty::related("XXX")),
    );
    add_edge(&mut pattern, ip, ar, PatternMetadata::new("access-request-ip"));
    set_publish(&mut pattern, ip);

    PatternRule::new(RuleId(3), "builtin-access-request-ip", "Rule 3", pattern)
        .with_description("Access request named after its IP address")
        .with_recommendation("some more recommendations on AR $XXX$")
        .with_action("webhook")
}

/// An attack detected on a service whose implementation has a known
/// vulnerability. `cve1` is the vulnerability id and `cve` the id the attack
/// refers to; the two are not required to agree.
pub fn attack_on_vulnerable_service_rule() -> PatternRule {
    let mut pattern = PatternGraph::new();
    let service = pattern.add_vertex(
        PatternVertex::new("service").with_property("/service[@name]", PatternProperty::related("serviceName")),
    );
    let implementation = pattern.add_vertex(PatternVertex::new("implementation"));
    let vulnerability = pattern.add_vertex(
        PatternVertex::new("vulnerability").with_property("/vulnerability[@id]", PatternProperty::related("cve1")),
    );
    let attacker = pattern.add_vertex(
        PatternVertex::new("ip-address").with_property(IP_VALUE, PatternProperty::related("attackerIp")),
    );
    add_edge(&mut pattern, service, implementation, PatternMetadata::new("service-implementation"));
    add_edge(&mut pattern, implementation, vulnerability, PatternMetadata::new("implementation-vulnerability"));
    add_edge(
        &mut pattern,
        attacker,
        service,
        PatternMetadata::new("attack-detected")
            .with_property("/simu:attack-detected/simu:ref-id", PatternProperty::related("cve")),
    );
    set_publish(&mut pattern, attacker);

    PatternRule::new(RuleId(4), "builtin-attack-on-vulnerable-service", "Rule RSA", pattern)
        .with_description("attack-detected on vulnerable service")
        .with_recommendation(
            "Check if $serviceName$ was affected by the attack using vulnerability $cve$ \
             and examine quarantined attacker from $attackerIp$ !",
        )
        .with_action("log")
        .with_action("webhook")
}

/// All compiled-in rules, with ids 1 to 4.
pub fn builtin_rules() -> Vec<PatternRule> {
    vec![
        device_ip_rule(),
        foreign_device_ip_rule(),
        access_request_ip_rule(),
        attack_on_vulnerable_service_rule(),
    ]
}

// Both helpers only see ids minted by the same pattern, so they cannot fail.
fn add_edge(pattern: &mut PatternGraph, a: PatternVertexId, b: PatternVertexId, metadata: PatternMetadata) {
    let added = pattern.add_edge(a, b, metadata);
    debug_assert!(added.is_ok());
}

fn set_publish(pattern: &mut PatternGraph, vertex: PatternVertexId) {
    let set = pattern.set_publish_vertex(vertex);
    debug_assert!(set.is_ok());
}

#![forbid(unsafe_code)]

use sequencer_core::prelude::*;
use sequencer_engine::evaluate;
use sequencer_usage::generate_name;
use serde_json::json;

fn obj(kind: &str, name: &str, ns: Option<&str>, ready: Ready) -> ComposedResource {
    let mut meta = json!({ "name": name });
    if let Some(ns) = ns { meta["namespace"] = json!(ns); }
    ComposedResource::new(json!({ "apiVersion": "sql.example.org/v1", "kind": kind, "metadata": meta }), ready)
}

fn map(entries: Vec<(&str, ComposedResource)>) -> ComposedResources {
    entries.into_iter().map(|(k, v)| (ResourceName::from(k), v)).collect()
}

fn opts(version: UsageVersion) -> EvaluationOptions {
    EvaluationOptions { enable_deletion_sequencing: true, usage_version: version, ..EvaluationOptions::default() }
}

#[test]
fn observed_dependent_gets_usage_of_predecessor() {
    let rules = vec![SequencingRule::new(["dbinstance", "dbuser"])];
    let state = map(vec![
        ("dbinstance", obj("DBInstance", "db-1", None, Ready::True)),
        ("dbuser", obj("DBUser", "user-1", None, Ready::True)),
    ]);
    let out = evaluate(&rules, &state, &state, opts(UsageVersion::V2)).unwrap();

    assert!(out.messages.is_empty());
    assert_eq!(out.desired, state);
    assert_eq!(out.usages.len(), 1);
    let usage = &out.usages[&ResourceName::from("dbuser-dbinstance-usage")];
    assert_eq!(usage.ready, Ready::True);
    assert_eq!(usage.resource["kind"], "ClusterUsage");
    assert_eq!(usage.resource["metadata"]["name"], json!(generate_name("dbuser-user-1-dbinstance-db-1", "dependency")));
    assert_eq!(usage.resource["spec"]["by"]["resourceRef"]["name"], "user-1");
    assert_eq!(usage.resource["spec"]["of"]["resourceRef"]["name"], "db-1");
    assert_eq!(usage.resource["spec"]["replayDeletion"], false);

    let merged = out.merged();
    assert_eq!(merged.len(), 3);
}

#[test]
fn disabled_deletion_sequencing_emits_nothing() {
    let rules = vec![SequencingRule::new(["dbinstance", "dbuser"])];
    let state = map(vec![
        ("dbinstance", obj("DBInstance", "db-1", None, Ready::True)),
        ("dbuser", obj("DBUser", "user-1", None, Ready::True)),
    ]);
    let out = evaluate(&rules, &state, &state, EvaluationOptions::default()).unwrap();
    assert!(out.usages.is_empty());
}

#[test]
fn group_members_observed_are_protected_on_admission() {
    let rules = vec![SequencingRule::new(["db", "user-.*"])];
    let desired = map(vec![
        ("db", obj("DBInstance", "db-1", None, Ready::True)),
        ("user-0", obj("DBUser", "u0", None, Ready::True)),
        ("user-1", obj("DBUser", "u1", None, Ready::Unspecified)),
    ]);
    let observed = map(vec![
        ("db", obj("DBInstance", "db-1", None, Ready::True)),
        ("user-0", obj("DBUser", "u0", None, Ready::True)),
    ]);
    let mut o = opts(UsageVersion::V2);
    o.replay_deletion = true;
    let out = evaluate(&rules, &desired, &observed, o).unwrap();

    assert_eq!(out.desired, desired);
    let keys: Vec<&str> = out.usages.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["user-0-db-usage"]);
    assert_eq!(out.usages[&ResourceName::from("user-0-db-usage")].resource["spec"]["replayDeletion"], true);
}

#[test]
fn observed_usages_are_not_protected_again() {
    let rules = vec![SequencingRule::new(["db", "user.*"])];
    let desired = map(vec![("db", obj("DBInstance", "db-1", None, Ready::True))]);
    let mut observed = desired.clone();
    observed.insert(
        ResourceName::from("user-usage"),
        ComposedResource::new(json!({ "apiVersion": "protection.crossplane.io/v1beta1", "kind": "ClusterUsage", "metadata": { "name": "x" } }), Ready::True),
    );
    let out = evaluate(&rules, &desired, &observed, opts(UsageVersion::V2)).unwrap();
    assert!(out.usages.is_empty());
}

#[test]
fn observed_usage_in_sequence_does_not_depend_on_predecessor() {
    let rules = vec![SequencingRule::new(["db", "prev-usage"])];
    let state = map(vec![
        ("db", obj("DBInstance", "db-1", None, Ready::True)),
        (
            "prev-usage",
            ComposedResource::new(json!({ "apiVersion": "protection.crossplane.io/v1beta1", "kind": "ClusterUsage", "metadata": { "name": "u" } }), Ready::True),
        ),
    ]);
    let out = evaluate(&rules, &state, &state, opts(UsageVersion::V2)).unwrap();
    assert!(out.usages.is_empty());
    assert_eq!(out.desired, state);
}

#[test]
fn synthesized_usage_replaces_desired_entry_with_same_key() {
    let rules = vec![SequencingRule::new(["dbinstance", "dbuser"])];
    let observed = map(vec![
        ("dbinstance", obj("DBInstance", "db-1", None, Ready::True)),
        ("dbuser", obj("DBUser", "user-1", None, Ready::True)),
    ]);
    let mut desired = observed.clone();
    desired.insert(ResourceName::from("dbuser-dbinstance-usage"), obj("Stale", "old", None, Ready::False));
    let out = evaluate(&rules, &desired, &observed, opts(UsageVersion::V2)).unwrap();

    assert_eq!(out.desired, desired);
    let merged = out.merged();
    assert_eq!(merged.len(), 3);
    let usage = &merged[&ResourceName::from("dbuser-dbinstance-usage")];
    assert_eq!(usage.resource["kind"], "ClusterUsage");
    assert_eq!(usage.ready, Ready::True);
}

#[test]
fn predecessor_missing_from_observed_is_skipped() {
    let rules = vec![SequencingRule::new(["db", "user-.*"])];
    let desired = map(vec![
        ("db", obj("DBInstance", "db-1", None, Ready::True)),
        ("user-0", obj("DBUser", "u0", None, Ready::True)),
    ]);
    let observed = map(vec![("user-0", obj("DBUser", "u0", None, Ready::True))]);
    let out = evaluate(&rules, &desired, &observed, opts(UsageVersion::V2)).unwrap();
    assert!(out.usages.is_empty());
    assert_eq!(out.desired, desired);
}

#[test]
fn namespaced_dependency_uses_namespaced_usage() {
    let rules = vec![SequencingRule::new(["cfg", "app"])];
    let state = map(vec![
        ("cfg", obj("Config", "cfg", Some("team-a"), Ready::True)),
        ("app", obj("App", "app", Some("team-a"), Ready::True)),
    ]);
    let out = evaluate(&rules, &state, &state, opts(UsageVersion::V2)).unwrap();
    let usage = &out.usages[&ResourceName::from("app-cfg-usage")];
    assert_eq!(usage.resource["kind"], "Usage");
    assert_eq!(usage.resource["metadata"]["namespace"], "team-a");
}

#[test]
fn namespaced_dependency_with_v1_is_fatal() {
    let rules = vec![SequencingRule::new(["cfg", "app"])];
    let state = map(vec![
        ("cfg", obj("Config", "cfg", Some("team-a"), Ready::True)),
        ("app", obj("App", "app", Some("team-a"), Ready::True)),
    ]);
    let err = evaluate(&rules, &state, &state, opts(UsageVersion::V1)).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("kind: Config, name: cfg, namespace: team-a"), "msg={}", msg);
}

#[test]
fn v1_cluster_scoped_usage() {
    let rules = vec![SequencingRule::new(["dbinstance", "dbuser"])];
    let state = map(vec![
        ("dbinstance", obj("DBInstance", "db-1", None, Ready::True)),
        ("dbuser", obj("DBUser", "user-1", None, Ready::True)),
    ]);
    let out = evaluate(&rules, &state, &state, opts(UsageVersion::V1)).unwrap();
    let usage = &out.usages[&ResourceName::from("dbuser-dbinstance-usage")];
    assert_eq!(usage.resource["apiVersion"], "apiextensions.crossplane.io/v1beta1");
    assert_eq!(usage.resource["kind"], "Usage");
}

#[test]
fn repeated_runs_converge() {
    let rules = vec![SequencingRule::new(["first", "second", "third"])];
    let desired = map(vec![
        ("first", obj("MR", "a", None, Ready::True)),
        ("second", obj("MR", "b", None, Ready::False)),
        ("third", obj("MR", "c", None, Ready::False)),
    ]);
    let observed = map(vec![("first", obj("MR", "a", None, Ready::True))]);
    let o = opts(UsageVersion::V2);
    let once = evaluate(&rules, &desired, &observed, o).unwrap();
    let twice = evaluate(&rules, &once.merged(), &observed, o).unwrap();
    assert_eq!(once, twice);
    let keys: Vec<&str> = twice.desired.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["first", "second"]);
}

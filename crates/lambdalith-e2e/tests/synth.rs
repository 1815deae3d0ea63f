#![allow(clippy::expect_used)]

use std::path::Path;

use lambdalith_e2e::harness::{RunResult, credential_env, run_synth, write_file, write_project};
use serde_json::Value;
use tempfile::TempDir;

fn project() -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    write_project(temp.path(), "FROM node:20 AS back\n", "FROM node:20 AS front\n")
        .expect("write project");
    temp
}

fn run(root: &Path, flags: &[&str], env: &[(String, String)]) -> RunResult {
    let output = run_synth(root, flags, env).expect("run lambdalith synth");
    println!("{}", output.transcript());
    output
}

fn json_plan(root: &Path) -> Value {
    let output = run(
        root,
        &["--format", "json"],
        &credential_env("ops@example.com", "key-123"),
    );
    assert_eq!(output.exit_code, 0);
    serde_json::from_str(&output.stdout).expect("plan json")
}

fn names(plan: &Value) -> Vec<String> {
    plan["nodes"]
        .as_array()
        .expect("nodes")
        .iter()
        .map(|node| node["name"].as_str().expect("name").to_string())
        .collect()
}

fn trigger_of(plan: &Value, name: &str) -> String {
    plan["nodes"]
        .as_array()
        .expect("nodes")
        .iter()
        .find(|node| node["name"] == name)
        .and_then(|node| node["trigger"].as_str())
        .expect("trigger")
        .to_string()
}

#[test]
fn missing_credentials_exit_one_without_a_plan() {
    let temp = project();
    let output = run(temp.path(), &["--format", "json"], &[]);

    assert_eq!(output.exit_code, 1);
    assert!(output.stdout.is_empty());
    assert!(output.stderr.contains("UPSTASH_EMAIL"));
    assert!(output.stderr.contains("UPSTASH_API_KEY"));
}

#[test]
fn blank_api_key_counts_as_missing() {
    let temp = project();
    let output = run(
        temp.path(),
        &[],
        &credential_env("ops@example.com", "   "),
    );

    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("UPSTASH_API_KEY"));
    assert!(!output.stderr.contains("UPSTASH_EMAIL"));
}

#[test]
fn json_plan_orders_every_dependency_first() {
    let temp = project();
    let plan = json_plan(temp.path());

    let order = names(&plan);
    assert_eq!(order.len(), 14);
    for node in plan["nodes"].as_array().expect("nodes") {
        let position = node["position"].as_u64().expect("position");
        for dependency in node["depends_on"].as_array().expect("depends_on") {
            let dependency = dependency.as_str().expect("dependency name");
            let dependency_position = order
                .iter()
                .position(|name| name == dependency)
                .expect("dependency in plan");
            assert!((dependency_position as u64) < position);
        }
    }
    assert_eq!(order.first().map(String::as_str), Some("RedisDatabase"));
    assert_eq!(order.last().map(String::as_str), Some("FrontLambdaUrl"));
}

#[test]
fn json_plan_redacts_the_api_key() {
    let temp = project();
    let output = run(
        temp.path(),
        &["--format", "json"],
        &credential_env("ops@example.com", "key-123"),
    );

    assert_eq!(output.exit_code, 0);
    assert!(!output.stdout.contains("key-123"));
    assert!(output.stdout.contains("[REDACTED]"));
}

#[test]
fn json_plan_redacts_keys_that_need_escaping() {
    let temp = project();
    let output = run(
        temp.path(),
        &["--format", "json"],
        &credential_env("ops@example.com", r#"k"y"#),
    );

    assert_eq!(output.exit_code, 0);
    assert!(!output.stdout.contains(r#"k\"y"#));
    assert!(output.stdout.contains("[REDACTED]"));
}

#[test]
fn changing_a_dockerfile_only_changes_its_trigger() {
    let temp = project();
    let before = json_plan(temp.path());

    write_file(
        &temp.path().join("functions/back/Dockerfile"),
        "FROM node:22 AS back\n",
    )
    .expect("rewrite back Dockerfile");
    let after = json_plan(temp.path());

    assert_ne!(trigger_of(&before, "BackImage"), trigger_of(&after, "BackImage"));
    assert_eq!(trigger_of(&after, "BackImage"), trigger_of(&after, "BackEcrImage"));
    assert_eq!(trigger_of(&before, "FrontImage"), trigger_of(&after, "FrontImage"));
}

#[test]
fn unchanged_project_synthesizes_identical_output() {
    let temp = project();
    let env = credential_env("ops@example.com", "key-123");
    let first = run(temp.path(), &["--format", "json"], &env);
    let second = run(temp.path(), &["--format", "json"], &env);

    assert_eq!(first.exit_code, 0);
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn missing_dockerfile_names_the_path() {
    let temp = TempDir::new().expect("tempdir");
    write_file(
        &temp.path().join("functions/back/Dockerfile"),
        "FROM node:20\n",
    )
    .expect("write back Dockerfile");

    let output = run(
        temp.path(),
        &[],
        &credential_env("ops@example.com", "key-123"),
    );
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("functions/front/Dockerfile"));
}

#[test]
fn text_plan_lists_the_topology() {
    let temp = project();
    let output = run(
        temp.path(),
        &["--color", "never"],
        &credential_env("ops@example.com", "key-123"),
    );

    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.starts_with("synth lambdalith-dev"));
    assert!(output.stdout.contains("BackLambdaUrl"));
    assert!(output.stdout.contains("Plan: 14 to provision, 3 providers, 4 content triggers"));
}

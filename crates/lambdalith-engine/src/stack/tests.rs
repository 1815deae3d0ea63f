#![allow(clippy::expect_used)]

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use lambdalith_domain::{
    AttributeName, Config, ConfigValue, ContentDigest, NodeState, ProviderKind, ResourceKind,
};
use tempfile::TempDir;

use super::Stack;
use crate::error::{DeclarationError, TriggerError};
use crate::resolve::{OutputResolver, resolve};

fn stack_with(providers: &[ProviderKind]) -> Stack {
    let mut stack = Stack::new("test", "/srv/app");
    for provider in providers {
        stack
            .configure_provider(*provider, Config::new())
            .expect("provider");
    }
    stack
}

fn digest(fill: char) -> ContentDigest {
    ContentDigest::new(fill.to_string().repeat(64)).expect("digest")
}

fn role_config() -> Config {
    Config::new()
        .with("name", "lambda-role")
        .with("assume_role_policy", "{}")
}

#[test]
fn declare_records_deduplicated_dependencies() {
    let mut stack = stack_with(&[ProviderKind::Upstash, ProviderKind::Aws]);
    let db = stack
        .declare(
            ResourceKind::CacheDatabase,
            "Db",
            Config::new()
                .with("database_name", "redis-database")
                .with("region", "eu-central-1"),
        )
        .expect("db");
    let role = stack
        .declare(ResourceKind::AccessRole, "Role", role_config())
        .expect("role");
    stack
        .declare(
            ResourceKind::ComputeFunction,
            "Fn",
            Config::new()
                .with("function_name", "fn")
                .with("role", role.output("arn"))
                .with("package_type", "Image")
                .with(
                    "environment",
                    Config::new()
                        .with("A", db.output("endpoint"))
                        .with("B", db.output("port")),
                ),
        )
        .expect("function");

    let function = stack.node("Fn").expect("node");
    assert_eq!(function.dependencies(), &[0, 1]);
    assert_eq!(function.state(), NodeState::Declared);
}

#[test]
fn duplicate_identity_is_rejected() {
    let mut stack = stack_with(&[ProviderKind::Aws]);
    stack
        .declare(ResourceKind::AccessRole, "Role", role_config())
        .expect("first");

    let error = stack
        .declare(ResourceKind::AccessRole, "Role", role_config())
        .expect_err("must fail");
    assert!(matches!(error, DeclarationError::DuplicateIdentity { .. }));
    assert_eq!(stack.len(), 1);
}

#[test]
fn missing_provider_is_rejected() {
    let mut stack = stack_with(&[ProviderKind::Aws]);
    let error = stack
        .declare(
            ResourceKind::CacheDatabase,
            "Db",
            Config::new()
                .with("database_name", "db")
                .with("region", "eu-central-1"),
        )
        .expect_err("must fail");
    let DeclarationError::MissingProvider { provider, .. } = error else {
        unreachable!("expected MissingProvider");
    };
    assert_eq!(provider, ProviderKind::Upstash);
    assert!(stack.is_empty());
}

#[test]
fn reference_to_unknown_node_is_dangling() {
    let mut stack = stack_with(&[ProviderKind::Aws]);
    let ghost = stack.reference("Ghost", "arn").expect("reference");

    let error = stack
        .declare(
            ResourceKind::RolePolicyBinding,
            "Binding",
            Config::new()
                .with("role", ghost)
                .with("policy_arn", "arn:policy"),
        )
        .expect_err("must fail");
    assert!(matches!(error, DeclarationError::DanglingReference { .. }));
    assert!(error.to_string().contains("${Ghost.arn}"));
    assert!(stack.node("Binding").is_none());
}

#[test]
fn reference_from_another_stack_is_dangling() {
    let mut first = stack_with(&[ProviderKind::Aws]);
    let role = first
        .declare(ResourceKind::AccessRole, "Role", role_config())
        .expect("role");

    let mut second = stack_with(&[ProviderKind::Aws]);
    second
        .declare(ResourceKind::AccessRole, "Role", role_config())
        .expect("same name in another stack");
    let error = second
        .declare(
            ResourceKind::RolePolicyBinding,
            "Binding",
            Config::new()
                .with("role", role.output("name"))
                .with("policy_arn", "arn:policy"),
        )
        .expect_err("must fail");
    assert!(matches!(error, DeclarationError::DanglingReference { .. }));
}

#[test]
fn unknown_and_missing_options_are_rejected() {
    let mut stack = stack_with(&[ProviderKind::Aws]);

    let unknown = stack
        .declare(
            ResourceKind::AccessRole,
            "Role",
            role_config().with("image_uri", "nope"),
        )
        .expect_err("unknown option");
    assert!(unknown.to_string().contains("image_uri"));

    let missing = stack
        .declare(
            ResourceKind::AccessRole,
            "Role",
            Config::new().with("name", "role"),
        )
        .expect_err("missing option");
    assert!(missing.to_string().contains("assume_role_policy"));
}

#[test]
fn invalid_node_name_is_rejected() {
    let mut stack = stack_with(&[ProviderKind::Aws]);
    let error = stack
        .declare(ResourceKind::AccessRole, "lambda role", role_config())
        .expect_err("must fail");
    assert!(matches!(error, DeclarationError::InvalidName(_)));
}

#[test]
fn configure_is_accepted_once() {
    let mut stack = stack_with(&[ProviderKind::Aws]);
    let role = stack
        .forward(ResourceKind::AccessRole, "Role")
        .expect("forward");
    assert!(!stack.node("Role").expect("node").is_configured());

    stack.configure(&role, role_config()).expect("configure");
    let error = stack
        .configure(&role, role_config())
        .expect_err("second configure");
    assert!(matches!(error, DeclarationError::AlreadyConfigured { .. }));
}

#[test]
fn handle_from_another_stack_cannot_be_configured() {
    let mut first = stack_with(&[ProviderKind::Aws]);
    let role = first
        .forward(ResourceKind::AccessRole, "Role")
        .expect("forward");

    let mut second = stack_with(&[ProviderKind::Aws]);
    let error = second
        .configure(&role, role_config())
        .expect_err("foreign handle");
    assert!(matches!(error, DeclarationError::UnknownNode { .. }));
}

#[test]
fn publish_trigger_must_match_its_build() {
    let mut stack = stack_with(&[ProviderKind::Docker]);
    let image = stack
        .declare(
            ResourceKind::ImageBuild,
            "Image",
            Config::new()
                .with("name", "repo")
                .with("build", Config::new().with("context", "functions/back"))
                .with("triggers", Config::new().with("filesha256", digest('a'))),
        )
        .expect("image");

    let error = stack
        .declare(
            ResourceKind::RegistryPublish,
            "Publish",
            Config::new()
                .with("name", image.output("name"))
                .with("triggers", Config::new().with("filesha256", digest('b'))),
        )
        .expect_err("mismatch");
    assert!(matches!(error, DeclarationError::InvalidConfiguration { .. }));

    stack
        .declare(
            ResourceKind::RegistryPublish,
            "Publish",
            Config::new()
                .with("name", image.output("name"))
                .with("triggers", Config::new().with("filesha256", digest('a'))),
        )
        .expect("matching trigger");
    assert_eq!(stack.node("Publish").expect("publish").trigger(), Some(&digest('a')));
}

#[test]
fn forward_build_must_match_publishes_declared_before_it() {
    let mut stack = stack_with(&[ProviderKind::Docker]);
    let image = stack.forward(ResourceKind::ImageBuild, "Image").expect("forward");
    stack
        .declare(
            ResourceKind::RegistryPublish,
            "Publish",
            Config::new()
                .with("name", image.output("name"))
                .with("triggers", Config::new().with("filesha256", digest('b'))),
        )
        .expect("publish waits for its build");

    let build_config = |fill: char| {
        Config::new()
            .with("name", "repo")
            .with("build", Config::new().with("context", "functions/back"))
            .with("triggers", Config::new().with("filesha256", digest(fill)))
    };
    let error = stack
        .configure(&image, build_config('a'))
        .expect_err("stale build");
    assert!(matches!(error, DeclarationError::InvalidConfiguration { .. }));
    assert!(error.to_string().contains("Publish"));
    assert!(!stack.node("Image").expect("image").is_configured());

    stack
        .configure(&image, build_config('b'))
        .expect("matching trigger");
    assert_eq!(stack.node("Image").expect("image").trigger(), Some(&digest('b')));
}

#[test]
fn duplicate_and_dangling_providers_are_rejected() {
    let mut stack = stack_with(&[ProviderKind::Aws]);
    let error = stack
        .configure_provider(ProviderKind::Aws, Config::new())
        .expect_err("duplicate");
    assert!(matches!(error, DeclarationError::DuplicateProvider { .. }));

    let ghost = stack.reference("Token", "password").expect("reference");
    let error = stack
        .configure_provider(ProviderKind::Docker, Config::new().with("password", ghost))
        .expect_err("dangling");
    assert!(matches!(
        error,
        DeclarationError::DanglingProviderReference { .. }
    ));
    assert!(!stack.providers().is_configured(ProviderKind::Docker));
}

#[test]
fn sensitive_provider_values_are_remembered() {
    let mut stack = Stack::new("test", "/srv/app");
    stack
        .configure_provider(
            ProviderKind::Upstash,
            Config::new()
                .with("email", "ops@example.com")
                .with("api_key", ConfigValue::sensitive("key-123")),
        )
        .expect("provider");
    assert!(stack.sensitive_values().contains("key-123"));
}

#[test]
fn read_never_fails_and_resolves_after_outputs_attach() {
    let mut stack = stack_with(&[ProviderKind::Aws]);
    let role = stack
        .declare(ResourceKind::AccessRole, "Role", role_config())
        .expect("role");

    let reference = stack.read(&role, "arn");
    assert_eq!(reference.to_string(), "${Role.arn}");
    assert!(resolve(&reference, &stack).is_err());

    let mut outputs = BTreeMap::new();
    outputs.insert(AttributeName::from("arn"), "arn:aws:iam::1:role/lambda".to_string());
    stack.attach_outputs("Role", outputs.clone()).expect("attach");
    assert_eq!(
        resolve(&reference, &stack).expect("resolved"),
        "arn:aws:iam::1:role/lambda"
    );
    assert_eq!(
        stack.lookup(reference.node(), reference.attribute()),
        Some("arn:aws:iam::1:role/lambda")
    );
    assert_eq!(stack.node("Role").expect("node").state(), NodeState::Provisioned);

    let error = stack.attach_outputs("Role", outputs).expect_err("second attach");
    assert!(matches!(
        error,
        DeclarationError::OutputsAlreadyAttached { .. }
    ));
}

#[test]
fn outputs_must_be_exposed_by_the_kind() {
    let mut stack = stack_with(&[ProviderKind::Aws]);
    stack
        .declare(ResourceKind::AccessRole, "Role", role_config())
        .expect("role");

    let mut outputs = BTreeMap::new();
    outputs.insert(AttributeName::from("arn"), "arn:aws:iam::1:role/lambda".to_string());
    outputs.insert(AttributeName::from("function_url"), "https://x".to_string());
    let error = stack.attach_outputs("Role", outputs).expect_err("unexposed");

    let DeclarationError::UnexposedOutput { attribute, .. } = error else {
        unreachable!("expected an unexposed output");
    };
    assert_eq!(attribute.as_str(), "function_url");
    assert_eq!(stack.node("Role").expect("node").state(), NodeState::Declared);
}

#[test]
fn content_triggers_resolve_against_project_root() {
    let temp = TempDir::new().expect("tempdir");
    let dir = temp.path().join("functions/back");
    fs::create_dir_all(&dir).expect("mkdir");
    fs::write(dir.join("Dockerfile"), "FROM scratch\n").expect("write");

    let stack = Stack::new("test", temp.path());
    let single = stack
        .content_trigger("functions/back/Dockerfile")
        .expect("trigger");
    let many = stack
        .content_triggers(&[PathBuf::from("functions/back/Dockerfile")])
        .expect("triggers");
    assert_eq!(many, vec![single]);

    let error = stack
        .content_trigger("functions/front/Dockerfile")
        .expect_err("missing");
    let TriggerError::ContentUnavailable { path, .. } = error else {
        unreachable!("expected an unreadable file");
    };
    assert_eq!(path, temp.path().join("functions/front/Dockerfile"));
}

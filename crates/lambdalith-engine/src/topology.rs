use lambdalith_domain::{
    Config, ConfigValue, ContentDigest, ProviderKind, ResourceKind, TemplatePart,
};
use serde_json::json;

use crate::credentials::Credentials;
use crate::error::{DeclarationError, SynthesisError};
use crate::settings::StackSettings;
use crate::stack::{NodeHandle, Stack};

const BASIC_EXECUTION_POLICY: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// Declare the lambdalith deployment: a Redis cache, two container images
/// published to ECR, and a back and front Lambda, each with a public URL.
///
/// # Errors
///
/// Returns an error when a Dockerfile cannot be read or a declaration is
/// rejected.
pub fn build_lambdalith_stack(
    settings: &StackSettings,
    credentials: &Credentials,
) -> std::result::Result<Stack, SynthesisError> {
    let mut stack = Stack::new(settings.stack_name.clone(), settings.project_root.clone());

    stack.configure_provider(
        ProviderKind::Upstash,
        Config::new()
            .with("email", credentials.upstash_email.as_str())
            .with(
                "api_key",
                ConfigValue::sensitive(credentials.upstash_api_key.as_str()),
            ),
    )?;
    let database = stack.declare(
        ResourceKind::CacheDatabase,
        "RedisDatabase",
        Config::new()
            .with("database_name", settings.database_name.as_str())
            .with("region", settings.region.as_str()),
    )?;

    stack.configure_provider(
        ProviderKind::Aws,
        Config::new().with("region", settings.region.as_str()),
    )?;
    let token = stack.declare(ResourceKind::RegistryAuthorization, "EcrToken", Config::new())?;

    stack.configure_provider(
        ProviderKind::Docker,
        Config::new().with(
            "registry_auth",
            vec![
                Config::new()
                    .with("address", token.output("proxy_endpoint"))
                    .with("username", token.output("user_name"))
                    .with("password", token.output("password")),
            ],
        ),
    )?;

    let back_repo = declare_repository(&mut stack, "BackRepo", "back-repo")?;
    let front_repo = declare_repository(&mut stack, "FrontRepo", "front-repo")?;

    let (back_trigger, front_trigger) = rayon::join(
        || stack.content_trigger(StackSettings::dockerfile("back")),
        || stack.content_trigger(StackSettings::dockerfile("front")),
    );
    let (back_trigger, front_trigger) = (back_trigger?, front_trigger?);

    let back_image = declare_image(
        &mut stack,
        settings,
        ("BackImage", "back"),
        &back_repo,
        &back_trigger,
    )?;
    let front_image = declare_image(
        &mut stack,
        settings,
        ("FrontImage", "front"),
        &front_repo,
        &front_trigger,
    )?;

    let back_publish = declare_publish(&mut stack, "BackEcrImage", &back_image, &back_trigger)?;
    let front_publish = declare_publish(&mut stack, "FrontEcrImage", &front_image, &front_trigger)?;

    let assume_role_policy = json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": { "Service": "lambda.amazonaws.com" },
                "Action": "sts:AssumeRole",
            }
        ],
    });
    let role = stack.declare(
        ResourceKind::AccessRole,
        "LambdaRole",
        Config::new()
            .with("name", "lambda-role")
            .with("assume_role_policy", assume_role_policy.to_string()),
    )?;
    stack.declare(
        ResourceKind::RolePolicyBinding,
        "LambdaRolePolicyAttachment",
        Config::new()
            .with("role", role.output("name"))
            .with("policy_arn", BASIC_EXECUTION_POLICY),
    )?;

    let redis_server = ConfigValue::template([
        TemplatePart::from("redis://default:"),
        TemplatePart::from(database.output("password")),
        TemplatePart::from("@"),
        TemplatePart::from(database.output("endpoint")),
        TemplatePart::from(":"),
        TemplatePart::from(database.output("port")),
    ]);
    let back_lambda = declare_function(
        &mut stack,
        settings,
        ("BackLambda", "back-lambda"),
        &role,
        &back_publish,
        Config::new()
            .with("HOME", "/tmp")
            .with("REDIS_SERVER", redis_server),
    )?;
    let back_url = declare_url(&mut stack, "BackLambdaUrl", &back_lambda)?;

    let front_lambda = declare_function(
        &mut stack,
        settings,
        ("FrontLambda", "front-lambda"),
        &role,
        &front_publish,
        Config::new()
            .with("HOME", "/tmp")
            .with("BACKEND_API_URL", back_url.output("function_url"))
            .with("CLIENT_API_URL", back_url.output("function_url")),
    )?;
    declare_url(&mut stack, "FrontLambdaUrl", &front_lambda)?;

    Ok(stack)
}

fn declare_repository(
    stack: &mut Stack,
    node: &str,
    repository: &str,
) -> std::result::Result<NodeHandle, DeclarationError> {
    stack.declare(
        ResourceKind::ContainerRepository,
        node,
        Config::new().with("name", repository),
    )
}

fn declare_image(
    stack: &mut Stack,
    settings: &StackSettings,
    (node, function): (&str, &str),
    repository: &NodeHandle,
    trigger: &ContentDigest,
) -> std::result::Result<NodeHandle, DeclarationError> {
    let context = settings.build_context(function);
    stack.declare(
        ResourceKind::ImageBuild,
        node,
        Config::new()
            .with("name", repository.output("repository_url"))
            .with(
                "build",
                Config::new()
                    .with("context", context.to_string_lossy().into_owned())
                    .with("platform", settings.platform.as_str()),
            )
            .with("triggers", filesha256(trigger)),
    )
}

fn declare_publish(
    stack: &mut Stack,
    node: &str,
    image: &NodeHandle,
    trigger: &ContentDigest,
) -> std::result::Result<NodeHandle, DeclarationError> {
    stack.declare(
        ResourceKind::RegistryPublish,
        node,
        Config::new()
            .with("name", image.output("name"))
            .with("triggers", filesha256(trigger)),
    )
}

fn declare_function(
    stack: &mut Stack,
    settings: &StackSettings,
    (node, function_name): (&str, &str),
    role: &NodeHandle,
    image: &NodeHandle,
    variables: Config,
) -> std::result::Result<NodeHandle, DeclarationError> {
    stack.declare(
        ResourceKind::ComputeFunction,
        node,
        Config::new()
            .with("function_name", function_name)
            .with("role", role.output("arn"))
            .with("package_type", "Image")
            .with(
                "image_uri",
                ConfigValue::template([
                    TemplatePart::from(image.output("name")),
                    TemplatePart::from("@"),
                    TemplatePart::from(image.output("sha256_digest")),
                ]),
            )
            .with("architectures", vec![settings.architecture.as_str()])
            .with("memory_size", settings.memory_size)
            .with("timeout", settings.timeout)
            .with("logging_config", Config::new().with("log_format", "JSON"))
            .with("environment", Config::new().with("variables", variables)),
    )
}

fn declare_url(
    stack: &mut Stack,
    node: &str,
    function: &NodeHandle,
) -> std::result::Result<NodeHandle, DeclarationError> {
    stack.declare(
        ResourceKind::PublicInvokeEndpoint,
        node,
        Config::new()
            .with("function_name", function.output("function_name"))
            .with("authorization_type", "NONE"),
    )
}

fn filesha256(trigger: &ContentDigest) -> Config {
    Config::new().with("filesha256", trigger.clone())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use std::fs;
    use std::path::Path;

    use lambdalith_domain::ResourceKind;
    use tempfile::TempDir;

    use super::build_lambdalith_stack;
    use crate::credentials::Credentials;
    use crate::error::{SynthesisError, TriggerError};
    use crate::settings::StackSettings;

    fn write_functions(root: &Path) {
        for function in ["back", "front"] {
            let dir = root.join("functions").join(function);
            fs::create_dir_all(&dir).expect("mkdir");
            fs::write(dir.join("Dockerfile"), format!("FROM node:20 AS {function}\n"))
                .expect("write Dockerfile");
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            upstash_email: "ops@example.com".to_string(),
            upstash_api_key: "key-123".to_string(),
        }
    }

    fn settings(root: &Path) -> StackSettings {
        StackSettings {
            project_root: root.to_path_buf(),
            ..StackSettings::default()
        }
    }

    #[test]
    fn declares_every_node_in_source_order() {
        let temp = TempDir::new().expect("tempdir");
        write_functions(temp.path());

        let stack = build_lambdalith_stack(&settings(temp.path()), &credentials()).expect("stack");
        let names: Vec<&str> = stack.nodes().iter().map(|node| node.name().as_str()).collect();
        assert_eq!(
            names,
            vec![
                "RedisDatabase",
                "EcrToken",
                "BackRepo",
                "FrontRepo",
                "BackImage",
                "FrontImage",
                "BackEcrImage",
                "FrontEcrImage",
                "LambdaRole",
                "LambdaRolePolicyAttachment",
                "BackLambda",
                "BackLambdaUrl",
                "FrontLambda",
                "FrontLambdaUrl",
            ]
        );
        assert_eq!(stack.providers().len(), 3);
    }

    #[test]
    fn image_and_publish_share_the_dockerfile_trigger() {
        let temp = TempDir::new().expect("tempdir");
        write_functions(temp.path());

        let stack = build_lambdalith_stack(&settings(temp.path()), &credentials()).expect("stack");
        let image = stack.node("BackImage").expect("image");
        let publish = stack.node("BackEcrImage").expect("publish");
        assert_eq!(image.kind(), ResourceKind::ImageBuild);
        assert!(image.trigger().is_some());
        assert_eq!(image.trigger(), publish.trigger());
        assert_ne!(
            stack.node("FrontImage").expect("front image").trigger(),
            image.trigger()
        );
    }

    #[test]
    fn api_key_is_recorded_as_sensitive() {
        let temp = TempDir::new().expect("tempdir");
        write_functions(temp.path());

        let stack = build_lambdalith_stack(&settings(temp.path()), &credentials()).expect("stack");
        assert!(stack.sensitive_values().contains("key-123"));
        assert!(!stack.sensitive_values().contains("ops@example.com"));
    }

    #[test]
    fn missing_dockerfile_names_the_path() {
        let temp = TempDir::new().expect("tempdir");
        write_functions(temp.path());
        fs::remove_file(temp.path().join("functions/front/Dockerfile")).expect("remove");

        let error =
            build_lambdalith_stack(&settings(temp.path()), &credentials()).expect_err("must fail");
        let SynthesisError::Trigger(TriggerError::ContentUnavailable { path, .. }) = error else {
            unreachable!("expected ContentUnavailable");
        };
        assert!(path.ends_with("functions/front/Dockerfile"));
    }
}

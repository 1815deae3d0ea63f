use std::collections::BTreeSet;

use lambdalith_domain::OrderedPlan;

use crate::{Credentials, StackSettings, SynthesisError, build_lambdalith_stack, synthesize};

/// Declare and synthesize the lambdalith deployment.
///
/// Returns the ordered plan and the literal secrets it carries so renderers
/// can redact them.
///
/// # Errors
///
/// Returns an error when a declaration is rejected, a Dockerfile is missing,
/// or the dependency graph cannot be ordered.
pub fn synthesize_lambdalith(
    settings: &StackSettings,
    credentials: &Credentials,
) -> std::result::Result<(OrderedPlan, BTreeSet<String>), SynthesisError> {
    let stack = build_lambdalith_stack(settings, credentials)?;
    let plan = synthesize(&stack)?;
    Ok((plan, stack.sensitive_values().clone()))
}

/// Same as [`synthesize_lambdalith`], reading credentials from the process
/// environment first. Nothing is declared when a credential is missing.
///
/// # Errors
///
/// Returns `MissingCredential` before any other check, then the errors of
/// [`synthesize_lambdalith`].
pub fn synthesize_from_env(
    settings: &StackSettings,
) -> std::result::Result<(OrderedPlan, BTreeSet<String>), SynthesisError> {
    let credentials = Credentials::from_env()?;
    synthesize_lambdalith(settings, &credentials)
}

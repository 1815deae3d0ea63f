use std::collections::BTreeSet;

use lambdalith_domain::{Config, ConfigValue, OrderedPlan};

pub const REDACTED: &str = "[REDACTED]";

/// Copy of `plan` with every sensitive configuration value masked, in
/// provider and node configuration alike.
#[must_use]
pub fn redact_plan(plan: &OrderedPlan) -> OrderedPlan {
    let mut redacted = plan.clone();
    for provider in &mut redacted.providers {
        provider.config = redact_config(&provider.config);
    }
    for record in &mut redacted.nodes {
        record.config = redact_config(&record.config);
    }
    redacted
}

fn redact_config(config: &Config) -> Config {
    config
        .iter()
        .fold(Config::new(), |redacted, (key, value)| {
            redacted.with(key, redact_value(value))
        })
}

fn redact_value(value: &ConfigValue) -> ConfigValue {
    match value {
        ConfigValue::Sensitive(_) => ConfigValue::sensitive(REDACTED),
        ConfigValue::List(items) => ConfigValue::List(items.iter().map(redact_value).collect()),
        ConfigValue::Map(entries) => ConfigValue::Map(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), redact_value(item)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Replace every sensitive value in `text`, longest first so that a secret
/// containing another one is hidden as a whole.
///
/// Values shorter than three characters are left alone; structured output is
/// masked by [`redact_plan`] instead.
pub fn redact_sensitive(text: &str, sensitive_values: &BTreeSet<String>) -> String {
    let mut sorted: Vec<&str> = sensitive_values
        .iter()
        .filter(|v| v.len() >= 3)
        .map(String::as_str)
        .collect();
    sorted.sort_by_key(|value| std::cmp::Reverse(value.len()));

    let mut result = text.to_string();
    for value in sorted {
        result = result.replace(value, REDACTED);
    }
    result
}

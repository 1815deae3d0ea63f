use std::fmt::Write;
use std::io::{self, IsTerminal};

use console::Style;
use lambdalith_domain::{
    Config, ConfigValue, NodeName, OrderedPlan, PlanRecord, ProviderRecord, TemplatePart,
};

mod error;
mod options;
mod redaction;

pub use error::ReportError;
pub use options::{ColorChoice, OutputFormat, RenderOptions};
pub use redaction::{REDACTED, redact_plan, redact_sensitive};

/// Render an ordered plan in the requested output format.
///
/// Values declared sensitive are masked in both formats.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_plan(
    plan: &OrderedPlan,
    format: OutputFormat,
    options: &RenderOptions,
) -> std::result::Result<String, ReportError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&redact_plan(plan))
            .map_err(|source| ReportError::JsonSerialize { source }),
        OutputFormat::Text => Ok(render_plan_text(plan, options)),
    }
}

// ---------------------------------------------------------------------------
// Plan text
// ---------------------------------------------------------------------------

fn render_plan_text(plan: &OrderedPlan, options: &RenderOptions) -> String {
    let mut output = String::new();
    let style = TextStyle::new(options.color);

    append_header(&mut output, "synth", &plan.stack, options.target.as_deref(), &style);

    if !plan.providers.is_empty() {
        let _ = writeln!(output);
        for provider in &plan.providers {
            append_provider_line(&mut output, provider, options, &style);
        }
    }

    if plan.nodes.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "  Nothing to provision.");
        let _ = writeln!(output);
        let _ = writeln!(output, "{}", Tally::from_plan(plan).format(&style));
        return output;
    }

    let _ = writeln!(output);
    let width = plan.nodes.len().to_string().len();
    for record in &plan.nodes {
        append_node_line(&mut output, record, width, options, &style);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "{}", Tally::from_plan(plan).format(&style));

    output
}

// ---------------------------------------------------------------------------
// Line renderers
// ---------------------------------------------------------------------------

fn append_header(
    output: &mut String,
    command: &str,
    stack: &str,
    target: Option<&str>,
    style: &TextStyle,
) {
    let _ = write!(
        output,
        "{} {}",
        style.header_command(command),
        style.primary_text(stack)
    );
    if let Some(target) = target {
        let _ = write!(output, " {}", style.header_target(target));
    }
    let _ = writeln!(output);
}

fn append_provider_line(
    output: &mut String,
    provider: &ProviderRecord,
    options: &RenderOptions,
    style: &TextStyle,
) {
    let label = TextStyle::pad_label(&style.provider_label("provider"));
    let _ = write!(
        output,
        "  {} {label}{} {}",
        style.provider_symbol("*"),
        style.primary_text(provider.kind.name()),
        style.dim(&format!("{} {}", provider.source, provider.version))
    );
    append_after(output, &provider.depends_on, style);
    let _ = writeln!(output);

    if options.verbose {
        append_config(output, &provider.config, style);
    }
}

fn append_node_line(
    output: &mut String,
    record: &PlanRecord,
    width: usize,
    options: &RenderOptions,
    style: &TextStyle,
) {
    let label = TextStyle::pad_label(&style.add_label(record.kind.label()));
    let _ = write!(
        output,
        "  {} {} {label}{}",
        style.dim(&format!("{:>width$}", record.position + 1)),
        style.add_symbol("+"),
        style.primary_text(record.name.as_str())
    );
    if let Some(trigger) = &record.trigger {
        let _ = write!(
            output,
            " {}",
            style.trigger_text(&format!("sha256:{}", trigger.short()))
        );
    }
    append_after(output, &record.depends_on, style);
    let _ = writeln!(output);

    if options.verbose {
        append_config(output, &record.config, style);
    }
}

fn append_after(output: &mut String, depends_on: &[NodeName], style: &TextStyle) {
    if depends_on.is_empty() {
        return;
    }
    let names: Vec<&str> = depends_on.iter().map(NodeName::as_str).collect();
    let _ = write!(output, " {}", style.dim(&format!("after {}", names.join(", "))));
}

fn append_config(output: &mut String, config: &Config, style: &TextStyle) {
    for (key, value) in config.iter() {
        let _ = writeln!(
            output,
            "      {} {}",
            style.dim(&format!("{key} =")),
            format_value(value, style)
        );
    }
}

// ---------------------------------------------------------------------------
// Value rendering
// ---------------------------------------------------------------------------

fn format_value(value: &ConfigValue, style: &TextStyle) -> String {
    match value {
        ConfigValue::String(text) => format!("{text:?}"),
        ConfigValue::Integer(number) => number.to_string(),
        ConfigValue::Bool(flag) => flag.to_string(),
        ConfigValue::Sensitive(_) => style.sensitive_text(REDACTED),
        ConfigValue::Reference(reference) => style.reference_text(&reference.to_string()),
        ConfigValue::Template(parts) => {
            let mut rendered = String::from("\"");
            for part in parts {
                match part {
                    TemplatePart::Text(text) => {
                        let _ = write!(rendered, "{}", text.escape_debug());
                    }
                    TemplatePart::Reference(reference) => {
                        rendered.push_str(&style.reference_text(&reference.to_string()));
                    }
                }
            }
            rendered.push('"');
            rendered
        }
        ConfigValue::Trigger(digest) => style.trigger_text(&format!("sha256:{}", digest.short())),
        ConfigValue::List(items) => {
            let items: Vec<String> = items.iter().map(|item| format_value(item, style)).collect();
            format!("[{}]", items.join(", "))
        }
        ConfigValue::Map(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(key, item)| format!("{key} = {}", format_value(item, style)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

struct Tally {
    nodes: usize,
    providers: usize,
    triggers: usize,
}

impl Tally {
    fn from_plan(plan: &OrderedPlan) -> Self {
        Self {
            nodes: plan.nodes.len(),
            providers: plan.providers.len(),
            triggers: plan
                .nodes
                .iter()
                .filter(|record| record.trigger.is_some())
                .count(),
        }
    }

    fn format(&self, style: &TextStyle) -> String {
        if self.nodes == 0 {
            return format!("{} nothing to provision", style.tally_label("Plan:"));
        }

        let mut parts = vec![style.add_label(&format!("{} to provision", self.nodes))];
        if self.providers > 0 {
            parts.push(style.dim(&plural(self.providers, "provider", "providers")));
        }
        if self.triggers > 0 {
            parts.push(style.dim(&plural(
                self.triggers,
                "content trigger",
                "content triggers",
            )));
        }
        format!("{} {}", style.tally_label("Plan:"), parts.join(", "))
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

// ---------------------------------------------------------------------------
// TextStyle
// ---------------------------------------------------------------------------

const LABEL_WIDTH: usize = 16;

#[derive(Debug, Clone)]
struct TextStyle {
    color_enabled: bool,
    // Symbols
    add_sym_style: Style,
    provider_sym_style: Style,
    // Labels
    add_label_style: Style,
    provider_label_style: Style,
    // Content
    primary_style: Style,
    dim_style: Style,
    reference_style: Style,
    trigger_style: Style,
    sensitive_style: Style,
    // Header
    header_cmd_style: Style,
    header_target_style: Style,
    // Tally
    tally_label_style: Style,
}

impl TextStyle {
    fn new(choice: ColorChoice) -> Self {
        let enabled = should_color(choice);
        Self {
            color_enabled: enabled,
            add_sym_style: Style::new().green().bold(),
            provider_sym_style: Style::new().cyan().bold(),
            add_label_style: Style::new().green(),
            provider_label_style: Style::new().cyan(),
            primary_style: Style::new().white(),
            dim_style: Style::new().dim(),
            reference_style: Style::new().magenta(),
            trigger_style: Style::new().yellow(),
            sensitive_style: Style::new().red(),
            header_cmd_style: Style::new().white().bold(),
            header_target_style: Style::new().dim(),
            tally_label_style: Style::new().white().bold(),
        }
    }

    fn paint<T: std::fmt::Display>(&self, style: &Style, text: T) -> String {
        if self.color_enabled {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn pad_label(painted: &str) -> String {
        // Compute visible length (strip ANSI codes)
        let visible_len = console::measure_text_width(painted);
        if visible_len < LABEL_WIDTH {
            format!("{painted}{}", " ".repeat(LABEL_WIDTH - visible_len))
        } else {
            format!("{painted} ")
        }
    }

    // Symbols
    fn add_symbol(&self, s: &str) -> String {
        self.paint(&self.add_sym_style, s)
    }
    fn provider_symbol(&self, s: &str) -> String {
        self.paint(&self.provider_sym_style, s)
    }

    // Labels
    fn add_label(&self, s: &str) -> String {
        self.paint(&self.add_label_style, s)
    }
    fn provider_label(&self, s: &str) -> String {
        self.paint(&self.provider_label_style, s)
    }

    // Content
    fn primary_text(&self, s: &str) -> String {
        self.paint(&self.primary_style, s)
    }
    fn dim(&self, s: &str) -> String {
        self.paint(&self.dim_style, s)
    }
    fn reference_text(&self, s: &str) -> String {
        self.paint(&self.reference_style, s)
    }
    fn trigger_text(&self, s: &str) -> String {
        self.paint(&self.trigger_style, s)
    }
    fn sensitive_text(&self, s: &str) -> String {
        self.paint(&self.sensitive_style, s)
    }

    // Header
    fn header_command(&self, s: &str) -> String {
        self.paint(&self.header_cmd_style, s)
    }
    fn header_target(&self, s: &str) -> String {
        self.paint(&self.header_target_style, s)
    }

    // Tally
    fn tally_label(&self, s: &str) -> String {
        self.paint(&self.tally_label_style, s)
    }
}

fn should_color(choice: ColorChoice) -> bool {
    match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => io::stdout().is_terminal(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

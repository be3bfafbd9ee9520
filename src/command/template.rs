//! Command template rendering
//!
//! Templates use `{{name}}` placeholders. Substituted values are quoted for
//! POSIX shells when they contain anything beyond a safe character set.

use crate::error::ConfigError;

/// Placeholders understood in update and lock templates
pub const PLACEHOLDERS: &[&str] = &[
    "package",
    "version",
    "constraint",
    "type",
    "rule",
    "with_all_deps_flag",
];

/// Values substituted into a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars<'a> {
    pub package: &'a str,
    pub version: &'a str,
    pub constraint: &'a str,
    pub package_type: &'a str,
    pub rule: &'a str,
    pub with_all_deps: bool,
}

impl TemplateVars<'_> {
    fn lookup(&self, name: &str) -> Option<String> {
        let value = match name {
            "package" => quote(self.package),
            "version" => quote(self.version),
            "constraint" => quote(self.constraint),
            "type" => quote(self.package_type),
            "rule" => quote(self.rule),
            "with_all_deps_flag" => {
                if self.with_all_deps {
                    "-W".to_string()
                } else {
                    String::new()
                }
            }
            _ => return None,
        };
        Some(value)
    }
}

/// Renders a template, failing on unknown or unterminated placeholders
pub fn render_template(template: &str, vars: &TemplateVars<'_>) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| ConfigError::invalid_template(template, "unterminated placeholder"))?;
        let name = after[..end].trim();
        let value = vars.lookup(name).ok_or_else(|| {
            ConfigError::invalid_template(
                template,
                format!(
                    "unknown placeholder '{{{{{}}}}}', expected one of: {}",
                    name,
                    PLACEHOLDERS.join(", ")
                ),
            )
        })?;
        out.push_str(&value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Checks that a template renders
pub fn validate_template(template: &str) -> Result<(), ConfigError> {
    render_template(template, &TemplateVars::default()).map(|_| ())
}

fn quote(value: &str) -> String {
    let safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-^~".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

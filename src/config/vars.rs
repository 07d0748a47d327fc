//! Environment variable interpolation for config files.
//!
//! Supports:
//! - `$VAR` or `${VAR}` - substitute with env var value, error if missing
//! - `${VAR:-default}` - use default if VAR is unset or empty
//! - `$$` - escape sequence for literal `$`

use std::env;
use std::sync::LazyLock;

use regex::Regex;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$                           # Escape sequence $$
        |
        \$\{
            ([A-Za-z_][A-Za-z0-9_]*)   # Braced variable name
            (?: :- ([^}]*) )?          # Optional default value
        \}
        |
        \$([A-Za-z_][A-Za-z0-9_]*)     # Unbraced $VAR
        ",
    )
    .expect("Invalid regex pattern")
});

/// Interpolate environment variables in the given text.
///
/// All missing variables are accumulated so the user sees every problem at
/// once rather than one per invocation.
pub fn interpolate(input: &str) -> Result<String, Vec<String>> {
    let mut errors = Vec::new();

    let text = ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let full_match = caps.get(0).unwrap().as_str();
            if full_match == "$$" {
                return "$".to_string();
            }

            let var_name = caps
                .get(1)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or("");
            let default_value = caps.get(2).map(|m| m.as_str());

            match env::var(var_name) {
                Ok(value) if !value.is_empty() => value,
                _ => match default_value {
                    Some(default) => default.to_string(),
                    None => {
                        errors.push(format!("environment variable '{var_name}' is not set"));
                        full_match.to_string()
                    }
                },
            }
        })
        .to_string();

    if errors.is_empty() {
        Ok(text)
    } else {
        Err(errors)
    }
}

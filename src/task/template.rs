// ABOUTME: `{name}` placeholder substitution for goals, descriptions and expected outputs.
// ABOUTME: Missing parameters are errors, never silently blanked.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::RunError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid placeholder regex")
});

/// Run parameters, e.g. `topic`.
pub type Params = HashMap<String, String>;

/// Names of every placeholder in a template, deduplicated and sorted.
pub fn placeholders(template: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect()
}

/// Substitute `{name}` placeholders with run parameters.
///
/// Only identifier-shaped placeholders are recognized, so literal JSON or
/// other braces in a description pass through untouched. `location` is used in
/// the error to say where the missing parameter was referenced.
pub fn interpolate(template: &str, params: &Params, location: &str) -> Result<String, RunError> {
    if let Some(name) = placeholders(template)
        .into_iter()
        .find(|name| !params.contains_key(name))
    {
        return Err(RunError::MissingParameter {
            location: location.to_string(),
            name,
        });
    }

    Ok(PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            params.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned())
}

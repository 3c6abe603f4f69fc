//! Host-side secrets: a redaction heuristic for logging, and `${VAR}`
//! expansion for values that reference them.
//!
//! Grounded on `secrets.rs`'s `SecretDefinition`/`SecretsConfig`
//! builder shape, narrowed to the one thing the pipeline actually needs:
//! keeping API keys and other credentials out of logs and Dockerfiles while
//! still letting tool configs and environment blocks refer to them by name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Substrings that mark an environment variable name as secret-shaped.
/// Matched case-insensitively against the whole name.
const SECRET_MARKERS: &[&str] = &[
    "key", "token", "secret", "password", "passwd", "credential", "auth",
];

/// Returns true if `name` looks like it holds a credential, based on
/// common naming conventions (`API_KEY`, `AUTH_TOKEN`, `DB_PASSWORD`, ...).
pub fn is_likely_secret(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SECRET_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Redacts `value` for display if `name` looks secret-shaped; otherwise
/// returns it unchanged.
pub fn redact(name: &str, value: &str) -> String {
    if is_likely_secret(name) {
        "***REDACTED***".to_string()
    } else {
        value.to_string()
    }
}

/// Expands `${VAR}` references in `template` against `values`, leaving any
/// unresolved reference untouched rather than failing — the same permissive
/// behavior `EnvironmentConfig` applied to host passthrough variables.
pub fn expand_vars(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// A declared, named secret a skill's tool configuration may reference —
/// e.g. the `web_search` tool's provider API key. Not persisted to the
/// database; resolved from the process environment at pipeline-build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretDeclaration {
    pub name: String,
    pub env_var: String,
    pub required: bool,
}

impl SecretDeclaration {
    pub fn required(name: impl Into<String>, env_var: impl Into<String>) -> Self {
        Self { name: name.into(), env_var: env_var.into(), required: true }
    }

    pub fn optional(name: impl Into<String>, env_var: impl Into<String>) -> Self {
        Self { name: name.into(), env_var: env_var.into(), required: false }
    }

    /// Resolves this declaration against the process environment. Returns
    /// `Ok(None)` for an unset optional secret, and an error naming the
    /// variable for an unset required one.
    pub fn resolve(&self) -> Result<Option<String>, String> {
        match std::env::var(&self.env_var) {
            Ok(value) => Ok(Some(value)),
            Err(_) if self.required => Err(format!("required secret `{}` is not set", self.env_var)),
            Err(_) => Ok(None),
        }
    }
}

/// Walks a JSON object tree (e.g. a `SandboxSpec.tool_configs` value before
/// it's logged or echoed back over the API) and replaces the value of any
/// object key that looks secret-shaped with a redaction marker. Arrays and
/// scalars are otherwise passed through unchanged.
pub fn redact_json(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let redacted = map
                .iter()
                .map(|(k, v)| {
                    let v = if is_likely_secret(k) {
                        serde_json::Value::String("***REDACTED***".to_string())
                    } else {
                        redact_json(v)
                    };
                    (k.clone(), v)
                })
                .collect();
            serde_json::Value::Object(redacted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(redact_json).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_secret_names() {
        assert!(is_likely_secret("API_KEY"));
        assert!(is_likely_secret("anthropic_api_key"));
        assert!(is_likely_secret("DB_PASSWORD"));
        assert!(is_likely_secret("AUTH_TOKEN"));
        assert!(!is_likely_secret("LOG_LEVEL"));
        assert!(!is_likely_secret("WORKING_DIR"));
    }

    #[test]
    fn redact_masks_only_secret_shaped_names() {
        assert_eq!(redact("API_KEY", "sk-abc123"), "***REDACTED***");
        assert_eq!(redact("LOG_LEVEL", "debug"), "debug");
    }

    #[test]
    fn expand_vars_substitutes_known_and_leaves_unknown() {
        let mut values = HashMap::new();
        values.insert("API_ENDPOINT".to_string(), "https://api.example.com".to_string());
        let out = expand_vars("endpoint = \"${API_ENDPOINT}\" key = \"${MISSING}\"", &values);
        assert_eq!(out, "endpoint = \"https://api.example.com\" key = \"${MISSING}\"");
    }

    #[test]
    fn required_secret_missing_errors_with_var_name() {
        std::env::remove_var("SANDBOX_CONTEXT_TEST_REQUIRED");
        let decl = SecretDeclaration::required("thing", "SANDBOX_CONTEXT_TEST_REQUIRED");
        let err = decl.resolve().unwrap_err();
        assert!(err.contains("SANDBOX_CONTEXT_TEST_REQUIRED"));
    }

    #[test]
    fn optional_secret_missing_resolves_to_none() {
        std::env::remove_var("SANDBOX_CONTEXT_TEST_OPTIONAL");
        let decl = SecretDeclaration::optional("thing", "SANDBOX_CONTEXT_TEST_OPTIONAL");
        assert_eq!(decl.resolve().unwrap(), None);
    }

    #[test]
    fn redact_json_masks_nested_secret_keys_only() {
        let value = serde_json::json!({
            "cli": {"shell": "/bin/bash"},
            "web_search": {"api_key": "sk-live-abc", "enabled": true},
        });
        let redacted = redact_json(&value);
        assert_eq!(redacted["cli"]["shell"], "/bin/bash");
        assert_eq!(redacted["web_search"]["api_key"], "***REDACTED***");
        assert_eq!(redacted["web_search"]["enabled"], true);
    }
}

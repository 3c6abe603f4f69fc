//! Prompt construction, fence stripping, JSON decoding, and schema
//! validation for turning a [`Skill`] into a [`SandboxSpec`]. Grounded on
//! `generation/validator.rs`'s validate-then-persist shape, with the prompt
//! itself built in the style of `generation/llm_provider.rs`'s
//! system/user-prompt builders.

use crate::errors::{AnalyzerError, SchemaError};
use crate::llm::{CompletionRequest, LlmClient};
use crate::types::{PackageManager, RuntimeDeps, SandboxSpec, SpecStatus, Skill};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

const SYSTEM_PROMPT: &str = r#"You are a senior platform engineer who turns a skill definition into a sandbox build specification for a Docker container.

Respond with a single strict JSON object and nothing else: no markdown code fences, no commentary before or after it, no trailing text of any kind.

The object must exhaustively contain these top-level keys:
- "base_image": a non-empty string naming a Docker Hub base image tag appropriate for the skill's stack.
- "system_packages": an array of apt package name strings needed at the OS level (may be empty).
- "runtime_deps": an object with "manager" (one of "npm", "yarn", "pnpm", "pip", "pip3") and "packages" (an object mapping package name to version string, may be empty).
- "tool_configs": an object with at least "cli" (an object describing shell, working_dir, timeout_seconds) and "web_search" (an object describing whether the tool is enabled).
- "eval_goals": an array of 8 to 12 strings, each prefixed with a difficulty label of "Easy:", "Medium:", or "Hard:", describing a way to evaluate whether the sandbox works as intended.

Every field must be present even if empty. Do not invent additional top-level keys."#;

/// Produce the structured, validated build plan for a skill. Builds a
/// prompt from the skill's parsed data and raw content, calls the LLM
/// client, extracts and decodes its JSON response, validates it against
/// the expected shape, and returns a `draft` spec ready for persistence. Returns
/// the spec by value; callers are responsible for inserting it into
/// storage — no partial spec is ever constructed on failure.
pub async fn analyze(skill: &Skill, llm: &LlmClient) -> Result<SandboxSpec, AnalyzerError> {
    let user_prompt = build_user_prompt(skill);
    let request = CompletionRequest::new(SYSTEM_PROMPT, user_prompt).max_tokens(4096);
    let raw_response = llm.chat(request).await?;

    let json_text = strip_fences(&raw_response);
    let value: Value = serde_json::from_str(json_text).map_err(|e| AnalyzerError::InvalidJson(e.to_string()))?;
    let object = value.as_object().ok_or(AnalyzerError::NotAnObject)?;

    validate_spec(object)?;

    let now = Utc::now();
    Ok(SandboxSpec {
        id: Uuid::new_v4(),
        skill_id: skill.id,
        base_image: object["base_image"].as_str().unwrap().to_string(),
        system_packages: object["system_packages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect(),
        runtime_deps: decode_runtime_deps(&object["runtime_deps"]),
        tool_configs: object["tool_configs"].clone(),
        eval_goals: object["eval_goals"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect(),
        dockerfile_content: None,
        status: SpecStatus::Draft,
        created_at: now,
        updated_at: now,
    })
}

fn build_user_prompt(skill: &Skill) -> String {
    let parsed = &skill.parsed_data;
    format!(
        "Skill name: {}\nSkill description: {}\nSections found: {}\nTools mentioned: {}\nFrameworks mentioned: {}\nDependencies mentioned: {}\n\nFull skill document:\n{}",
        parsed.name,
        parsed.description,
        parsed.sections.join(", "),
        parsed.mentioned_tools.join(", "),
        parsed.mentioned_frameworks.join(", "),
        parsed.mentioned_dependencies.join(", "),
        skill.raw_content,
    )
}

/// Strip a leading/trailing fenced-code wrapper (\`\`\`json, \`\`\`, or any
/// casing of the "json" language tag) around an LLM response. Stripping
/// must be idempotent on already-unwrapped input.
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.trim_start();
        if let Some(after_tag) = rest.strip_prefix("json") {
            after_tag.trim_start()
        } else if let Some(after_tag) = rest.strip_prefix("JSON") {
            after_tag.trim_start()
        } else {
            rest
        }
    } else {
        trimmed
    };
    without_open.strip_suffix("```").map(str::trim).unwrap_or(without_open.trim())
}

fn decode_runtime_deps(value: &Value) -> RuntimeDeps {
    let manager = value
        .get("manager")
        .and_then(Value::as_str)
        .and_then(|s| match s {
            "npm" => Some(PackageManager::Npm),
            "yarn" => Some(PackageManager::Yarn),
            "pnpm" => Some(PackageManager::Pnpm),
            "pip" => Some(PackageManager::Pip),
            "pip3" => Some(PackageManager::Pip3),
            _ => None,
        })
        .unwrap_or(PackageManager::Unsupported);

    let packages = value
        .get("packages")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
                .collect()
        })
        .unwrap_or_default();

    RuntimeDeps { manager, packages }
}

/// Validate a decoded analyzer response against the expected shape. Exposed
/// separately from [`analyze`] so fixed-input scenarios can exercise it
/// directly.
pub fn validate_spec(object: &serde_json::Map<String, Value>) -> Result<(), SchemaError> {
    let base_image = object
        .get("base_image")
        .ok_or_else(|| SchemaError::MissingField("base_image".to_string()))?;
    match base_image.as_str() {
        Some(s) if !s.is_empty() => {}
        Some(_) => {
            return Err(SchemaError::WrongType {
                field: "base_image".to_string(),
                expected: "non-empty string".to_string(),
            })
        }
        None => {
            return Err(SchemaError::WrongType {
                field: "base_image".to_string(),
                expected: "string".to_string(),
            })
        }
    }

    let system_packages = object
        .get("system_packages")
        .ok_or_else(|| SchemaError::MissingField("system_packages".to_string()))?;
    let packages_array = system_packages.as_array().ok_or_else(|| SchemaError::WrongType {
        field: "system_packages".to_string(),
        expected: "array of strings".to_string(),
    })?;
    if !packages_array.iter().all(|v| v.is_string()) {
        return Err(SchemaError::WrongType {
            field: "system_packages".to_string(),
            expected: "array of strings".to_string(),
        });
    }

    let runtime_deps = object
        .get("runtime_deps")
        .ok_or_else(|| SchemaError::MissingField("runtime_deps".to_string()))?;
    let runtime_deps_obj = runtime_deps
        .as_object()
        .ok_or_else(|| SchemaError::NotAnObject("runtime_deps".to_string()))?;
    if !matches!(runtime_deps_obj.get("manager"), Some(Value::String(_))) {
        return Err(SchemaError::WrongType {
            field: "runtime_deps.manager".to_string(),
            expected: "string".to_string(),
        });
    }
    if !matches!(runtime_deps_obj.get("packages"), Some(Value::Object(_))) {
        return Err(SchemaError::WrongType {
            field: "runtime_deps.packages".to_string(),
            expected: "object".to_string(),
        });
    }

    let tool_configs = object
        .get("tool_configs")
        .ok_or_else(|| SchemaError::MissingField("tool_configs".to_string()))?;
    let tool_configs_obj = tool_configs
        .as_object()
        .ok_or_else(|| SchemaError::NotAnObject("tool_configs".to_string()))?;
    if !matches!(tool_configs_obj.get("cli"), Some(Value::Object(_))) {
        return Err(SchemaError::MissingField("tool_configs.cli".to_string()));
    }
    if !matches!(tool_configs_obj.get("web_search"), Some(Value::Object(_))) {
        return Err(SchemaError::MissingField("tool_configs.web_search".to_string()));
    }

    let eval_goals = object
        .get("eval_goals")
        .ok_or_else(|| SchemaError::MissingField("eval_goals".to_string()))?;
    let goals_array = eval_goals.as_array().ok_or_else(|| SchemaError::WrongType {
        field: "eval_goals".to_string(),
        expected: "array of strings".to_string(),
    })?;
    if !goals_array.iter().all(|v| v.is_string()) {
        return Err(SchemaError::WrongType {
            field: "eval_goals".to_string(),
            expected: "array of strings".to_string(),
        });
    }
    if goals_array.len() < 5 {
        return Err(SchemaError::InsufficientEvalGoals { found: goals_array.len() });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_response() -> Value {
        json!({
            "base_image": "node:20-slim",
            "system_packages": ["git", "curl"],
            "runtime_deps": {"manager": "npm", "packages": {"react": "^18.0.0"}},
            "tool_configs": {"cli": {"shell": "/bin/bash"}, "web_search": {"enabled": true}},
            "eval_goals": ["Easy: a", "Easy: b", "Medium: c", "Medium: d", "Hard: e"],
        })
    }

    #[test]
    fn strip_fences_is_idempotent_across_wrappers() {
        let plain = r#"{"a":1}"#;
        let wrapped_json = format!("```json\n{plain}\n```");
        let wrapped_bare = format!("```\n{plain}\n```");
        let wrapped_upper = format!("```JSON\n{plain}\n```");

        assert_eq!(strip_fences(plain), plain);
        assert_eq!(strip_fences(&wrapped_json), plain);
        assert_eq!(strip_fences(&wrapped_bare), plain);
        assert_eq!(strip_fences(&wrapped_upper), plain);
    }

    #[test]
    fn validate_spec_accepts_s1_scenario() {
        let value = valid_response();
        validate_spec(value.as_object().unwrap()).unwrap();
    }

    #[test]
    fn validate_spec_rejects_s3_scenario_empty_base_image_and_short_goals() {
        let value = json!({
            "base_image": "",
            "system_packages": ["git"],
            "runtime_deps": {"manager": "pip", "packages": {}},
            "tool_configs": {"cli": {}, "web_search": {}},
            "eval_goals": ["a", "b", "c"],
        });
        let err = validate_spec(value.as_object().unwrap()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("base_image"));
    }

    #[test]
    fn validate_spec_rejects_missing_tool_configs_subkey() {
        let mut value = valid_response();
        value.as_object_mut().unwrap().get_mut("tool_configs").unwrap().as_object_mut().unwrap().remove("web_search");
        let err = validate_spec(value.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingField(f) if f == "tool_configs.web_search"));
    }

    #[test]
    fn runtime_deps_packages_preserve_insertion_order() {
        let value = json!({"manager": "pip", "packages": {"flask": "3.0.0", "requests": "^2.31.0"}});
        let deps = decode_runtime_deps(&value);
        assert_eq!(
            deps.packages,
            vec![
                ("flask".to_string(), "3.0.0".to_string()),
                ("requests".to_string(), "^2.31.0".to_string())
            ]
        );
    }
}

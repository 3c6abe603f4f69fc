//! The static tool registry and in-container manifest. Grounded
//! on `manifest.rs`'s declarative-registration style, narrowed from a
//! dynamically loaded plugin manifest down to the two standard tools
//! every sandbox ships: `cli_execution` and `web_search`. Closed at build
//! time of the host — there is no dynamic registration path.

use crate::types::Tool;
use chrono::Utc;
use serde_json::json;

const CLI_EXECUTION_SCRIPT: &str = r#"#!/bin/bash
set -euo pipefail
# usage: cli_execution.sh <command> [working_dir]
command="$1"
working_dir="${2:-/workspace}"
cd "$working_dir"
bash -c "$command"
"#;

const WEB_SEARCH_SCRIPT: &str = r#"#!/bin/bash
set -euo pipefail
# usage: web_search.sh <query> [max_results]
query="$1"
max_results="${2:-5}"
curl -sS -X POST "http://host.docker.internal:${SANDBOX_SEARCH_PROXY_PORT:-8089}/api/tools/search" \
    -H "content-type: application/json" \
    -d "$(printf '{"query": %s, "max_results": %s}' "$(printf '%s' "$query" | python3 -c 'import json,sys; print(json.dumps(sys.stdin.read().strip()))')" "$max_results")"
"#;

/// The fixed set of tools every sandbox ships with. Closed at compile
/// time; nothing outside this module registers a tool.
pub fn registered_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "cli_execution".to_string(),
            description: "Run a shell command inside the sandbox workspace.".to_string(),
            parameter_schema: json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string"},
                    "working_dir": {"type": "string", "default": "/workspace"},
                },
                "required": ["command"],
            }),
            container_setup_script: CLI_EXECUTION_SCRIPT.to_string(),
        },
        Tool {
            name: "web_search".to_string(),
            description: "Search the web through the host's search proxy.".to_string(),
            parameter_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "max_results": {"type": "integer", "default": 5},
                },
                "required": ["query"],
            }),
            container_setup_script: WEB_SEARCH_SCRIPT.to_string(),
        },
    ]
}

/// Render the `/workspace/tool_manifest.json` document for the given
/// tool set (normally [`registered_tools`], parameterised for tests).
pub fn build_manifest(tools: &[Tool]) -> serde_json::Value {
    json!({
        "version": "1.0",
        "generated_at": Utc::now().to_rfc3339(),
        "tools": tools.iter().map(|tool| json!({
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameter_schema,
            "invocation": {
                "type": "shell_script",
                "path": format!("/tools/{}.sh", tool.name),
            },
        })).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_lists_both_standard_tools_with_shell_script_invocation() {
        let tools = registered_tools();
        let manifest = build_manifest(&tools);
        let entries = manifest["tools"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        let names: Vec<&str> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
        assert!(names.contains(&"cli_execution"));
        assert!(names.contains(&"web_search"));
        for entry in entries {
            assert_eq!(entry["invocation"]["type"], "shell_script");
            let path = entry["invocation"]["path"].as_str().unwrap();
            assert!(path.starts_with("/tools/") && path.ends_with(".sh"));
        }
    }

    #[test]
    fn cli_execution_requires_command_parameter() {
        let tools = registered_tools();
        let cli = tools.iter().find(|t| t.name == "cli_execution").unwrap();
        let required = cli.parameter_schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "command"));
    }
}

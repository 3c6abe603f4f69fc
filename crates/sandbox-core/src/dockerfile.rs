//! Pure Dockerfile generation from a [`SandboxSpec`]. Grounded on
//! `docker_runtime.rs`'s ordered-`Vec<String>` command-building style,
//! generalised from "build one `docker run` invocation" to "build one
//! Dockerfile's worth of sections" — the tagged-union dispatch on
//! [`PackageManager`] mirrors that file's dispatch on security-policy
//! checks.

use crate::types::{PackageManager, SandboxSpec};
use serde_json::json;

/// Render the full Dockerfile text for `spec`. A pure function of its
/// input: calling it twice on the same spec yields byte-identical text.
pub fn build(spec: &SandboxSpec) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(format!("FROM {}", spec.base_image));
    sections.push(format!(
        "LABEL maintainer=\"skill-to-sandbox\" skill_id=\"{}\"",
        spec.skill_id
    ));

    if !spec.system_packages.is_empty() {
        sections.push(format!(
            "RUN apt-get update && apt-get install -y --no-install-recommends {} && rm -rf /var/lib/apt/lists/*",
            spec.system_packages.join(" ")
        ));
    }

    sections.push("WORKDIR /workspace".to_string());

    if let Some(block) = runtime_deps_block(spec) {
        sections.push(block);
    }

    sections.push(
        "COPY tools/ /tools/\nRUN chmod +x /tools/*.sh\nCOPY tool_manifest.json /workspace/tool_manifest.json\nENV PATH=\"/tools:$PATH\""
            .to_string(),
    );

    if let Some(block) = environment_block(spec) {
        sections.push(block);
    }

    sections.push(r#"CMD ["tail","-f","/dev/null"]"#.to_string());

    let mut text = sections.join("\n\n");
    text.push('\n');
    text
}

fn runtime_deps_block(spec: &SandboxSpec) -> Option<String> {
    match spec.runtime_deps.manager {
        PackageManager::Npm => Some(
            "COPY package.json /workspace/package.json\nRUN npm install --omit=dev".to_string(),
        ),
        PackageManager::Yarn => Some(
            "COPY package.json /workspace/package.json\nRUN yarn install --production=true".to_string(),
        ),
        PackageManager::Pnpm => Some(
            "RUN npm install -g pnpm\nCOPY package.json /workspace/package.json\nRUN pnpm install --prod".to_string(),
        ),
        PackageManager::Pip => Some(
            "COPY requirements.txt /workspace/requirements.txt\nRUN pip install --no-cache-dir -r requirements.txt".to_string(),
        ),
        PackageManager::Pip3 => Some(
            "COPY requirements.txt /workspace/requirements.txt\nRUN pip3 install --no-cache-dir -r requirements.txt".to_string(),
        ),
        PackageManager::Unsupported => None,
    }
}

fn environment_block(spec: &SandboxSpec) -> Option<String> {
    let cli = spec.tool_configs.get("cli")?.as_object()?;
    let mut lines = Vec::new();

    let workspace_dir = cli
        .get("working_dir")
        .and_then(|v| v.as_str())
        .unwrap_or("/workspace");
    lines.push(format!("ENV WORKSPACE_DIR={workspace_dir}"));

    let timeout = cli.get("timeout_seconds").and_then(|v| v.as_u64()).unwrap_or(30);
    lines.push(format!("ENV CLI_TIMEOUT={timeout}"));

    if let Some(additions) = cli.get("path_additions").and_then(|v| v.as_array()) {
        let joined: Vec<&str> = additions.iter().filter_map(|v| v.as_str()).collect();
        if !joined.is_empty() {
            lines.push(format!("ENV EXTRA_PATH={}", joined.join(":")));
        }
    }

    Some(lines.join("\n"))
}

/// Auxiliary files the Dockerfile's `COPY` instructions reference:
/// `package.json` for npm/yarn/pnpm, `requirements.txt` for pip/pip3.
pub fn required_context_files(spec: &SandboxSpec) -> Vec<(String, String)> {
    match spec.runtime_deps.manager {
        PackageManager::Npm | PackageManager::Yarn | PackageManager::Pnpm => {
            let dependencies: serde_json::Map<String, serde_json::Value> = spec
                .runtime_deps
                .packages
                .iter()
                .map(|(name, version)| (name.clone(), json!(version)))
                .collect();
            let package_json = json!({
                "name": "sandbox",
                "version": "1.0.0",
                "private": true,
                "dependencies": serde_json::Value::Object(dependencies),
            });
            vec![(
                "package.json".to_string(),
                serde_json::to_string_pretty(&package_json).unwrap_or_default(),
            )]
        }
        PackageManager::Pip | PackageManager::Pip3 => {
            let mut content = String::new();
            for (name, version) in &spec.runtime_deps.packages {
                content.push_str(&format!("{}{}\n", name, normalize_pip_version(version)));
            }
            vec![("requirements.txt".to_string(), content)]
        }
        PackageManager::Unsupported => Vec::new(),
    }
}

/// Normalise a bare version spec into a pip requirement operator:
/// `^X` → `>=X`, `~X` → `~=X`, bare `X` → `==X`; anything already starting
/// with a comparison operator is preserved verbatim.
fn normalize_pip_version(version: &str) -> String {
    if let Some(rest) = version.strip_prefix('^') {
        format!(">={rest}")
    } else if let Some(rest) = version.strip_prefix('~') {
        format!("~={rest}")
    } else if version.starts_with("==")
        || version.starts_with(">=")
        || version.starts_with("<=")
        || version.starts_with('>')
        || version.starts_with('<')
        || version.starts_with('!')
    {
        version.to_string()
    } else {
        format!("=={version}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RuntimeDeps, SpecStatus};
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn npm_spec() -> SandboxSpec {
        SandboxSpec {
            id: Uuid::new_v4(),
            skill_id: Uuid::new_v4(),
            base_image: "node:20-slim".to_string(),
            system_packages: vec!["git".to_string(), "curl".to_string()],
            runtime_deps: RuntimeDeps {
                manager: PackageManager::Npm,
                packages: vec![("react".to_string(), "^18.0.0".to_string())],
            },
            tool_configs: json!({
                "cli": {"shell": "/bin/bash", "working_dir": "/workspace", "timeout_seconds": 30},
                "web_search": {"enabled": true},
            }),
            eval_goals: vec!["Easy: a".into(), "Easy: b".into(), "Medium: c".into(), "Medium: d".into(), "Hard: e".into()],
            dockerfile_content: None,
            status: SpecStatus::Approved,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn s1_scenario_dockerfile_contains_expected_substrings() {
        let spec = npm_spec();
        let text = build(&spec);
        assert!(text.contains("FROM node:20-slim"));
        assert!(text.contains("apt-get install -y --no-install-recommends"));
        assert!(text.contains("COPY package.json /workspace/package.json"));
        assert!(text.contains("COPY tools/ /tools/"));
        assert!(text.contains(r#"CMD ["tail","-f","/dev/null"]"#));
    }

    #[test]
    fn build_is_deterministic() {
        let spec = npm_spec();
        assert_eq!(build(&spec), build(&spec));
    }

    #[test]
    fn s4_scenario_requirements_txt_normalises_versions_in_order() {
        let mut spec = npm_spec();
        spec.runtime_deps = RuntimeDeps {
            manager: PackageManager::Pip,
            packages: vec![
                ("flask".to_string(), "3.0.0".to_string()),
                ("requests".to_string(), "^2.31.0".to_string()),
            ],
        };
        let files = required_context_files(&spec);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "requirements.txt");
        assert_eq!(files[0].1, "flask==3.0.0\nrequests>=2.31.0\n");
    }

    #[test]
    fn unsupported_manager_omits_runtime_deps_block_and_context_files() {
        let mut spec = npm_spec();
        spec.runtime_deps = RuntimeDeps {
            manager: PackageManager::Unsupported,
            packages: vec![],
        };
        let text = build(&spec);
        assert!(!text.contains("npm install"));
        assert!(required_context_files(&spec).is_empty());
    }

    #[test]
    fn empty_system_packages_omits_apt_block() {
        let mut spec = npm_spec();
        spec.system_packages = vec![];
        let text = build(&spec);
        assert!(!text.contains("apt-get"));
    }
}

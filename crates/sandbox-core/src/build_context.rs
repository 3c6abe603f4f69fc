//! Materialises a [`SandboxSpec`] into a temporary directory ready for
//! `docker build`: the rendered Dockerfile, its auxiliary files, the tool
//! manifest, and one executable script per registered tool. Grounded on
//! `docker_runtime.rs`'s filesystem-adjacent conventions, using `tempfile`
//! (already a dev-dependency upstream, promoted here to a runtime
//! dependency) for the directory's lifetime management.

use crate::errors::BuildContextError;
use crate::types::SandboxSpec;
use std::path::Path;
use tempfile::TempDir;

/// A freshly written build context: a temp directory plus the Dockerfile
/// text that was written into it (returned separately so callers can
/// persist it into the spec without re-reading the file).
pub struct BuildContext {
    dir: TempDir,
    pub dockerfile_content: String,
}

impl BuildContext {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Create a fresh temp directory and populate it: `Dockerfile`,
/// every file `required_context_files` names, the tool manifest, and an
/// owner-executable shell script per registered tool under `tools/`.
pub fn assemble(spec: &SandboxSpec) -> Result<BuildContext, BuildContextError> {
    let dir = tempfile::Builder::new()
        .prefix("sandbox-build-")
        .tempdir()
        .map_err(BuildContextError::CreateDir)?;

    let dockerfile_content = crate::dockerfile::build(spec);
    write_file(dir.path(), "Dockerfile", &dockerfile_content)?;

    for (relative_path, content) in crate::dockerfile::required_context_files(spec) {
        write_file(dir.path(), &relative_path, &content)?;
    }

    let tools = crate::tools::registered_tools();
    let manifest = crate::tools::build_manifest(&tools);
    write_file(
        dir.path(),
        "tool_manifest.json",
        &serde_json::to_string_pretty(&manifest).unwrap_or_default(),
    )?;

    let tools_dir = dir.path().join("tools");
    std::fs::create_dir_all(&tools_dir).map_err(BuildContextError::CreateDir)?;
    for tool in &tools {
        let script_path = tools_dir.join(format!("{}.sh", tool.name));
        std::fs::write(&script_path, &tool.container_setup_script).map_err(|e| BuildContextError::WriteFile {
            path: script_path.display().to_string(),
            source: e,
        })?;
        set_executable(&script_path)?;
    }

    Ok(BuildContext { dir, dockerfile_content })
}

fn write_file(base: &Path, relative_path: &str, content: &str) -> Result<(), BuildContextError> {
    let path = base.join(relative_path);
    std::fs::write(&path, content).map_err(|e| BuildContextError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), BuildContextError> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = std::fs::metadata(path).map_err(|e| BuildContextError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions).map_err(|e| BuildContextError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<(), BuildContextError> {
    Ok(())
}

/// Remove the build context directory. A no-op if the context was already
/// dropped; `TempDir`'s own `Drop` impl would otherwise remove it anyway,
/// but callers invoke this explicitly so cleanup timing is visible at the
/// call site.
pub fn cleanup(ctx: BuildContext) {
    drop(ctx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PackageManager, RuntimeDeps, SpecStatus};
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn sample_spec() -> SandboxSpec {
        SandboxSpec {
            id: Uuid::new_v4(),
            skill_id: Uuid::new_v4(),
            base_image: "node:20-slim".to_string(),
            system_packages: vec!["git".to_string()],
            runtime_deps: RuntimeDeps {
                manager: PackageManager::Npm,
                packages: vec![("react".to_string(), "^18.0.0".to_string())],
            },
            tool_configs: json!({"cli": {}, "web_search": {}}),
            eval_goals: vec!["Easy: a".into(), "Easy: b".into(), "Medium: c".into(), "Medium: d".into(), "Hard: e".into()],
            dockerfile_content: None,
            status: SpecStatus::Approved,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn assemble_writes_dockerfile_aux_files_manifest_and_tool_scripts() {
        let spec = sample_spec();
        let ctx = assemble(&spec).unwrap();

        assert!(ctx.path().join("Dockerfile").exists());
        assert!(ctx.path().join("package.json").exists());
        assert!(ctx.path().join("tool_manifest.json").exists());
        assert!(ctx.path().join("tools/cli_execution.sh").exists());
        assert!(ctx.path().join("tools/web_search.sh").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(ctx.path().join("tools/cli_execution.sh"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o111, 0o111);
        }

        let path = ctx.path().to_path_buf();
        cleanup(ctx);
        assert!(!path.exists());
    }
}

//! Configuration loading.

use miette::{IntoDiagnostic, Result, WrapErr};
use sfc_transform::{CommandBridge, Compilers, PipelineConfig};
use std::path::Path;
use std::sync::Arc;

/// Load the transform options, filling in what the host would provide.
///
/// Without a file the defaults are used. `rootDir` falls back to the
/// workspace and `configString` to the serialized project configuration.
pub fn load(path: Option<&Path>, workspace: &Path) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
            PipelineConfig::from_json(&text).into_diagnostic()?
        }
        None => PipelineConfig::default(),
    };

    if config.config.root_dir.is_none() {
        config.config.root_dir = Some(workspace.to_path_buf());
    }
    if config.config_string.is_empty() {
        config.config_string = serde_json::to_string(&config.config).into_diagnostic()?;
    }
    Ok(config)
}

/// Compilers for a run, optionally backed by a bridge command.
pub fn compilers(
    workspace: &Path,
    bridge: Option<&str>,
    bridge_args: &[String],
    bridge_styles: bool,
) -> Result<Compilers> {
    let Some(name) = bridge else {
        return Ok(Compilers::builtin());
    };

    let bridge = Arc::new(
        CommandBridge::locate(name, workspace)
            .into_diagnostic()?
            .with_args(bridge_args.iter().cloned()),
    );
    tracing::debug!(program = %bridge.program().display(), "using compiler bridge");

    let mut compilers = Compilers::builtin()
        .with_typescript(bridge.clone())
        .with_script_setup(bridge.clone())
        .with_template(bridge.clone());
    if bridge_styles {
        compilers = compilers.with_style(bridge);
    }
    Ok(compilers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_without_file() {
        let config = load(None, Path::new("/work")).unwrap();
        assert_eq!(config.config.root_dir, Some(PathBuf::from("/work")));
        assert!(!config.config_string.is_empty());
        assert!(!config.supports_static_esm);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jest.json");
        std::fs::write(
            &path,
            r#"{ "configString": "abc", "config": { "rootDir": "/app", "globals": { "vue-jest": { "experimentalCSSCompile": false } } } }"#,
        )
        .unwrap();

        let config = load(Some(&path), Path::new("/work")).unwrap();
        assert_eq!(config.config.root_dir, Some(PathBuf::from("/app")));
        assert_eq!(config.config_string, "abc");
        assert!(!config.vue_jest().unwrap().css_compile_enabled());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load(Some(Path::new("/nowhere/jest.json")), Path::new("/work")).is_err());
    }

    #[test]
    fn test_builtin_compilers_without_bridge() {
        let compilers = compilers(Path::new("/work"), None, &[], false).unwrap();
        assert!(compilers.template.is_none());
        assert!(compilers.typescript.is_none());
    }
}

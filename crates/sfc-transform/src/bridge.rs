//! Reaching external compilers through a child process.
//!
//! Each request is written as one JSON document to the command's stdin:
//!
//! ```json
//! { "kind": "template", "payload": { ... } }
//! ```
//!
//! and the command answers on stdout with either `{ "ok": <result> }` or
//! `{ "error": "<message>" }`.

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sfc_parser::ComponentDescriptor;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::compilers::{
    CompiledScript, ScriptCompiler, ScriptRequest, ScriptSetupCompiler, ScriptSetupOptions,
    ScriptSetupOutput, StyleCompiler, StyleOutput, StyleRequest, TemplateCompiler,
    TemplateOutput, TemplateRequest,
};
use crate::error::{BoxError, CompileResult, TransformError, TransformResult};

/// Request kinds understood by a bridge command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    Script,
    ScriptSetup,
    Template,
    Style,
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    kind: RequestKind,
    payload: &'a T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
enum Reply<R> {
    Ok(R),
    Error(String),
}

#[derive(Serialize)]
struct ScriptSetupPayload<'a> {
    descriptor: &'a ComponentDescriptor,
    options: &'a ScriptSetupOptions,
}

/// A compiler implemented by an external command.
#[derive(Debug, Clone)]
pub struct CommandBridge {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl CommandBridge {
    /// Create a bridge that runs `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Locate `name` in the workspace's `node_modules/.bin`, then on `PATH`.
    pub fn locate(name: &str, workspace: &Path) -> TransformResult<Self> {
        let local = workspace.join("node_modules").join(".bin").join(name);
        if local.exists() {
            return Ok(Self::new(local).with_cwd(workspace));
        }
        which::which(name)
            .map(|program| Self::new(program).with_cwd(workspace))
            .map_err(|_| {
                TransformError::config(format!(
                    "Could not find compiler command \"{}\". Install it locally or add it to PATH.",
                    name
                ))
            })
    }

    /// Append arguments passed on every invocation.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the command from `dir`.
    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// The command that is run.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn encode<T: Serialize>(kind: RequestKind, payload: &T) -> CompileResult<Vec<u8>> {
        Ok(serde_json::to_vec(&Envelope { kind, payload })?)
    }

    fn decode<R: DeserializeOwned>(
        &self,
        status: std::process::ExitStatus,
        stdout: &[u8],
        stderr: &[u8],
    ) -> CompileResult<R> {
        if !status.success() {
            let stderr = String::from_utf8_lossy(stderr);
            return Err(format!(
                "{} exited with {}: {}",
                self.program.display(),
                status,
                stderr.trim()
            )
            .into());
        }
        match serde_json::from_slice::<Reply<R>>(stdout)? {
            Reply::Ok(result) => Ok(result),
            Reply::Error(message) => Err(message.into()),
        }
    }

    /// Send one request and wait for the reply, blocking the thread.
    pub fn call<T, R>(&self, kind: RequestKind, payload: &T) -> CompileResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let input = Self::encode(kind, payload)?;
        tracing::debug!(program = %self.program.display(), ?kind, "bridge request");

        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;
        let mut stdin = child.stdin.take().ok_or("bridge stdin unavailable")?;
        let writer = std::thread::spawn(move || stdin.write_all(&input));
        let output = child.wait_with_output()?;
        writer
            .join()
            .map_err(|_| BoxError::from("bridge stdin writer panicked"))??;

        self.decode(output.status, &output.stdout, &output.stderr)
    }

    /// Send one request and await the reply.
    pub async fn call_async<T, R>(&self, kind: RequestKind, payload: &T) -> CompileResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        use tokio::io::AsyncWriteExt;

        let input = Self::encode(kind, payload)?;
        tracing::debug!(program = %self.program.display(), ?kind, "bridge request");

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;
        let mut stdin = child.stdin.take().ok_or("bridge stdin unavailable")?;
        let write = async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;
        written?;

        self.decode(output.status, &output.stdout, &output.stderr)
    }
}

impl ScriptCompiler for CommandBridge {
    fn compile(&self, request: ScriptRequest<'_>) -> CompileResult<CompiledScript> {
        self.call(RequestKind::Script, &request)
    }

    fn compile_async<'a>(
        &'a self,
        request: ScriptRequest<'a>,
    ) -> BoxFuture<'a, CompileResult<CompiledScript>> {
        Box::pin(async move { self.call_async(RequestKind::Script, &request).await })
    }
}

impl ScriptSetupCompiler for CommandBridge {
    fn compile(
        &self,
        descriptor: &ComponentDescriptor,
        options: &ScriptSetupOptions,
    ) -> CompileResult<ScriptSetupOutput> {
        self.call(
            RequestKind::ScriptSetup,
            &ScriptSetupPayload { descriptor, options },
        )
    }

    fn compile_async<'a>(
        &'a self,
        descriptor: &'a ComponentDescriptor,
        options: &'a ScriptSetupOptions,
    ) -> BoxFuture<'a, CompileResult<ScriptSetupOutput>> {
        Box::pin(async move {
            self.call_async(
                RequestKind::ScriptSetup,
                &ScriptSetupPayload { descriptor, options },
            )
            .await
        })
    }
}

impl TemplateCompiler for CommandBridge {
    fn compile(&self, request: &TemplateRequest<'_>) -> CompileResult<TemplateOutput> {
        self.call(RequestKind::Template, request)
    }

    fn compile_async<'a>(
        &'a self,
        request: &'a TemplateRequest<'a>,
    ) -> BoxFuture<'a, CompileResult<TemplateOutput>> {
        Box::pin(async move { self.call_async(RequestKind::Template, request).await })
    }
}

impl StyleCompiler for CommandBridge {
    fn compile(&self, request: &StyleRequest<'_>) -> CompileResult<StyleOutput> {
        self.call(RequestKind::Style, request)
    }

    fn compile_async<'a>(
        &'a self,
        request: &'a StyleRequest<'a>,
    ) -> BoxFuture<'a, CompileResult<StyleOutput>> {
        Box::pin(async move { self.call_async(RequestKind::Style, request).await })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use pretty_assertions::assert_eq;

    fn echo(reply: &str) -> CommandBridge {
        CommandBridge::new("sh").with_args(["-c", &format!("cat > /dev/null; printf '%s' '{}'", reply)])
    }

    fn script_request(config: &PipelineConfig) -> ScriptRequest<'_> {
        ScriptRequest {
            source: "export default {}",
            filename: "/app/Comp.vue",
            lang: Some("ts"),
            config,
        }
    }

    #[test]
    fn test_blocking_round_trip() {
        let bridge = echo(r#"{"ok":{"code":"exports.default = {}"}}"#);
        let config = PipelineConfig::default();
        let out = ScriptCompiler::compile(&bridge, script_request(&config)).unwrap();
        assert_eq!(out.code, "exports.default = {}");
        assert!(out.map.is_none());
    }

    #[test]
    fn test_malformed_map_in_reply_is_an_error() {
        let bridge = echo(
            r#"{"ok":{"code":"x","map":{"version":3,"sources":["a.js"],"names":[],"mappings":"gggggggggggggggA"}}}"#,
        );
        let config = PipelineConfig::default();
        assert!(ScriptCompiler::compile(&bridge, script_request(&config)).is_err());
    }

    #[test]
    fn test_error_reply_is_passed_through() {
        let bridge = echo(r#"{"error":"Unexpected token (1:4)"}"#);
        let config = PipelineConfig::default();
        let err = ScriptCompiler::compile(&bridge, script_request(&config)).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected token (1:4)");
    }

    #[test]
    fn test_failing_command() {
        let bridge = CommandBridge::new("sh").with_args(["-c", "cat > /dev/null; echo boom >&2; exit 3"]);
        let config = PipelineConfig::default();
        let err = ScriptCompiler::compile(&bridge, script_request(&config)).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_suspending_round_trip() {
        let bridge = echo(r#"{"ok":{"code":".a{}","errors":[]}}"#);
        let request = StyleRequest {
            source: ".a {}",
            file_path: "/app/Comp.vue",
            preprocess_lang: None,
            preprocess_options: Default::default(),
            scoped: false,
            importer: None,
        };
        let out = StyleCompiler::compile_async(&bridge, &request).await.unwrap();
        assert_eq!(out.code, ".a{}");
        assert!(out.errors.is_empty());
    }

    #[test]
    fn test_locate_prefers_local_bin() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("node_modules/.bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("vue-compile"), "").unwrap();
        let bridge = CommandBridge::locate("vue-compile", dir.path()).unwrap();
        assert_eq!(bridge.program(), bin.join("vue-compile"));
    }
}

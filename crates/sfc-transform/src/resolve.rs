//! Locating `src` references, style imports and global resources on disk.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::config::HostConfig;
use crate::error::{TransformError, TransformResult};

/// Style languages tried, after the block's own, for `~` imports.
const SASS_EXTENSIONS: [&str; 3] = ["scss", "sass", "css"];

static CSS_FAMILY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(s?css|sass)$").unwrap());

/// Read a `src` reference relative to the referencing file's directory.
pub fn load_src(src: &str, file: &str) -> TransformResult<String> {
    let path = relative_to(file, src);
    tracing::debug!(src, file, path = %path.display(), "loading src");
    std::fs::read_to_string(&path).map_err(|source| TransformError::Load {
        src: src.to_string(),
        file: file.to_string(),
        source,
    })
}

/// `reference` joined to the directory of `file`, normalized.
pub fn relative_to(file: &str, reference: &str) -> PathBuf {
    let dir = Path::new(file).parent().unwrap_or_else(|| Path::new(""));
    normalize(&dir.join(reference))
}

/// Lexically resolve `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// The host's ordered module-name rewrite rules.
#[derive(Debug, Clone, Default)]
pub struct ModuleNameMapper {
    rules: Vec<(Regex, String)>,
}

impl ModuleNameMapper {
    /// Compile the rules of a host configuration.
    ///
    /// `<rootDir>` in a replacement is expanded to the configured root.
    pub fn from_config(config: &HostConfig) -> TransformResult<Self> {
        let root = config
            .root_dir
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let rules = config
            .module_name_mapper
            .iter()
            .map(|(pattern, replacement)| {
                let regex = Regex::new(pattern).map_err(|e| {
                    TransformError::config(format!(
                        "invalid moduleNameMapper pattern \"{}\": {}",
                        pattern, e
                    ))
                })?;
                let replacement = match &root {
                    Some(root) => replacement.replace("<rootDir>", root),
                    None => replacement.clone(),
                };
                Ok((regex, expansion_template(&replacement)))
            })
            .collect::<TransformResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Rewrite `source` through the first matching rule.
    ///
    /// `$N` in the replacement stands for the N-th capture group.
    pub fn map(&self, source: &str) -> String {
        for (regex, template) in &self.rules {
            if let Some(captures) = regex.captures(source) {
                let mut out = String::new();
                captures.expand(template, &mut out);
                return out;
            }
        }
        source.to_string()
    }

    /// Map `source`, then resolve it like a Sass import from `file`.
    pub fn resolve(&self, source: &str, file: &str, lang: Option<&str>) -> PathBuf {
        resolve_sass(&self.map(source), file, lang)
    }
}

/// Turn a `$N` replacement into a [`regex::Captures::expand`] template.
///
/// Group numbers are braced so `$1abc` keeps its suffix, and any other `$`
/// is literal.
fn expansion_template(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.char_indices();
    while let Some((i, ch)) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }
        let digits = replacement[i + 1..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(replacement.len() - i - 1);
        if digits == 0 {
            out.push_str("$$");
            continue;
        }
        out.push_str("${");
        out.push_str(&replacement[i + 1..i + 1 + digits]);
        out.push('}');
        for _ in 0..digits {
            chars.next();
        }
    }
    out
}

/// Resolve a style import the way Sass tooling does.
///
/// Absolute paths are kept. A `~` prefix looks inside each ancestor
/// `node_modules`, trying partials and the usual style extensions. Anything
/// else is relative to `file`.
pub fn resolve_sass(import: &str, file: &str, lang: Option<&str>) -> PathBuf {
    let path = Path::new(import);
    if path.is_absolute() {
        return path.to_path_buf();
    }

    if let Some(module) = import.strip_prefix('~') {
        let module = Path::new(module);
        let name = module
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = module.parent().unwrap_or_else(|| Path::new(""));
        let candidates = candidate_names(&name, lang);

        let dir = Path::new(file).parent().unwrap_or_else(|| Path::new(""));
        for ancestor in dir.ancestors() {
            let modules = ancestor.join("node_modules");
            for candidate in &candidates {
                let full = modules.join(parent).join(candidate);
                if full.is_file() {
                    return full;
                }
            }
        }
    }

    relative_to(file, import)
}

fn candidate_names(name: &str, lang: Option<&str>) -> Vec<String> {
    if CSS_FAMILY.is_match(name) {
        return vec![name.to_string(), format!("_{}", name)];
    }
    let mut extensions: Vec<&str> = Vec::with_capacity(4);
    for ext in lang.into_iter().chain(SASS_EXTENSIONS) {
        if !extensions.contains(&ext) {
            extensions.push(ext);
        }
    }
    extensions
        .into_iter()
        .flat_map(|ext| [format!("{}.{}", name, ext), format!("_{}.{}", name, ext)])
        .collect()
}

/// Import resolution handed to Sass and SCSS compilers.
#[derive(Debug, Clone)]
pub struct ImportResolver {
    mapper: Arc<ModuleNameMapper>,
    file_path: String,
    lang: Option<String>,
}

impl ImportResolver {
    /// Create a resolver for imports of the style file `file_path`.
    pub fn new(mapper: Arc<ModuleNameMapper>, file_path: &str, lang: Option<&str>) -> Self {
        Self {
            mapper,
            file_path: file_path.to_string(),
            lang: lang.map(String::from),
        }
    }

    /// Resolve `url` imported from `prev`; `stdin` stands for the style file itself.
    pub fn resolve(&self, url: &str, prev: &str) -> PathBuf {
        let from = if prev == "stdin" { self.file_path.as_str() } else { prev };
        self.mapper.resolve(url, from, self.lang.as_deref())
    }
}

/// `@import` lines for the resources configured for `lang`.
pub fn global_resources(resources: &IndexMap<String, Vec<String>>, lang: &str, cwd: &Path) -> String {
    let Some(paths) = resources.get(lang) else {
        return String::new();
    };
    paths
        .iter()
        .map(|resource| {
            let absolute = normalize(&cwd.join(resource));
            match lang {
                "sass" => format!("@import \"{}\"\n", absolute.display()),
                _ => format!("@import \"{}\";\n", absolute.display()),
            }
        })
        .collect()
}

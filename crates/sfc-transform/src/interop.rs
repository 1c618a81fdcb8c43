//! Built-in ECMAScript compiler: module-syntax interop only.
//!
//! The script is parsed as an ES module and only the module declarations
//! found at the top level are rewritten, by byte range. Everything else,
//! template literals and comments included, is copied through untouched.

use std::ops::Range;

use source_map::{LineCol, SourceMap, SourceMapBuilder};
use swc_common::{BytePos, Span, Spanned};
use swc_ecma_ast::{
    Decl, DefaultDecl, EsVersion, ExportAll, ExportDecl, ExportDefaultDecl, ExportSpecifier,
    ImportDecl, ImportSpecifier, Module, ModuleDecl, ModuleItem, NamedExport, ObjectPatProp, Pat,
};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};

use crate::compilers::{CompiledScript, ScriptCompiler, ScriptRequest};
use crate::error::CompileResult;

/// Local name given to the default export in ES module output.
pub const ESM_COMPONENT: &str = "_sfc_main";

const CJS_HEADER: &str =
    "\"use strict\";\nObject.defineProperty(exports, \"__esModule\", { value: true });\n";

/// Byte position of the first source byte. Position 0 is the dummy span.
const START: u32 = 1;

/// Rewrites module syntax so plain component scripts run under the host.
///
/// For CommonJS output, `import` declarations become `require` calls,
/// `export default` becomes `exports.default =` and named exports are
/// assigned to `exports` at the end. For ES module output the default export
/// is bound to a local and re-exported as `export { _sfc_main as default }`.
/// Replacements keep the line count of the text they replace.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleInteropCompiler;

impl ScriptCompiler for ModuleInteropCompiler {
    fn compile(&self, request: ScriptRequest<'_>) -> CompileResult<CompiledScript> {
        let module = parse_module(request.source)?;
        let mut rewrite = Rewrite::new(request.source, request.config.supports_static_esm);
        rewrite.module(&module);
        Ok(rewrite.finish(request.filename))
    }
}

fn parse_module(source: &str) -> CompileResult<Module> {
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::latest(),
        StringInput::new(
            source,
            BytePos(START),
            BytePos(START + source.len() as u32),
        ),
        None,
    );
    let mut parser = Parser::new_from(lexer);
    let module = parser
        .parse_module()
        .map_err(|err| syntax_error(source, err))?;
    if let Some(err) = parser.take_errors().into_iter().next() {
        return Err(syntax_error(source, err).into());
    }
    Ok(module)
}

fn syntax_error(source: &str, err: swc_ecma_parser::error::Error) -> String {
    let offset = err.span().lo.0.saturating_sub(START) as usize;
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let col = before.len() - before.rfind('\n').map_or(0, |i| i + 1) + 1;
    format!("{} ({}:{})", err.kind().msg(), line, col)
}

/// A byte range of the script and the text that replaces it.
#[derive(Debug)]
struct Edit {
    range: Range<usize>,
    text: String,
}

struct Rewrite<'a> {
    source: &'a str,
    esm: bool,
    edits: Vec<Edit>,
    footer: Vec<String>,
    imports: usize,
}

impl<'a> Rewrite<'a> {
    fn new(source: &'a str, esm: bool) -> Self {
        Self {
            source,
            esm,
            edits: Vec::new(),
            footer: Vec::new(),
            imports: 0,
        }
    }

    fn range(&self, span: Span) -> Range<usize> {
        (span.lo.0 - START) as usize..(span.hi.0 - START) as usize
    }

    fn text(&self, span: Span) -> &'a str {
        &self.source[self.range(span)]
    }

    /// The `export default ` (or `export `) keywords in front of `inner`.
    fn prefix(&self, outer: Span, inner: Span) -> Range<usize> {
        (outer.lo.0 - START) as usize..(inner.lo.0 - START) as usize
    }

    /// Replace `range`, keeping its line breaks.
    fn replace(&mut self, range: Range<usize>, text: String) {
        let mut text = text;
        text.extend(self.source[range.clone()].matches('\n').map(|_| '\n'));
        self.edits.push(Edit { range, text });
    }

    fn next_import(&mut self) -> String {
        self.imports += 1;
        format!("_import{}", self.imports)
    }

    fn module(&mut self, module: &Module) {
        for item in &module.body {
            let ModuleItem::ModuleDecl(decl) = item else {
                continue;
            };
            match decl {
                ModuleDecl::ExportDefaultExpr(export) => {
                    let prefix = self.prefix(export.span, export.expr.span());
                    self.export_default_value(prefix);
                }
                ModuleDecl::ExportDefaultDecl(export) => self.export_default_decl(export),
                _ if self.esm => {}
                ModuleDecl::Import(import) => self.import(import),
                ModuleDecl::ExportDecl(export) => self.export_decl(export),
                ModuleDecl::ExportNamed(export) => self.export_named(export),
                ModuleDecl::ExportAll(export) => self.export_all(export),
                _ => {}
            }
        }
    }

    fn export_default_value(&mut self, prefix: Range<usize>) {
        if self.esm {
            self.replace(prefix, format!("const {} = ", ESM_COMPONENT));
            self.default_export(ESM_COMPONENT);
        } else {
            self.replace(prefix, "exports.default = ".to_string());
        }
    }

    fn export_default_decl(&mut self, export: &ExportDefaultDecl) {
        let ident = match &export.decl {
            DefaultDecl::Class(class) => class.ident.as_ref(),
            DefaultDecl::Fn(function) => function.ident.as_ref(),
            _ => return,
        };
        let prefix = self.prefix(export.span, export.decl.span());
        match ident {
            Some(ident) => {
                let name = self.text(ident.span);
                self.replace(prefix, String::new());
                self.default_export(name);
            }
            None => self.export_default_value(prefix),
        }
    }

    fn default_export(&mut self, local: &str) {
        let line = if self.esm {
            format!("export {{ {} as default }}", local)
        } else {
            format!("exports.default = {};", local)
        };
        self.footer.push(line);
    }

    fn import(&mut self, import: &ImportDecl) {
        let range = self.range(import.span);
        if import.type_only {
            self.replace(range, String::new());
            return;
        }
        let src = self.text(import.src.span);
        if import.specifiers.is_empty() {
            self.replace(range, format!("require({});", src));
            return;
        }

        let module = self.next_import();
        let mut line = format!("var {} = require({});", module, src);
        let mut named = Vec::new();
        for specifier in &import.specifiers {
            match specifier {
                ImportSpecifier::Default(default) => line.push_str(&format!(
                    " var {} = {m} && {m}.__esModule ? {m}.default : {m};",
                    self.text(default.local.span),
                    m = module
                )),
                ImportSpecifier::Namespace(namespace) => line.push_str(&format!(
                    " var {} = {};",
                    self.text(namespace.local.span),
                    module
                )),
                ImportSpecifier::Named(specifier) if !specifier.is_type_only => {
                    let local = self.text(specifier.local.span);
                    named.push(match &specifier.imported {
                        Some(imported) => format!("{}: {}", self.text(imported.span()), local),
                        None => local.to_string(),
                    });
                }
                ImportSpecifier::Named(_) => {}
            }
        }
        if !named.is_empty() {
            line.push_str(&format!(" var {{ {} }} = {};", named.join(", "), module));
        }
        self.replace(range, line);
    }

    fn export_decl(&mut self, export: &ExportDecl) {
        let mut names = Vec::new();
        match &export.decl {
            Decl::Class(class) => names.push(self.text(class.ident.span)),
            Decl::Fn(function) => names.push(self.text(function.ident.span)),
            Decl::Var(var) => {
                for declarator in &var.decls {
                    self.binding_names(&declarator.name, &mut names);
                }
            }
            _ => return,
        }
        let prefix = self.prefix(export.span, export.decl.span());
        self.replace(prefix, String::new());
        for name in names {
            self.footer.push(format!("exports.{name} = {name};"));
        }
    }

    fn binding_names(&self, pat: &Pat, names: &mut Vec<&'a str>) {
        match pat {
            Pat::Ident(binding) => names.push(self.text(binding.id.span)),
            Pat::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.binding_names(elem, names);
                }
            }
            Pat::Rest(rest) => self.binding_names(&rest.arg, names),
            Pat::Assign(assign) => self.binding_names(&assign.left, names),
            Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ObjectPatProp::KeyValue(prop) => self.binding_names(&prop.value, names),
                        ObjectPatProp::Assign(prop) => names.push(self.text(prop.key.span())),
                        ObjectPatProp::Rest(rest) => self.binding_names(&rest.arg, names),
                    }
                }
            }
            _ => {}
        }
    }

    fn export_named(&mut self, export: &NamedExport) {
        let range = self.range(export.span);
        if export.type_only {
            self.replace(range, String::new());
            return;
        }
        let module = export.src.as_ref().map(|src| {
            let src = self.text(src.span);
            (self.next_import(), src)
        });

        let mut line = match &module {
            Some((module, src)) => format!("var {} = require({});", module, src),
            None => String::new(),
        };
        for specifier in &export.specifiers {
            let (local, exported) = match specifier {
                ExportSpecifier::Named(named) if !named.is_type_only => {
                    let orig = self.text(named.orig.span());
                    let exported = named
                        .exported
                        .as_ref()
                        .map_or(orig, |exported| self.text(exported.span()));
                    (orig, exported)
                }
                ExportSpecifier::Namespace(namespace) => ("*", self.text(namespace.name.span())),
                ExportSpecifier::Default(default) => ("default", self.text(default.exported.span)),
                ExportSpecifier::Named(_) => continue,
            };
            match &module {
                Some((module, _)) => {
                    let value = if local == "*" {
                        module.clone()
                    } else {
                        member(module, local)
                    };
                    line.push_str(&format!(" {} = {};", member("exports", exported), value));
                }
                None => self
                    .footer
                    .push(format!("{} = {};", member("exports", exported), local)),
            }
        }
        self.replace(range, line.trim_start().to_string());
    }

    fn export_all(&mut self, export: &ExportAll) {
        let range = self.range(export.span);
        if export.type_only {
            self.replace(range, String::new());
            return;
        }
        let src = self.text(export.src.span);
        let module = self.next_import();
        self.replace(
            range,
            format!(
                "var {m} = require({}); Object.keys({m}).forEach(function (k) {{ if (k !== 'default' && !(k in exports)) exports[k] = {m}[k]; }});",
                src,
                m = module
            ),
        );
    }

    fn finish(mut self, filename: &str) -> CompiledScript {
        self.edits.sort_by_key(|edit| edit.range.start);

        let mut writer = MapWriter::new(filename);
        if !self.esm {
            writer.push_unmapped(CJS_HEADER);
        }
        let mut cursor = 0;
        let mut original = LineCol::default();
        for edit in &self.edits {
            writer.push_mapped(&self.source[cursor..edit.range.start], &mut original);
            writer.push_replacement(&edit.text, original);
            for ch in self.source[edit.range.clone()].chars() {
                advance(&mut original, ch);
            }
            cursor = edit.range.end;
        }
        writer.push_mapped(&self.source[cursor..], &mut original);

        if !self.footer.is_empty() {
            if !writer.code.is_empty() && !writer.code.ends_with('\n') {
                writer.push_unmapped("\n");
            }
            for line in &self.footer {
                writer.push_unmapped(line);
                writer.push_unmapped("\n");
            }
        }

        let (code, map) = writer.finish(self.source);
        CompiledScript {
            code,
            map: Some(map),
        }
    }
}

/// `object.name`, or `object["name"]` for string export names.
fn member(object: &str, name: &str) -> String {
    if name.starts_with(['"', '\'']) {
        format!("{}[{}]", object, name)
    } else {
        format!("{}.{}", object, name)
    }
}

fn advance(pos: &mut LineCol, ch: char) {
    if ch == '\n' {
        pos.line += 1;
        pos.col = 0;
    } else {
        pos.col += ch.len_utf16() as u32;
    }
}

/// Output text plus a map with one mapping per token start of copied text.
struct MapWriter<'a> {
    filename: &'a str,
    code: String,
    generated: LineCol,
    builder: SourceMapBuilder,
}

impl<'a> MapWriter<'a> {
    fn new(filename: &'a str) -> Self {
        Self {
            filename,
            code: String::new(),
            generated: LineCol::default(),
            builder: SourceMapBuilder::new(None),
        }
    }

    fn add(&mut self, original: LineCol) {
        self.builder.add(
            self.generated.line,
            self.generated.col,
            original.line,
            original.col,
            Some(self.filename),
            None,
            false,
        );
    }

    fn push_unmapped(&mut self, text: &str) {
        for ch in text.chars() {
            advance(&mut self.generated, ch);
        }
        self.code.push_str(text);
    }

    fn push_mapped(&mut self, text: &str, original: &mut LineCol) {
        let mut after_space = true;
        for ch in text.chars() {
            if after_space && !ch.is_whitespace() {
                self.add(*original);
            }
            after_space = ch.is_whitespace();
            advance(&mut self.generated, ch);
            advance(original, ch);
        }
        self.code.push_str(text);
    }

    fn push_replacement(&mut self, text: &str, original: LineCol) {
        if text.starts_with(|ch: char| !ch.is_whitespace()) {
            self.add(original);
        }
        self.push_unmapped(text);
    }

    fn finish(mut self, source: &str) -> (String, SourceMap) {
        let id = self.builder.add_source(self.filename);
        self.builder.set_source_contents(id, Some(source));
        (self.code, self.builder.into_sourcemap())
    }
}

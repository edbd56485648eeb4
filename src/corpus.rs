//! The declaration graph of the project, as answered by the host type checker.
//!
//! The host checker is an external collaborator: it parses the project and dumps
//! a declaration index (files, imports, top-level declarations and type
//! expressions). This module loads that index and exposes it through
//! [SymbolLookup], the only way the rest of the engine asks cross-file questions.
//!
//! * [SymbolLookup::lookup_in_file] answers "what does this name mean in this file".
//! * [SymbolLookup::follow_import] jumps through one import to the exporting file.
//! * [SymbolLookup::resolve] chains both until an originating declaration is found.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::typeref::{Span, TypeRef};

/// Maximum number of import hops followed before giving up on a name.
const MAX_IMPORT_HOPS: usize = 32;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the project root, with its extension
    pub path: String,
    /// Standard library or other declaration-only file
    #[serde(default)]
    pub library: bool,
    /// Source text, used only to render diagnostics
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub imports: Vec<Import>,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

/// A named import (or re-export) binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    /// Name visible in the importing file
    pub local: String,
    /// Name exported by the target file
    pub imported: String,
    /// Module specifier as written in the source
    pub specifier: String,
    /// Resolved path of the target file
    pub from: String,
    /// `export { x } from "..."`
    #[serde(default)]
    pub exported: bool,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    #[serde(default)]
    pub exported: bool,
    #[serde(default)]
    pub span: Span,
    #[serde(flatten)]
    pub kind: DeclKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DeclKind {
    Class {
        #[serde(default)]
        constructor: Vec<Param>,
    },
    Function {
        #[serde(default)]
        params: Vec<Param>,
        returns: TypeRef,
    },
    Alias {
        target: TypeRef,
    },
    Interface,
    Variable {
        #[serde(rename = "type")]
        ty: TypeRef,
    },
}

/// A constructor or function parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

impl SourceFile {
    /// Declaration-only files never hold user bindings
    pub fn is_library(&self) -> bool {
        self.library || self.path.ends_with(".d.ts")
    }

    /// Path without its extension, the root of every identity declared here
    pub fn module_path(&self) -> &str {
        module_path(&self.path)
    }

    /// File name without directory nor extension
    pub fn stem(&self) -> &str {
        let module = self.module_path();
        module.rsplit('/').next().unwrap_or(module)
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    pub fn import(&self, local: &str) -> Option<&Import> {
        self.imports.iter().find(|i| i.local == local)
    }
}

/// Source extensions, longest first so `.d.ts` wins over `.ts`
const EXTENSIONS: &[&str] = &[
    ".d.ts", ".d.mts", ".d.cts", ".tsx", ".mts", ".cts", ".ts", ".jsx", ".mjs", ".cjs", ".js",
];

/// Strip the source extension (including the `.d` of `.d.ts`) from a path.
///
/// Inner dots belong to the module name: `user.service.ts` is `user.service`.
pub fn module_path(path: &str) -> &str {
    let file_start = path.rfind('/').map_or(0, |i| i + 1);
    let file_name = &path[file_start..];
    EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext).filter(|stem| !stem.is_empty()))
        .map_or(path, |stem| &path[..file_start + stem.len()])
}

/// What a name denotes at the top level of one file
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    Declared(&'a SourceFile, &'a Declaration),
    Imported(&'a SourceFile, &'a Import),
}

/// A declaration found by following imports to its origin
#[derive(Debug, Clone, Copy)]
pub struct Symbol<'a> {
    pub file: &'a SourceFile,
    pub decl: &'a Declaration,
}

impl Symbol<'_> {
    pub fn is_library(&self) -> bool {
        self.file.is_library()
    }
}

/// Cross-file symbol resolution service
///
/// Implemented by [Corpus]; tests and alternative hosts can provide their own.
pub trait SymbolLookup: Sync {
    fn source_file(&self, path: &str) -> Option<&SourceFile>;

    /// Resolve a name against the top-level scope of a single file
    fn lookup_in_file(&self, path: &str, name: &str) -> Option<Lookup<'_>> {
        let file = self.source_file(path)?;
        if let Some(decl) = file.declaration(name) {
            return Some(Lookup::Declared(file, decl));
        }
        file.import(name).map(|i| Lookup::Imported(file, i))
    }

    /// Follow one import to the binding exported under that name by the target file.
    ///
    /// Returns `None` if the target does not export the name.
    fn follow_import(&self, import: &Import) -> Option<Lookup<'_>> {
        let target = self.source_file(&import.from)?;
        if let Some(decl) = target.declaration(&import.imported) {
            return (decl.exported || target.is_library()).then_some(Lookup::Declared(target, decl));
        }
        target
            .imports
            .iter()
            .find(|i| i.exported && i.local == import.imported)
            .map(|i| Lookup::Imported(target, i))
    }

    /// Ambient declarations visible everywhere (library files)
    fn lookup_global(&self, name: &str) -> Option<Symbol<'_>>;

    /// Resolve a name used in a file to its originating declaration.
    fn resolve(&self, path: &str, name: &str) -> Option<Symbol<'_>> {
        let mut current = match self.lookup_in_file(path, name) {
            Some(found) => found,
            None => return self.lookup_global(name),
        };
        for _ in 0..MAX_IMPORT_HOPS {
            match current {
                Lookup::Declared(file, decl) => return Some(Symbol { file, decl }),
                Lookup::Imported(_, import) => current = self.follow_import(import)?,
            }
        }
        None
    }
}

/// Deserialized declaration index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeclarationIndex {
    pub files: Vec<SourceFile>,
}

/// The whole project, indexed by path
#[derive(Debug, Default)]
pub struct Corpus {
    files: Vec<SourceFile>,
    by_path: HashMap<String, usize>,
}

impl Corpus {
    pub fn new(files: Vec<SourceFile>) -> Self {
        let by_path = files
            .iter()
            .enumerate()
            .map(|(i, f)| (f.path.clone(), i))
            .collect();
        Self { files, by_path }
    }

    /// Load a declaration index, filling in missing source text from `root`.
    pub fn load(index: &Path, root: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(index).map_err(|source| Error::Io {
            path: index.to_path_buf(),
            source,
        })?;
        let mut parsed: DeclarationIndex =
            serde_json::from_str(&raw).map_err(|source| Error::Index {
                path: index.to_path_buf(),
                source,
            })?;
        for file in parsed.files.iter_mut().filter(|f| f.text.is_none()) {
            // Text only improves diagnostics, a missing file is not an error here
            file.text = std::fs::read_to_string(root.join(&file.path)).ok();
        }
        tracing::debug!(files = parsed.files.len(), index = %index.display(), "loaded declaration index");
        Ok(Self::new(parsed.files))
    }

    /// All files in index order
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Source files that may declare containers
    pub fn source_files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter().filter(|f| !f.is_library())
    }
}

impl SymbolLookup for Corpus {
    fn source_file(&self, path: &str) -> Option<&SourceFile> {
        self.by_path.get(path).map(|&i| &self.files[i])
    }

    fn lookup_global(&self, name: &str) -> Option<Symbol<'_>> {
        self.files
            .iter()
            .filter(|f| f.is_library())
            .find_map(|file| file.declaration(name).map(|decl| Symbol { file, decl }))
    }
}

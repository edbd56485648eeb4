//! Canonical type identities
//!
//! Two type references are the same binding key iff they denote the same
//! declared entity. Shape is irrelevant: two aliases of `{ url: string }` in
//! different files are different identities, while one alias reached through two
//! different import paths is a single identity.
//!
//! Resolution is an ordered chain of pure strategies, the first one returning a
//! value wins:
//!
//! * [builtin]: keywords, literals and library declarations keep their text.
//! * [user_declaration]: user declarations become `"<origin-module>".Name`.
//! * [generic_wrapper]: `Outer<T>` keeps `Outer` and normalizes `T`.
//! * [composite]: arrays, tuples, unions and object literals are built from the
//!   identities of their parts, so `Config | undefined` is the same key in every
//!   file. Union members are sorted.
//! * [fallback]: anything else is rendered against the referencing file.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::corpus::{module_path, SymbolLookup};
use crate::typeref::{TypeKind, TypeRef};

/// Declaration-site-qualified name of a type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TypeIdentity(String);

impl TypeIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Globals recognized even when the index carries no library files
static WELL_KNOWN_GLOBALS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "Array",
        "ReadonlyArray",
        "Promise",
        "PromiseLike",
        "Map",
        "ReadonlyMap",
        "Set",
        "ReadonlySet",
        "WeakMap",
        "WeakSet",
        "Date",
        "RegExp",
        "Error",
        "Function",
        "Object",
        "String",
        "Number",
        "Boolean",
        "Symbol",
        "BigInt",
        "Record",
        "Partial",
        "Required",
        "Readonly",
        "Pick",
        "Omit",
        "ReturnType",
        "InstanceType",
        "Parameters",
        "Awaited",
        "NonNullable",
        "Uint8Array",
        "ArrayBuffer",
    ]
    .into_iter()
    .collect()
});

/// Whether a name is a global of the host language even without a declaration
pub fn is_well_known_global(name: &str) -> bool {
    WELL_KNOWN_GLOBALS.contains(name)
}

/// Context shared by the strategies
pub struct Resolution<'a> {
    pub lookup: &'a dyn SymbolLookup,
    /// File in which the reference is written
    pub file: &'a str,
}

impl Resolution<'_> {
    /// Resolve a nested reference in the same file.
    pub fn identity(&self, ty: &TypeRef) -> TypeIdentity {
        resolve(ty, self.file, self.lookup)
    }
}

/// A single identity strategy: `None` passes the reference to the next one.
pub type Strategy = fn(&TypeRef, &Resolution<'_>) -> Option<TypeIdentity>;

/// The resolution chain, in priority order. `fallback` must stay last.
pub const STRATEGIES: &[Strategy] = &[builtin, user_declaration, generic_wrapper, composite, fallback];

/// Compute the identity of a type reference written in `file`.
pub fn resolve(ty: &TypeRef, file: &str, lookup: &dyn SymbolLookup) -> TypeIdentity {
    let context = Resolution { lookup, file };
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(ty, &context))
        .unwrap_or_else(|| fallback_identity(ty, file))
}

/// Keywords, literals and anything declared outside of the project sources.
pub fn builtin(ty: &TypeRef, cx: &Resolution<'_>) -> Option<TypeIdentity> {
    match &ty.kind {
        TypeKind::Keyword { name } => Some(TypeIdentity(name.clone())),
        TypeKind::Literal { text } => Some(TypeIdentity(text.clone())),
        TypeKind::Named { name, args } => {
            let is_library = match cx.lookup.resolve(cx.file, name) {
                Some(symbol) => symbol.is_library(),
                None => WELL_KNOWN_GLOBALS.contains(name.as_str()),
            };
            if !is_library {
                return None;
            }
            match args.as_slice() {
                // `Array<T>` and `T[]` are one type
                [element] if name == "Array" => Some(array_identity(element, cx)),
                _ => Some(TypeIdentity(with_args(name, args, cx))),
            }
        }
        _ => None,
    }
}

/// Declarations of the project, rooted at their original file.
pub fn user_declaration(ty: &TypeRef, cx: &Resolution<'_>) -> Option<TypeIdentity> {
    let (name, prefix) = match &ty.kind {
        TypeKind::Named { name, args } if args.is_empty() => (name, ""),
        TypeKind::TypeOf { name } => (name, "typeof "),
        _ => return None,
    };
    let symbol = cx.lookup.resolve(cx.file, name)?;
    if symbol.is_library() {
        return None;
    }
    Some(TypeIdentity(format!(
        "{prefix}\"{}\".{}",
        symbol.file.module_path(),
        symbol.decl.name
    )))
}

/// Single-argument wrappers such as `ReturnType<typeof f>`.
pub fn generic_wrapper(ty: &TypeRef, cx: &Resolution<'_>) -> Option<TypeIdentity> {
    match &ty.kind {
        TypeKind::Named { name, args } if args.len() == 1 => {
            Some(TypeIdentity(format!("{name}<{}>", cx.identity(&args[0]))))
        }
        _ => None,
    }
}

/// Types spelled out inline, keyed by the identities of their parts.
pub fn composite(ty: &TypeRef, cx: &Resolution<'_>) -> Option<TypeIdentity> {
    let text = match &ty.kind {
        TypeKind::Array { element } => return Some(array_identity(element, cx)),
        TypeKind::Tuple { elements } => {
            let elements: Vec<String> = elements.iter().map(|e| cx.identity(e).0).collect();
            format!("[{}]", elements.join(", "))
        }
        TypeKind::Union { members } => {
            let members: BTreeSet<String> = members.iter().map(|m| cx.identity(m).0).collect();
            members.into_iter().collect::<Vec<_>>().join(" | ")
        }
        TypeKind::Object { members } => {
            let members: Vec<String> = members
                .iter()
                .map(|m| {
                    let optional = if m.optional { "?" } else { "" };
                    format!("{}{optional}: {}", m.name, cx.identity(&m.ty))
                })
                .collect();
            format!("{{ {} }}", members.join("; "))
        }
        _ => return None,
    };
    Some(TypeIdentity(text))
}

fn array_identity(element: &TypeRef, cx: &Resolution<'_>) -> TypeIdentity {
    let inner = cx.identity(element);
    match element.kind {
        TypeKind::Union { .. } => TypeIdentity(format!("({inner})[]")),
        _ => TypeIdentity(format!("{inner}[]")),
    }
}

/// Always matches.
pub fn fallback(ty: &TypeRef, cx: &Resolution<'_>) -> Option<TypeIdentity> {
    Some(fallback_identity(ty, cx.file))
}

fn fallback_identity(ty: &TypeRef, file: &str) -> TypeIdentity {
    TypeIdentity(format!("\"{}\".{}", module_path(file), ty))
}

fn with_args(name: &str, args: &[TypeRef], cx: &Resolution<'_>) -> String {
    if args.is_empty() {
        return name.to_string();
    }
    let inner: Vec<String> = args.iter().map(|a| cx.identity(a).0).collect();
    format!("{name}<{}>", inner.join(", "))
}

//! Discovery of container declarations
//!
//! A container is an exported type alias wrapped in one of the configured tags:
//!
//! ```ts
//! export type App = Module<{
//!   dependencies: [Database, Logging];
//!   bindings: { users: Reusable<UserRepository, Users> };
//!   parent: Platform;
//!   provided: { config: AppConfig };
//! }>;
//! ```
//!
//! The scanner only checks the outer grammar. What the bindings mean is decided
//! by the [binding resolver](crate::resolve).

use std::collections::HashSet;

use crate::corpus::{DeclKind, Declaration, SourceFile};
use crate::diagnostics::Diagnostic;
use crate::error::WiringError;
use crate::resolve::Lifecycle;
use crate::typeref::{Member, Span, TypeKind, TypeRef};

/// Tag used when the configuration does not name any
pub const DEFAULT_WRAPPER: &str = "Module";

/// A container declaration as written, before any resolution
#[derive(Debug, Clone)]
pub struct RawContainer {
    pub name: String,
    /// Declaring file
    pub file: String,
    pub span: Span,
    pub dependencies: Vec<TypeRef>,
    pub bindings: Vec<RawBinding>,
    pub parent: Option<TypeRef>,
    pub provided: Vec<RawProvided>,
}

#[derive(Debug, Clone)]
pub struct RawBinding {
    pub name: String,
    /// The lifecycle-tagged expression, `Reusable<Impl>` and friends
    pub ty: TypeRef,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct RawProvided {
    pub name: String,
    pub ty: TypeRef,
    pub span: Span,
}

/// Scan results for one file
#[derive(Debug, Default)]
pub struct Scanned {
    pub containers: Vec<RawContainer>,
    pub errors: Vec<Diagnostic>,
}

/// Recognizes container declarations using the given wrapper names
pub struct Scanner<'a> {
    wrappers: &'a [String],
}

impl<'a> Scanner<'a> {
    pub fn new(wrappers: &'a [String]) -> Self {
        Self { wrappers }
    }

    /// Extract every exported container of a file.
    ///
    /// A malformed declaration is reported and skipped, the rest of the file is
    /// still scanned.
    pub fn scan_file(&self, file: &SourceFile) -> Scanned {
        let mut scanned = Scanned::default();
        for decl in &file.declarations {
            let Some(body) = self.container_body(decl) else {
                continue;
            };
            if !decl.exported {
                tracing::debug!(file = %file.path, name = %decl.name, "skipping non-exported container");
                continue;
            }
            match parse_container(decl, body, &file.path) {
                Ok(container) => {
                    tracing::debug!(
                        file = %file.path,
                        name = %container.name,
                        bindings = container.bindings.len(),
                        dependencies = container.dependencies.len(),
                        "found container"
                    );
                    scanned.containers.push(container);
                }
                Err(error) => scanned.errors.push(error),
            }
        }
        scanned
    }

    /// The argument of `Module<...>` if the declaration is tagged as a container
    fn container_body<'d>(&self, decl: &'d Declaration) -> Option<&'d TypeRef> {
        let DeclKind::Alias { target } = &decl.kind else {
            return None;
        };
        let TypeKind::Named { name, args } = &target.kind else {
            return None;
        };
        if !self.wrappers.iter().any(|w| w == name) {
            return None;
        }
        // A tag with the wrong arity is still a container, reported as malformed
        Some(match args.as_slice() {
            [body] => body,
            _ => target,
        })
    }
}

fn parse_container(decl: &Declaration, body: &TypeRef, file: &str) -> Result<RawContainer, Diagnostic> {
    let malformed = |reason: String, span: Span| {
        Diagnostic::at(
            WiringError::Malformed {
                container: decl.name.clone(),
                reason,
            },
            file,
            span,
        )
    };

    let TypeKind::Object { members } = &body.kind else {
        return Err(malformed(
            format!("expected an object type argument, found {}", body.shape()),
            body.span,
        ));
    };

    let mut container = RawContainer {
        name: decl.name.clone(),
        file: file.to_string(),
        span: decl.span,
        dependencies: Vec::new(),
        bindings: Vec::new(),
        parent: None,
        provided: Vec::new(),
    };
    let mut has_bindings = false;

    for member in members {
        match member.name.as_str() {
            "dependencies" => match &member.ty.kind {
                TypeKind::Tuple { elements } => container.dependencies = elements.clone(),
                _ => {
                    return Err(malformed(
                        format!("`dependencies` must be a tuple, found {}", member.ty.shape()),
                        member.ty.span,
                    ))
                }
            },
            "bindings" => {
                has_bindings = true;
                let fields = object_members(member, &malformed)?;
                for field in fields {
                    if !matches!(field.ty.kind, TypeKind::Named { .. }) {
                        return Err(malformed(
                            format!(
                                "binding `{}` must be Reusable<..>, Transient<..> or Static<..>, found {}",
                                field.name,
                                field.ty.shape()
                            ),
                            field.ty.span,
                        ));
                    }
                    container.bindings.push(RawBinding {
                        name: field.name.clone(),
                        ty: field.ty.clone(),
                        span: field.span,
                    });
                }
            }
            "parent" => match &member.ty.kind {
                TypeKind::Named { .. } => container.parent = Some(member.ty.clone()),
                _ => {
                    return Err(malformed(
                        format!("`parent` must name a container, found {}", member.ty.shape()),
                        member.ty.span,
                    ))
                }
            },
            "provided" => {
                for field in object_members(member, &malformed)? {
                    container.provided.push(RawProvided {
                        name: field.name.clone(),
                        ty: field.ty.clone(),
                        span: field.span,
                    });
                }
            }
            other => {
                return Err(malformed(format!("unexpected property `{other}`"), member.span));
            }
        }
    }

    if !has_bindings {
        return Err(malformed("missing `bindings`".to_string(), decl.span));
    }
    check_member_names(&container, &malformed)?;
    Ok(container)
}

fn object_members<'m>(
    member: &'m Member,
    malformed: &impl Fn(String, Span) -> Diagnostic,
) -> Result<&'m [Member], Diagnostic> {
    match &member.ty.kind {
        TypeKind::Object { members } => Ok(members),
        _ => Err(malformed(
            format!("`{}` must be an object type, found {}", member.name, member.ty.shape()),
            member.ty.span,
        )),
    }
}

/// Binding and provided names become members of the generated class.
fn check_member_names(
    container: &RawContainer,
    malformed: &impl Fn(String, Span) -> Diagnostic,
) -> Result<(), Diagnostic> {
    let mut seen = HashSet::new();
    let names: Vec<(&str, Span)> = container
        .bindings
        .iter()
        .map(|b| (b.name.as_str(), b.span))
        .chain(container.provided.iter().map(|p| (p.name.as_str(), p.span)))
        .collect();
    for &(name, span) in &names {
        if is_reserved(name) {
            return Err(malformed(
                format!("`{name}` is reserved for generated members"),
                span,
            ));
        }
        if !seen.insert(name) {
            return Err(malformed(format!("`{name}` is declared more than once"), span));
        }
    }

    // reusable bindings keep a `_<name>` cache field, statics a `_<name>` constructor field
    let generated: Vec<(String, &str)> = container
        .bindings
        .iter()
        .filter(|b| b.ty.head_name().and_then(Lifecycle::from_wrapper) != Some(Lifecycle::Transient))
        .map(|b| (format!("_{}", b.name), b.name.as_str()))
        .collect();
    for &(name, span) in &names {
        if let Some((_, owner)) = generated.iter().find(|(field, _)| field.as_str() == name) {
            return Err(malformed(
                format!("`{name}` clashes with the field generated for binding `{owner}`"),
                span,
            ));
        }
    }
    Ok(())
}

fn is_reserved(name: &str) -> bool {
    name == "parent"
        || name == "constructor"
        || name
            .strip_prefix("dep")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

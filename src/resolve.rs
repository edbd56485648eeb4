//! Binding resolution rules
//!
//! Each declared binding is turned into a [Binding]: its lifecycle, the identity
//! callers observe, and how the value is built.
//!
//! * `Static<T>` is supplied by whoever constructs the container. `T` is both the
//!   bound and the implementation type, and nothing is constructed.
//! * `Reusable<Impl>` / `Transient<Impl>` bind a class to itself.
//! * `Reusable<Impl, Interface>` / `Transient<Impl, Interface>` bind a class
//!   behind another type.
//! * `Reusable<typeof factory>` binds the return type of a factory function,
//!   spelled `ReturnType<typeof factory>`, unless an interface is given.
//!
//! Implementations must be visible to the generated code: exported by the
//! declaring file, or imported into it.

use std::collections::HashMap;
use std::fmt;

use crate::corpus::{DeclKind, Lookup, Param, Symbol, SymbolLookup};
use crate::diagnostics::Diagnostic;
use crate::error::WiringError;
use crate::identity::{self, TypeIdentity};
use crate::scan::{RawBinding, RawContainer};
use crate::typeref::{Span, TypeKind, TypeRef};

/// How long a produced value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Built once per container instance
    Reusable,
    /// Built on every call
    Transient,
    /// Supplied when the container is constructed
    Static,
}

impl Lifecycle {
    pub fn from_wrapper(name: &str) -> Option<Self> {
        match name {
            "Reusable" => Some(Self::Reusable),
            "Transient" => Some(Self::Transient),
            "Static" => Some(Self::Static),
            _ => None,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Lifecycle::Reusable => "reusable",
            Lifecycle::Transient => "transient",
            Lifecycle::Static => "static",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplementationKind {
    /// Built with `new`
    Class,
    /// Built by calling a function
    Factory,
}

/// What builds the value of a binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Implementation {
    /// Name as written in the container's file
    pub name: String,
    pub identity: TypeIdentity,
    pub kind: ImplementationKind,
    pub params: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub identity: TypeIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub lifecycle: Lifecycle,
    pub bound: TypeIdentity,
    /// The bound type as written in the container's file
    pub bound_type: TypeRef,
    /// `None` for static bindings
    pub implementation: Option<Implementation>,
    pub span: Span,
}

/// A value handed to the container's constructor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedValue {
    pub name: String,
    pub identity: TypeIdentity,
    pub ty: TypeRef,
    pub span: Span,
}

/// The resolved surface of a container
#[derive(Debug, Clone)]
pub struct ResolvedContainer {
    pub name: String,
    pub file: String,
    pub bindings: Vec<Binding>,
    pub provided: Vec<ProvidedValue>,
}

impl ResolvedContainer {
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name == name)
    }
}

/// Resolve every binding of a container, then check that no identity is bound twice.
///
/// All failing bindings are reported, not only the first one.
pub fn resolve_container(
    container: &RawContainer,
    lookup: &dyn SymbolLookup,
) -> Result<ResolvedContainer, Vec<Diagnostic>> {
    let mut errors = Vec::new();
    let mut bindings = Vec::with_capacity(container.bindings.len());
    for raw in &container.bindings {
        match resolve_binding(raw, container, lookup) {
            Ok(binding) => {
                tracing::trace!(
                    container = %container.name,
                    binding = %binding.name,
                    lifecycle = %binding.lifecycle,
                    bound = %binding.bound,
                    "resolved binding"
                );
                bindings.push(binding)
            }
            Err(error) => errors.push(error),
        }
    }
    let provided: Vec<ProvidedValue> = container
        .provided
        .iter()
        .map(|p| ProvidedValue {
            name: p.name.clone(),
            identity: identity::resolve(&p.ty, &container.file, lookup),
            ty: p.ty.clone(),
            span: p.span,
        })
        .collect();

    if let Err(conflict) = check_conflicts(container, &bindings, &provided) {
        errors.push(conflict);
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(ResolvedContainer {
        name: container.name.clone(),
        file: container.file.clone(),
        bindings,
        provided,
    })
}

/// Resolve a single declared binding of `container`.
pub fn resolve_binding(
    raw: &RawBinding,
    container: &RawContainer,
    lookup: &dyn SymbolLookup,
) -> Result<Binding, Diagnostic> {
    let cx = BindingContext {
        raw,
        container,
        lookup,
    };
    let TypeKind::Named { name: wrapper, args } = &raw.ty.kind else {
        return Err(cx.malformed("expected a lifecycle-tagged type", raw.ty.span));
    };
    let lifecycle = Lifecycle::from_wrapper(wrapper).ok_or_else(|| {
        cx.error(
            WiringError::UnknownBindingType {
                container: container.name.clone(),
                binding: raw.name.clone(),
                wrapper: wrapper.clone(),
            },
            raw.ty.span,
        )
    })?;

    match (lifecycle, args.as_slice()) {
        (Lifecycle::Static, [value]) => cx.resolve_static(value),
        (Lifecycle::Static, _) => Err(cx.malformed("Static takes exactly one type argument", raw.ty.span)),
        (lifecycle, [implementation]) => cx.resolve_constructed(lifecycle, implementation, None),
        (lifecycle, [implementation, interface]) => {
            cx.resolve_constructed(lifecycle, implementation, Some(interface))
        }
        (lifecycle, _) => Err(cx.malformed(
            &format!("{lifecycle} bindings take an implementation and an optional interface"),
            raw.ty.span,
        )),
    }
}

struct BindingContext<'a> {
    raw: &'a RawBinding,
    container: &'a RawContainer,
    lookup: &'a dyn SymbolLookup,
}

impl<'a> BindingContext<'a> {
    fn identity(&self, ty: &TypeRef) -> TypeIdentity {
        identity::resolve(ty, &self.container.file, self.lookup)
    }

    fn error(&self, error: WiringError, span: Span) -> Diagnostic {
        // synthesized references carry no position, point at the binding instead
        let span = if span == Span::default() { self.raw.span } else { span };
        Diagnostic::at(error, &self.container.file, span)
    }

    fn malformed(&self, reason: &str, span: Span) -> Diagnostic {
        self.error(
            WiringError::Malformed {
                container: self.container.name.clone(),
                reason: format!("binding `{}`: {reason}", self.raw.name),
            },
            span,
        )
    }

    fn resolve_static(&self, value: &TypeRef) -> Result<Binding, Diagnostic> {
        if let TypeKind::TypeOf { name } = &value.kind {
            return Err(self.error(
                WiringError::StaticTypeof {
                    container: self.container.name.clone(),
                    binding: self.raw.name.clone(),
                    name: name.clone(),
                },
                value.span,
            ));
        }
        Ok(Binding {
            name: self.raw.name.clone(),
            lifecycle: Lifecycle::Static,
            bound: self.identity(value),
            bound_type: value.clone(),
            implementation: None,
            span: self.raw.span,
        })
    }

    fn resolve_constructed(
        &self,
        lifecycle: Lifecycle,
        implementation: &TypeRef,
        interface: Option<&TypeRef>,
    ) -> Result<Binding, Diagnostic> {
        let (name, kind, product) = match &implementation.kind {
            TypeKind::Named { name, args } if args.is_empty() => {
                (name, ImplementationKind::Class, implementation.clone())
            }
            TypeKind::TypeOf { name } => {
                let product = TypeRef::named("ReturnType", vec![implementation.clone()]).at(implementation.span);
                (name, ImplementationKind::Factory, product)
            }
            _ => {
                return Err(self.malformed(
                    &format!(
                        "implementation must be a class name or `typeof` a factory, found {}",
                        implementation.shape()
                    ),
                    implementation.span,
                ))
            }
        };

        let symbol = self.locate(name, implementation.span)?;
        let params = match (&symbol.decl.kind, kind) {
            (DeclKind::Class { constructor }, ImplementationKind::Class) => constructor,
            (DeclKind::Function { params, .. }, ImplementationKind::Factory) => params,
            _ => {
                let expected = match kind {
                    ImplementationKind::Class => "a class",
                    ImplementationKind::Factory => "a function",
                };
                return Err(self.error(
                    WiringError::NotConstructible {
                        container: self.container.name.clone(),
                        binding: self.raw.name.clone(),
                        name: name.clone(),
                        expected,
                    },
                    implementation.span,
                ));
            }
        };

        let bound_type = interface.cloned().unwrap_or(product);
        Ok(Binding {
            name: self.raw.name.clone(),
            lifecycle,
            bound: self.identity(&bound_type),
            bound_type,
            implementation: Some(Implementation {
                name: name.clone(),
                identity: self.identity(implementation),
                kind,
                params: parameters(params, symbol, self.lookup),
            }),
            span: self.raw.span,
        })
    }

    /// Find the implementation's declaration; it must be exported or imported.
    fn locate(&self, name: &str, span: Span) -> Result<Symbol<'a>, Diagnostic> {
        let unresolvable = || {
            self.error(
                WiringError::UnresolvableReference {
                    container: self.container.name.clone(),
                    name: name.to_string(),
                },
                span,
            )
        };
        match self.lookup.lookup_in_file(&self.container.file, name) {
            None => Err(unresolvable()),
            Some(Lookup::Declared(file, decl)) if !decl.exported => Err(self.error(
                WiringError::NotExported {
                    container: self.container.name.clone(),
                    name: name.to_string(),
                    file: file.path.clone(),
                },
                span,
            )),
            Some(Lookup::Declared(file, decl)) => Ok(Symbol { file, decl }),
            Some(Lookup::Imported(..)) => self
                .lookup
                .resolve(&self.container.file, name)
                .ok_or_else(unresolvable),
        }
    }
}

/// Parameter identities are resolved where the implementation is declared.
fn parameters(params: &[Param], symbol: Symbol<'_>, lookup: &dyn SymbolLookup) -> Vec<Parameter> {
    params
        .iter()
        .map(|p| Parameter {
            name: p.name.clone(),
            identity: identity::resolve(&p.ty, &symbol.file.path, lookup),
        })
        .collect()
}

/// No two bindings (or provided values) may share a bound identity.
fn check_conflicts(
    container: &RawContainer,
    bindings: &[Binding],
    provided: &[ProvidedValue],
) -> Result<(), Diagnostic> {
    let mut seen: HashMap<&TypeIdentity, &str> = HashMap::new();
    let entries = bindings
        .iter()
        .map(|b| (&b.bound, b.name.as_str(), b.span))
        .chain(provided.iter().map(|p| (&p.identity, p.name.as_str(), p.span)));
    for (identity, name, span) in entries {
        if let Some(first) = seen.insert(identity, name) {
            return Err(Diagnostic::at(
                WiringError::BindingConflict {
                    container: container.name.clone(),
                    first: first.to_string(),
                    second: name.to_string(),
                    identity: identity.to_string(),
                },
                &container.file,
                span,
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::scan::Scanner;
    use crate::tests::fixture::*;

    fn resolve_first(corpus: &Corpus) -> Result<ResolvedContainer, Vec<Diagnostic>> {
        let wrappers = vec!["Module".to_string()];
        let scanned = Scanner::new(&wrappers).scan_file(corpus.source_file("src/app.ts").unwrap());
        assert!(scanned.errors.is_empty(), "{:?}", scanned.errors);
        resolve_container(&scanned.containers[0], corpus)
    }

    fn app(bindings: Vec<(&str, TypeRef)>) -> TypeRef {
        module(vec![("bindings", object(bindings))])
    }

    fn services() -> SourceFileBuilder {
        file("src/services.ts")
            .interface("Users", true)
            .class("Clock", true, vec![])
            .class("UserRepo", true, vec![("clock", ty("Clock"))])
            .function("connect", true, vec![("clock", ty("Clock"))], ty("Clock"))
    }

    #[test]
    fn resolves_lifecycles_and_identities() {
        let corpus = Corpus::new(vec![
            services().build(),
            file("src/app.ts")
                .import("Users", "./services", "src/services.ts")
                .import("UserRepo", "./services", "src/services.ts")
                .import("Clock", "./services", "src/services.ts")
                .import("connect", "./services", "src/services.ts")
                .alias(
                    "App",
                    true,
                    app(vec![
                        ("users", reusable_as(ty("UserRepo"), ty("Users"))),
                        ("clock", static_(ty("Clock"))),
                        ("db", transient(type_of("connect"))),
                    ]),
                )
                .build(),
        ]);
        let resolved = resolve_first(&corpus).unwrap();

        let users = resolved.binding("users").unwrap();
        assert_eq!(users.lifecycle, Lifecycle::Reusable);
        assert_eq!(users.bound.as_str(), "\"src/services\".Users");
        let implementation = users.implementation.as_ref().unwrap();
        assert_eq!(implementation.identity.as_str(), "\"src/services\".UserRepo");
        assert_eq!(implementation.kind, ImplementationKind::Class);
        assert_eq!(implementation.params[0].identity.as_str(), "\"src/services\".Clock");

        let clock = resolved.binding("clock").unwrap();
        assert_eq!(clock.lifecycle, Lifecycle::Static);
        assert!(clock.implementation.is_none());
        assert_eq!(clock.bound.as_str(), "\"src/services\".Clock");

        let db = resolved.binding("db").unwrap();
        assert_eq!(db.lifecycle, Lifecycle::Transient);
        assert_eq!(db.bound.as_str(), "ReturnType<typeof \"src/services\".connect>");
        assert_eq!(db.bound_type.to_string(), "ReturnType<typeof connect>");
        assert_eq!(db.implementation.as_ref().unwrap().kind, ImplementationKind::Factory);
    }

    #[test]
    fn unknown_wrapper_is_an_error() {
        let corpus = Corpus::new(vec![file("src/app.ts")
            .class("Widget", true, vec![])
            .alias("App", true, app(vec![("widget", generic("Singleton", vec![ty("Widget")]))]))
            .build()]);
        let errors = resolve_first(&corpus).unwrap_err();
        assert_eq!(
            errors[0].error,
            WiringError::UnknownBindingType {
                container: "App".into(),
                binding: "widget".into(),
                wrapper: "Singleton".into(),
            }
        );
    }

    #[test]
    fn static_typeof_is_rejected() {
        let corpus = Corpus::new(vec![file("src/app.ts")
            .function("connect", true, vec![], kw("void"))
            .alias("App", true, app(vec![("db", static_(type_of("connect")))]))
            .build()]);
        let errors = resolve_first(&corpus).unwrap_err();
        assert!(matches!(errors[0].error, WiringError::StaticTypeof { .. }));
    }

    #[test]
    fn implementation_must_be_exported() {
        let corpus = Corpus::new(vec![file("src/app.ts")
            .class("Widget", false, vec![])
            .alias("App", true, app(vec![("widget", reusable(ty("Widget")))]))
            .build()]);
        let errors = resolve_first(&corpus).unwrap_err();
        assert_eq!(
            errors[0].error.to_string(),
            "`Widget` is used by `App` but is not exported from src/app.ts, add `export` to its declaration"
        );
    }

    #[test]
    fn missing_implementation_is_unresolvable() {
        let corpus = Corpus::new(vec![file("src/app.ts")
            .alias("App", true, app(vec![("widget", reusable(ty("Widget")))]))
            .build()]);
        let errors = resolve_first(&corpus).unwrap_err();
        assert!(matches!(
            &errors[0].error,
            WiringError::UnresolvableReference { name, .. } if name == "Widget"
        ));
    }

    #[test]
    fn interfaces_are_not_constructible() {
        let corpus = Corpus::new(vec![
            services().build(),
            file("src/app.ts")
                .import("Users", "./services", "src/services.ts")
                .alias("App", true, app(vec![("users", reusable(ty("Users")))]))
                .build(),
        ]);
        let errors = resolve_first(&corpus).unwrap_err();
        assert!(matches!(
            &errors[0].error,
            WiringError::NotConstructible { expected: "a class", .. }
        ));
    }

    #[test]
    fn conflict_names_both_bindings() {
        let corpus = Corpus::new(vec![file("src/app.ts")
            .class("Widget", true, vec![])
            .alias(
                "App",
                true,
                app(vec![
                    ("first", reusable(ty("Widget"))),
                    ("second", transient(ty("Widget"))),
                ]),
            )
            .build()]);
        let errors = resolve_first(&corpus).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].error,
            WiringError::BindingConflict {
                container: "App".into(),
                first: "first".into(),
                second: "second".into(),
                identity: "\"src/app\".Widget".into(),
            }
        );
    }

    #[test]
    fn every_failing_binding_is_reported() {
        let corpus = Corpus::new(vec![file("src/app.ts")
            .alias(
                "App",
                true,
                app(vec![
                    ("a", reusable(ty("Missing"))),
                    ("b", generic("Lazy", vec![ty("Missing")])),
                ]),
            )
            .build()]);
        let errors = resolve_first(&corpus).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}

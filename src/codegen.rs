//! Emission of the generated units
//!
//! One unit is produced per source file declaring containers. For a container
//! `App` it holds `export class AppImpl implements App` with:
//!
//! * a private nullable cache field per reusable binding,
//! * a constructor taking, in order, the dependencies (`dep0`, `dep1`, ...),
//!   the static values, the provided values and the parent,
//! * one method per binding.
//!
//! Output depends only on its input: the same resolved containers always give
//! the same bytes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use crate::corpus::{Lookup, SourceFile, SymbolLookup};
use crate::diagnostics::Diagnostic;
use crate::error::WiringError;
use crate::identity;
use crate::inject::{Construction, Method, MethodBody, Provision};
use crate::resolve::ImplementationKind;
use crate::scan::RawContainer;
use crate::typeref::{Span, TypeRef};

const INDENT: &str = "  ";

/// Everything needed to emit one container
#[derive(Debug, Clone, Copy)]
pub struct ContainerUnit<'a> {
    pub container: &'a RawContainer,
    pub methods: &'a [Method],
}

/// Name of the generated class for a container
pub fn class_name(container: &str) -> String {
    format!("{container}Impl")
}

/// Emit the generated unit for all containers declared in `source`.
pub fn emit(
    source: &SourceFile,
    units: &[ContainerUnit<'_>],
    lookup: &dyn SymbolLookup,
) -> Result<String, Vec<Diagnostic>> {
    let imports = plan_imports(source, units, lookup)?;

    let mut out = String::new();
    let file_name = source.path.rsplit('/').next().unwrap_or(&source.path);
    let _ = writeln!(out, "// Generated by wirekit from {file_name}. Do not edit.");
    if !imports.is_empty() {
        out.push('\n');
    }
    for (specifier, names) in &imports {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let _ = writeln!(out, "import {{ {} }} from \"{specifier}\";", names.join(", "));
    }
    for unit in units {
        out.push('\n');
        emit_class(&mut out, unit);
    }
    Ok(out)
}

fn emit_class(out: &mut String, unit: &ContainerUnit<'_>) {
    let container = unit.container;
    let _ = writeln!(
        out,
        "export class {} implements {} {{",
        class_name(&container.name),
        container.name
    );

    let cached: Vec<&Method> = unit
        .methods
        .iter()
        .filter(|m| matches!(m.body, MethodBody::Reusable(_)))
        .collect();
    for method in &cached {
        let _ = writeln!(
            out,
            "{INDENT}private _{}: {} | null = null;",
            method.name, method.return_type
        );
    }
    if !cached.is_empty() {
        out.push('\n');
    }

    let params = constructor_params(unit);
    if params.is_empty() {
        let _ = writeln!(out, "{INDENT}constructor() {{}}");
    } else {
        let _ = writeln!(out, "{INDENT}constructor(");
        for (name, ty) in params {
            let _ = writeln!(out, "{INDENT}{INDENT}private readonly {name}: {ty},");
        }
        let _ = writeln!(out, "{INDENT}) {{}}");
    }

    for method in unit.methods {
        out.push('\n');
        emit_method(out, method);
    }
    out.push_str("}\n");
}

/// `(field name, type)` in constructor order
fn constructor_params<'a>(unit: &ContainerUnit<'a>) -> Vec<(String, &'a TypeRef)> {
    let container = unit.container;
    let mut params: Vec<(String, &TypeRef)> = container
        .dependencies
        .iter()
        .enumerate()
        .map(|(i, dep)| (format!("dep{i}"), dep))
        .collect();
    params.extend(
        unit.methods
            .iter()
            .filter(|m| m.body == MethodBody::Static)
            .map(|m| (format!("_{}", m.name), &m.return_type)),
    );
    params.extend(container.provided.iter().map(|p| (p.name.clone(), &p.ty)));
    params.extend(container.parent.iter().map(|p| ("parent".to_string(), p)));
    params
}

fn emit_method(out: &mut String, method: &Method) {
    let name = &method.name;
    let _ = writeln!(out, "{INDENT}{name}(): {} {{", method.return_type);
    match &method.body {
        MethodBody::Static => {
            let _ = writeln!(out, "{INDENT}{INDENT}return this._{name};");
        }
        MethodBody::Reusable(construction) => {
            let _ = writeln!(out, "{INDENT}{INDENT}if (this._{name} === null) {{");
            let _ = writeln!(
                out,
                "{INDENT}{INDENT}{INDENT}this._{name} = {};",
                construct(construction)
            );
            let _ = writeln!(out, "{INDENT}{INDENT}}}");
            let _ = writeln!(out, "{INDENT}{INDENT}return this._{name};");
        }
        MethodBody::Transient(construction) => {
            let _ = writeln!(out, "{INDENT}{INDENT}return {};", construct(construction));
        }
    }
    let _ = writeln!(out, "{INDENT}}}");
}

fn construct(construction: &Construction) -> String {
    let args: Vec<String> = construction.args.iter().map(provision).collect();
    let args = args.join(", ");
    match construction.kind {
        ImplementationKind::Class => format!("new {}({args})", construction.implementation),
        ImplementationKind::Factory => format!("{}({args})", construction.implementation),
    }
}

fn provision(provision: &Provision) -> String {
    match provision {
        Provision::Local(name) => format!("this.{name}()"),
        Provision::Provided(name) => format!("this.{name}"),
        Provision::Dependency { index, binding } => format!("this.dep{index}.{binding}()"),
        Provision::Parent(binding) => format!("this.parent.{binding}()"),
    }
}

/// Imports keyed by module specifier, each a sorted set of import clauses.
type ImportPlan = BTreeMap<String, BTreeSet<String>>;

/// Import every referenced name the way the source file sees it.
fn plan_imports(
    source: &SourceFile,
    units: &[ContainerUnit<'_>],
    lookup: &dyn SymbolLookup,
) -> Result<ImportPlan, Vec<Diagnostic>> {
    let mut plan = ImportPlan::new();
    let mut errors = Vec::new();
    let local_specifier = format!("./{}", source.stem());

    for unit in units {
        let container = unit.container;
        let mut names: Vec<(String, Span)> = vec![(container.name.clone(), container.span)];
        let mut collect = |ty: &TypeRef, span: Span| {
            // references synthesized by the resolver have no position of their own
            let span = if ty.span == Span::default() { span } else { ty.span };
            ty.for_each_name(&mut |name, _| names.push((name.to_string(), span)));
        };
        for dep in &container.dependencies {
            collect(dep, container.span);
        }
        for provided in &container.provided {
            collect(&provided.ty, provided.span);
        }
        if let Some(parent) = &container.parent {
            collect(parent, container.span);
        }
        for (method, binding) in unit.methods.iter().zip(&container.bindings) {
            collect(&method.return_type, binding.span);
        }
        for (method, binding) in unit.methods.iter().zip(&container.bindings) {
            if let MethodBody::Reusable(c) | MethodBody::Transient(c) = &method.body {
                names.push((c.implementation.clone(), binding.span));
            }
        }

        let mut reported = BTreeSet::new();
        for (name, span) in &names {
            let (name, span) = (name.as_str(), *span);
            match lookup.lookup_in_file(&source.path, name) {
                Some(Lookup::Declared(_, decl)) if decl.exported => {
                    plan.entry(local_specifier.clone())
                        .or_default()
                        .insert(name.to_string());
                }
                Some(Lookup::Declared(file, _)) => {
                    if reported.insert(name) {
                        errors.push(Diagnostic::at(
                            WiringError::NotExported {
                                container: container.name.clone(),
                                name: name.to_string(),
                                file: file.path.clone(),
                            },
                            &source.path,
                            span,
                        ));
                    }
                }
                Some(Lookup::Imported(_, import)) => {
                    let clause = if import.imported == import.local {
                        import.local.clone()
                    } else {
                        format!("{} as {}", import.imported, import.local)
                    };
                    plan.entry(import.specifier.clone()).or_default().insert(clause);
                }
                None => {
                    let global = lookup.lookup_global(name).is_some() || identity::is_well_known_global(name);
                    if !global && reported.insert(name) {
                        errors.push(Diagnostic::at(
                            WiringError::UnresolvableReference {
                                container: container.name.clone(),
                                name: name.to_string(),
                            },
                            &source.path,
                            span,
                        ));
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(plan)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Corpus;
    use crate::inject::{synthesize, Scope};
    use crate::resolve::resolve_container;
    use crate::scan::Scanner;
    use crate::tests::fixture::*;

    /// Scan, resolve and emit a single-container file without dependencies.
    fn generate(corpus: &Corpus, path: &str) -> Result<String, Vec<Diagnostic>> {
        let wrappers = vec!["Module".to_string()];
        let source = corpus.source_file(path).unwrap();
        let scanned = Scanner::new(&wrappers).scan_file(source);
        let raw = &scanned.containers[0];
        let resolved = resolve_container(raw, corpus)?;
        let methods = synthesize(&Scope::new(&resolved, &[], None))?;
        emit(
            source,
            &[ContainerUnit {
                container: raw,
                methods: &methods,
            }],
            corpus,
        )
    }

    #[test]
    fn emits_memoized_reusable_binding() {
        let corpus = Corpus::new(vec![file("src/main.ts")
            .class("Widget", true, vec![])
            .alias("Main", true, module(vec![("bindings", object(vec![("widget", reusable(ty("Widget")))]))]))
            .build()]);

        let expected = r#"// Generated by wirekit from main.ts. Do not edit.

import { Main, Widget } from "./main";

export class MainImpl implements Main {
  private _widget: Widget | null = null;

  constructor() {}

  widget(): Widget {
    if (this._widget === null) {
      this._widget = new Widget();
    }
    return this._widget;
  }
}
"#;
        assert_eq!(generate(&corpus, "src/main.ts").unwrap(), expected);
    }

    #[test]
    fn emits_statics_provided_and_factories() {
        let corpus = Corpus::new(vec![
            file("src/db.ts")
                .interface("Config", true)
                .function("connect", true, vec![("config", ty("Config"))], ty("Config"))
                .class("Clock", true, vec![])
                .class("Repo", true, vec![("db", generic("ReturnType", vec![type_of("connect")])), ("clock", ty("Clock"))])
                .build(),
            file("src/app.ts")
                .import("Config", "./db", "src/db.ts")
                .import_as("Time", "Clock", "./db", "src/db.ts")
                .import("connect", "./db", "src/db.ts")
                .import("Repo", "./db", "src/db.ts")
                .alias(
                    "App",
                    true,
                    module(vec![
                        (
                            "bindings",
                            object(vec![
                                ("clock", static_(ty("Time"))),
                                ("db", transient(type_of("connect"))),
                                ("repo", transient(ty("Repo"))),
                            ]),
                        ),
                        ("provided", object(vec![("config", ty("Config"))])),
                    ]),
                )
                .build(),
        ]);

        let expected = r#"// Generated by wirekit from app.ts. Do not edit.

import { App } from "./app";
import { Clock as Time, Config, Repo, connect } from "./db";

export class AppImpl implements App {
  constructor(
    private readonly _clock: Time,
    private readonly config: Config,
  ) {}

  clock(): Time {
    return this._clock;
  }

  db(): ReturnType<typeof connect> {
    return connect(this.config);
  }

  repo(): Repo {
    return new Repo(this.db(), this.clock());
  }
}
"#;
        assert_eq!(generate(&corpus, "src/app.ts").unwrap(), expected);
    }

    #[test]
    fn unexported_referenced_types_are_reported() {
        let corpus = Corpus::new(vec![file("src/app.ts")
            .interface("Clock", false)
            .alias("App", true, module(vec![("bindings", object(vec![("clock", static_(ty("Clock")))]))]))
            .build()]);
        let errors = generate(&corpus, "src/app.ts").unwrap_err();
        assert!(matches!(
            &errors[0].error,
            WiringError::NotExported { name, .. } if name == "Clock"
        ));
    }

    #[test]
    fn output_is_deterministic() {
        let corpus = Corpus::new(vec![file("src/main.ts")
            .class("B", true, vec![])
            .class("A", true, vec![("b", ty("B"))])
            .alias(
                "Main",
                true,
                module(vec![("bindings", object(vec![("a", transient(ty("A"))), ("b", reusable(ty("B")))]))]),
            )
            .build()]);
        let first = generate(&corpus, "src/main.ts").unwrap();
        let second = generate(&corpus, "src/main.ts").unwrap();
        assert_eq!(first, second);
    }
}

//! Constructor parameter injection
//!
//! For every constructed binding, each parameter of its implementation is
//! matched by identity against the providers visible to the container, in a
//! fixed order:
//!
//! 1. the other bindings of the same container,
//! 2. the values provided to the container's constructor,
//! 3. the dependencies, in declared tuple order, addressed by position,
//! 4. the parent container.
//!
//! The first match wins. A parameter matched by none of them fails the whole
//! container: nothing is defaulted.
//!
//! Dependencies only contribute their public surface (binding names and bound
//! identities); their own construction is their business.

use crate::diagnostics::Diagnostic;
use crate::error::WiringError;
use crate::identity::TypeIdentity;
use crate::resolve::{Binding, ImplementationKind, Lifecycle, ResolvedContainer};
use crate::typeref::TypeRef;

/// Where the value of a parameter comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provision {
    /// Another binding of this container: `this.<name>()`
    Local(String),
    /// A constructor-provided value: `this.<name>`
    Provided(String),
    /// A binding of the dependency at this tuple position: `this.dep<i>.<binding>()`
    Dependency { index: usize, binding: String },
    /// A binding of the parent container: `this.parent.<binding>()`
    Parent(String),
}

/// How a constructed value is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Construction {
    pub implementation: String,
    pub kind: ImplementationKind,
    pub args: Vec<Provision>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodBody {
    /// Return the field set by the constructor
    Static,
    /// Build on first call, then return the cached value
    Reusable(Construction),
    /// Build on every call
    Transient(Construction),
}

/// One generated method, named after its binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub return_type: TypeRef,
    pub body: MethodBody,
}

/// Providers visible from one container, in resolution order
pub struct Scope<'a> {
    container: &'a ResolvedContainer,
    dependencies: &'a [&'a ResolvedContainer],
    parent: Option<&'a ResolvedContainer>,
}

impl<'a> Scope<'a> {
    pub fn new(
        container: &'a ResolvedContainer,
        dependencies: &'a [&'a ResolvedContainer],
        parent: Option<&'a ResolvedContainer>,
    ) -> Self {
        Self {
            container,
            dependencies,
            parent,
        }
    }

    /// Find the provider of `identity` for the binding named `requester`.
    ///
    /// A binding never provides its own parameters.
    pub fn provider(&self, identity: &TypeIdentity, requester: &str) -> Option<Provision> {
        if let Some(local) = self
            .container
            .bindings
            .iter()
            .find(|b| b.name != requester && &b.bound == identity)
        {
            return Some(Provision::Local(local.name.clone()));
        }
        if let Some(provided) = self.container.provided.iter().find(|p| &p.identity == identity) {
            return Some(Provision::Provided(provided.name.clone()));
        }
        for (index, dependency) in self.dependencies.iter().enumerate() {
            if let Some(binding) = exposed(dependency, identity) {
                return Some(Provision::Dependency {
                    index,
                    binding: binding.name.clone(),
                });
            }
        }
        self.parent
            .and_then(|parent| exposed(parent, identity))
            .map(|binding| Provision::Parent(binding.name.clone()))
    }
}

fn exposed<'c>(container: &'c ResolvedContainer, identity: &TypeIdentity) -> Option<&'c Binding> {
    container.bindings.iter().find(|b| &b.bound == identity)
}

/// Decide how every binding of the scope's container is produced.
///
/// Every unresolved parameter is reported. Bindings that depend on themselves
/// through other local bindings are rejected.
pub fn synthesize(scope: &Scope<'_>) -> Result<Vec<Method>, Vec<Diagnostic>> {
    let container = scope.container;
    let mut errors = Vec::new();
    let mut methods = Vec::with_capacity(container.bindings.len());

    for binding in &container.bindings {
        let body = match (&binding.implementation, binding.lifecycle) {
            (None, _) | (_, Lifecycle::Static) => MethodBody::Static,
            (Some(implementation), lifecycle) => {
                let mut args = Vec::with_capacity(implementation.params.len());
                for param in &implementation.params {
                    match scope.provider(&param.identity, &binding.name) {
                        Some(provision) => {
                            tracing::trace!(
                                container = %container.name,
                                binding = %binding.name,
                                parameter = %param.name,
                                provision = ?provision,
                                "resolved parameter"
                            );
                            args.push(provision)
                        }
                        None => errors.push(Diagnostic::at(
                            WiringError::UnresolvedParameter {
                                container: container.name.clone(),
                                implementation: implementation.name.clone(),
                                parameter: param.name.clone(),
                                identity: param.identity.to_string(),
                            },
                            &container.file,
                            binding.span,
                        )),
                    }
                }
                let construction = Construction {
                    implementation: implementation.name.clone(),
                    kind: implementation.kind,
                    args,
                };
                match lifecycle {
                    Lifecycle::Transient => MethodBody::Transient(construction),
                    _ => MethodBody::Reusable(construction),
                }
            }
        };
        methods.push(Method {
            name: binding.name.clone(),
            return_type: binding.bound_type.clone(),
            body,
        });
    }

    if errors.is_empty() {
        if let Some(cycle) = find_self_dependency(&methods) {
            let span = container.bindings[cycle[0]].span;
            let path: Vec<&str> = cycle.iter().map(|&i| methods[i].name.as_str()).collect();
            errors.push(Diagnostic::at(
                WiringError::BindingCycle {
                    container: container.name.clone(),
                    path: path.join(" -> "),
                },
                &container.file,
                span,
            ));
        }
    }
    if errors.is_empty() {
        Ok(methods)
    } else {
        Err(errors)
    }
}

/// Local calls between methods must not loop back, or the generated code would
/// recurse forever on first use.
fn find_self_dependency(methods: &[Method]) -> Option<Vec<usize>> {
    let edges: Vec<Vec<usize>> = methods
        .iter()
        .map(|method| {
            let args = match &method.body {
                MethodBody::Static => return Vec::new(),
                MethodBody::Reusable(c) | MethodBody::Transient(c) => &c.args,
            };
            args.iter()
                .filter_map(|arg| match arg {
                    Provision::Local(name) => methods.iter().position(|m| &m.name == name),
                    _ => None,
                })
                .collect()
        })
        .collect();

    let mut on_stack = vec![false; methods.len()];
    let mut done = vec![false; methods.len()];
    let mut stack = Vec::new();
    (0..methods.len()).find_map(|start| walk(start, &edges, &mut on_stack, &mut done, &mut stack))
}

fn walk(
    node: usize,
    edges: &[Vec<usize>],
    on_stack: &mut [bool],
    done: &mut [bool],
    stack: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    if on_stack[node] {
        let start = stack.iter().position(|&n| n == node).unwrap_or(0);
        let mut cycle = stack[start..].to_vec();
        cycle.push(node);
        return Some(cycle);
    }
    if done[node] {
        return None;
    }
    on_stack[node] = true;
    stack.push(node);
    for &next in &edges[node] {
        if let Some(cycle) = walk(next, edges, on_stack, done, stack) {
            return Some(cycle);
        }
    }
    stack.pop();
    on_stack[node] = false;
    done[node] = true;
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{Implementation, Parameter, ProvidedValue};
    use crate::tests::fixture::*;
    use crate::typeref::Span;

    fn id(text: &str) -> TypeIdentity {
        crate::identity::resolve(&ty(text), "src/types.ts", &crate::corpus::Corpus::default())
    }

    fn constructed(name: &str, lifecycle: Lifecycle, bound: &str, params: &[&str]) -> Binding {
        Binding {
            name: name.to_string(),
            lifecycle,
            bound: id(bound),
            bound_type: ty(bound),
            implementation: Some(Implementation {
                name: bound.to_string(),
                identity: id(bound),
                kind: ImplementationKind::Class,
                params: params
                    .iter()
                    .map(|p| Parameter {
                        name: p.to_lowercase(),
                        identity: id(p),
                    })
                    .collect(),
            }),
            span: Span::default(),
        }
    }

    fn container(name: &str, bindings: Vec<Binding>) -> ResolvedContainer {
        ResolvedContainer {
            name: name.to_string(),
            file: "src/app.ts".to_string(),
            bindings,
            provided: Vec::new(),
        }
    }

    fn args(methods: &[Method], name: &str) -> Vec<Provision> {
        match &methods.iter().find(|m| m.name == name).unwrap().body {
            MethodBody::Reusable(c) | MethodBody::Transient(c) => c.args.clone(),
            MethodBody::Static => vec![],
        }
    }

    #[test]
    fn local_binding_wins_over_dependency() {
        let db = container("Db", vec![constructed("logger", Lifecycle::Reusable, "Logger", &[])]);
        let app = container(
            "App",
            vec![
                constructed("repo", Lifecycle::Transient, "Repo", &["Logger"]),
                constructed("log", Lifecycle::Reusable, "Logger", &[]),
            ],
        );
        let deps = [&db];
        let methods = synthesize(&Scope::new(&app, &deps, None)).unwrap();
        assert_eq!(args(&methods, "repo"), vec![Provision::Local("log".into())]);
    }

    #[test]
    fn first_dependency_in_tuple_order_wins() {
        let first = container("First", vec![constructed("a", Lifecycle::Reusable, "Logger", &[])]);
        let second = container("Second", vec![constructed("b", Lifecycle::Reusable, "Logger", &[])]);
        let app = container("App", vec![constructed("repo", Lifecycle::Reusable, "Repo", &["Logger"])]);

        let deps = [&second, &first];
        let methods = synthesize(&Scope::new(&app, &deps, None)).unwrap();
        assert_eq!(
            args(&methods, "repo"),
            vec![Provision::Dependency {
                index: 0,
                binding: "b".into()
            }]
        );
    }

    #[test]
    fn provided_values_and_parent_are_searched_last() {
        let parent = container("Platform", vec![constructed("clock", Lifecycle::Reusable, "Clock", &[])]);
        let mut app = container(
            "App",
            vec![constructed("repo", Lifecycle::Reusable, "Repo", &["Config", "Clock"])],
        );
        app.provided.push(ProvidedValue {
            name: "config".into(),
            identity: id("Config"),
            ty: ty("Config"),
            span: Span::default(),
        });
        let methods = synthesize(&Scope::new(&app, &[], Some(&parent))).unwrap();
        assert_eq!(
            args(&methods, "repo"),
            vec![Provision::Provided("config".into()), Provision::Parent("clock".into())]
        );
    }

    #[test]
    fn a_binding_does_not_provide_itself() {
        // a decorator wraps the dependency's logger behind the same type
        let logs = container("Logs", vec![constructed("logger", Lifecycle::Reusable, "Logger", &[])]);
        let app = container("App", vec![constructed("logger", Lifecycle::Reusable, "Logger", &["Logger"])]);
        let deps = [&logs];
        let methods = synthesize(&Scope::new(&app, &deps, None)).unwrap();
        assert_eq!(
            args(&methods, "logger"),
            vec![Provision::Dependency {
                index: 0,
                binding: "logger".into()
            }]
        );
    }

    #[test]
    fn unresolved_parameter_names_container_implementation_and_parameter() {
        let app = container("App", vec![constructed("repo", Lifecycle::Reusable, "Repo", &["Database"])]);
        let errors = synthesize(&Scope::new(&app, &[], None)).unwrap_err();
        assert_eq!(
            errors[0].error,
            WiringError::UnresolvedParameter {
                container: "App".into(),
                implementation: "Repo".into(),
                parameter: "database".into(),
                identity: "\"src/types\".Database".into(),
            }
        );
    }

    #[test]
    fn binding_cycles_are_rejected() {
        let app = container(
            "App",
            vec![
                constructed("a", Lifecycle::Reusable, "A", &["B"]),
                constructed("b", Lifecycle::Transient, "B", &["C"]),
                constructed("c", Lifecycle::Reusable, "C", &["A"]),
            ],
        );
        let errors = synthesize(&Scope::new(&app, &[], None)).unwrap_err();
        assert_eq!(
            errors[0].error,
            WiringError::BindingCycle {
                container: "App".into(),
                path: "a -> b -> c -> a".into(),
            }
        );
    }

    #[test]
    fn static_bindings_are_never_constructed() {
        let mut clock = constructed("clock", Lifecycle::Static, "Clock", &[]);
        clock.implementation = None;
        let app = container("App", vec![clock]);
        let methods = synthesize(&Scope::new(&app, &[], None)).unwrap();
        assert_eq!(methods[0].body, MethodBody::Static);
    }
}

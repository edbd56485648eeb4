//! Errors triggered while wiring containers
//!
//! [WiringError] is the taxonomy of everything that can go wrong in the engine;
//! each occurrence travels as a [Diagnostic](crate::diagnostics::Diagnostic) that
//! also knows where in the source it happened. [Error] is the outer layer seen by
//! callers of the pipeline: IO, malformed inputs, the fatal dependency cycle, and
//! the aggregated per-group failures.

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::Diagnostic;

/// Errors triggered during the wiring process
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WiringError {
    #[error("malformed container `{container}`: {reason}")]
    Malformed { container: String, reason: String },

    #[error("unknown binding type `{wrapper}` for `{container}.{binding}`, expected Reusable, Transient or Static")]
    UnknownBindingType {
        container: String,
        binding: String,
        wrapper: String,
    },

    #[error("static binding `{container}.{binding}` cannot use `typeof {name}`, static values are typed by a type, not by a value")]
    StaticTypeof {
        container: String,
        binding: String,
        name: String,
    },

    #[error("cannot resolve `{name}` referenced by `{container}`")]
    UnresolvableReference { container: String, name: String },

    #[error("`{name}` is used by `{container}` but is not exported from {file}, add `export` to its declaration")]
    NotExported {
        container: String,
        name: String,
        file: String,
    },

    #[error("`{name}` bound in `{container}.{binding}` is not {expected}")]
    NotConstructible {
        container: String,
        binding: String,
        name: String,
        expected: &'static str,
    },

    #[error("bindings `{first}` and `{second}` of `{container}` both provide {identity}")]
    BindingConflict {
        container: String,
        first: String,
        second: String,
        identity: String,
    },

    #[error("cannot resolve parameter `{parameter}` ({identity}) of `{implementation}` in container `{container}`: no local binding, provided value, dependency or parent exposes it")]
    UnresolvedParameter {
        container: String,
        implementation: String,
        parameter: String,
        identity: String,
    },

    #[error("bindings of `{container}` depend on themselves: {path}")]
    BindingCycle { container: String, path: String },

    #[error("dependency cycle between containers: {path}")]
    DependencyCycle { path: String },

    #[error("`{container}` depends on `{dependency}`, which could not be resolved")]
    DependencyFailed {
        container: String,
        dependency: String,
    },
}

/// Errors reported by the pipeline and the command line
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid declaration index {path}: {source}")]
    Index {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Dependency cycles abort the whole run
    #[error("{0}")]
    Cycle(Box<Diagnostic>),

    #[error("{} container(s) could not be generated", .0.len())]
    Failed(Vec<Diagnostic>),
}

impl Error {
    /// Diagnostics carried by this error, if any
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Error::Cycle(d) => std::slice::from_ref(d.as_ref()),
            Error::Failed(all) => all,
            _ => &[],
        }
    }
}

//! The generation pipeline
//!
//! 1. The corpus is loaded and indexed as a whole (cross-file lookups need it).
//! 2. Files are scanned in parallel.
//! 3. Bindings are resolved per container, in parallel.
//! 4. The dependency graph is built; a cycle stops everything here.
//! 5. Each container is synthesized, each group (source file) emitted, in parallel.
//!
//! Failures do not stop the run: every group is attempted and all diagnostics are
//! collected. A group with any failing container produces no output.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::codegen::{self, ContainerUnit};
use crate::corpus::{module_path, Corpus, SourceFile};
use crate::diagnostics::Diagnostic;
use crate::error::{Error, WiringError};
use crate::graph;
use crate::inject::{self, Method, Scope};
use crate::resolve::{self, ResolvedContainer};
use crate::scan::{RawContainer, Scanner};

/// Settings of a generation run
#[derive(Debug, Clone)]
pub struct Options {
    /// Type names tagging container declarations
    pub wrappers: Vec<String>,
    /// Generated files are named `<stem>.<suffix>.ts`
    pub suffix: String,
}

/// One generated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    /// Source path the unit was generated from
    pub source: String,
    /// Output path, relative to the project root
    pub output: PathBuf,
    pub content: String,
}

/// Result of a run over the whole corpus
#[derive(Debug, Default)]
pub struct Generation {
    pub containers: usize,
    pub units: Vec<GeneratedUnit>,
    /// Sorted by location
    pub failures: Vec<Diagnostic>,
}

impl Generation {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Source file with the containers it declares
struct Group<'a> {
    file: &'a SourceFile,
    members: Vec<usize>,
    failed: bool,
}

/// Output path of the unit generated for `source`
pub fn output_path(source: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}.{suffix}.ts", module_path(source)))
}

/// Resolve and emit every container of the corpus.
///
/// Only a dependency cycle is returned as an error; all other failures are
/// collected in [Generation::failures].
pub fn generate(corpus: &Corpus, options: &Options) -> Result<Generation, Error> {
    let scanner = Scanner::new(&options.wrappers);
    let files: Vec<&SourceFile> = corpus.source_files().collect();
    let scans: Vec<_> = files.par_iter().map(|f| scanner.scan_file(f)).collect();

    let mut failures = Vec::new();
    let mut containers: Vec<RawContainer> = Vec::new();
    let mut groups = Vec::new();
    for (file, scanned) in files.into_iter().zip(scans) {
        if scanned.containers.is_empty() && scanned.errors.is_empty() {
            continue;
        }
        let start = containers.len();
        let failed = !scanned.errors.is_empty();
        failures.extend(scanned.errors);
        containers.extend(scanned.containers);
        groups.push(Group {
            file,
            members: (start..containers.len()).collect(),
            failed,
        });
    }

    let resolved: Vec<Result<ResolvedContainer, Vec<Diagnostic>>> = containers
        .par_iter()
        .map(|c| resolve::resolve_container(c, corpus))
        .collect();

    let built = graph::build(&containers, corpus).map_err(|cycle| {
        Error::Cycle(Box::new(
            cycle.with_note("dependency cycles cannot be wired, nothing was generated"),
        ))
    })?;

    let mut failed = vec![false; containers.len()];
    for (index, result) in resolved.iter().enumerate() {
        if let Err(errors) = result {
            failed[index] = true;
            failures.extend(errors.iter().cloned());
        }
    }
    for (index, error) in built.errors {
        failed[index] = true;
        failures.push(error);
    }

    let synthesized: Vec<Option<Result<Vec<Method>, Vec<Diagnostic>>>> = (0..containers.len())
        .into_par_iter()
        .map(|index| {
            if failed[index] {
                return None;
            }
            Some(synthesize(index, &containers, &resolved, &built.graph))
        })
        .collect();
    for (index, result) in synthesized.iter().enumerate() {
        if let Some(Err(errors)) = result {
            failed[index] = true;
            failures.extend(errors.iter().cloned());
        }
    }

    let emitted: Vec<Result<GeneratedUnit, Vec<Diagnostic>>> = groups
        .par_iter()
        .filter(|g| !g.failed && g.members.iter().all(|&m| !failed[m]))
        .map(|group| {
            let units: Vec<ContainerUnit<'_>> = group
                .members
                .iter()
                .filter_map(|&m| {
                    let methods = synthesized[m].as_ref()?.as_ref().ok()?;
                    Some(ContainerUnit {
                        container: &containers[m],
                        methods,
                    })
                })
                .collect();
            let content = codegen::emit(group.file, &units, corpus)?;
            Ok(GeneratedUnit {
                source: group.file.path.clone(),
                output: output_path(&group.file.path, &options.suffix),
                content,
            })
        })
        .collect();

    let mut units = Vec::new();
    for result in emitted {
        match result {
            Ok(unit) => units.push(unit),
            Err(errors) => failures.extend(errors),
        }
    }

    failures.sort_by(|a, b| {
        let key = |d: &Diagnostic| d.site.as_ref().map(|s| (s.file.clone(), s.span));
        key(a).cmp(&key(b))
    });
    tracing::info!(
        containers = containers.len(),
        units = units.len(),
        failures = failures.len(),
        "generation finished"
    );
    Ok(Generation {
        containers: containers.len(),
        units,
        failures,
    })
}

fn synthesize(
    index: usize,
    containers: &[RawContainer],
    resolved: &[Result<ResolvedContainer, Vec<Diagnostic>>],
    graph: &graph::DependencyGraph,
) -> Result<Vec<Method>, Vec<Diagnostic>> {
    let node = graph.node(index);
    let container = &containers[index];
    let available = |other: usize| {
        resolved[other].as_ref().map_err(|_| {
            vec![Diagnostic::at(
                WiringError::DependencyFailed {
                    container: container.name.clone(),
                    dependency: graph.node(other).name.clone(),
                },
                &container.file,
                container.span,
            )]
        })
    };

    let own = available(index)?;
    let dependencies = node
        .dependencies
        .iter()
        .map(|&d| available(d))
        .collect::<Result<Vec<_>, _>>()?;
    let parent = node.parent.map(available).transpose()?;

    tracing::debug!(
        container = %container.name,
        dependencies = dependencies.len(),
        parent = parent.is_some(),
        "synthesizing"
    );
    inject::synthesize(&Scope::new(own, &dependencies, parent))
}

/// Write generated units under `root`, leaving unchanged files untouched.
///
/// Returns the number of files actually written.
pub fn write_units(units: &[GeneratedUnit], root: &Path) -> Result<usize, Error> {
    let written = units
        .par_iter()
        .map(|unit| write_unit(unit, root))
        .collect::<Result<Vec<bool>, Error>>()?;
    Ok(written.into_iter().filter(|w| *w).count())
}

fn write_unit(unit: &GeneratedUnit, root: &Path) -> Result<bool, Error> {
    let path = root.join(&unit.output);
    if std::fs::read_to_string(&path).is_ok_and(|existing| existing == unit.content) {
        tracing::debug!(path = %path.display(), "unchanged");
        return Ok(false);
    }
    std::fs::write(&path, &unit.content).map_err(|source| Error::Io {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), source = %unit.source, "written");
    Ok(true)
}

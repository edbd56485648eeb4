//! Build-time dependency injection wiring.
//!
//! Containers are declared as types; wirekit resolves, for every value a
//! container must produce, how to build it and emits the implementing class.
//!
//! # Simple use case
//!
//! ```
//! # use wirekit::corpus::{Corpus, DeclarationIndex};
//! # use wirekit::config::Config;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // export class Widget {}
//! // export type Main = Module<{ bindings: { widget: Reusable<Widget> } }>;
//! let index: DeclarationIndex = serde_json::from_str(r#"{"files": [{
//!   "path": "src/main.ts",
//!   "declarations": [
//!     {"name": "Widget", "exported": true, "kind": "class", "constructor": []},
//!     {"name": "Main", "exported": true, "kind": "alias", "target":
//!       {"kind": "named", "name": "Module", "args": [{"kind": "object", "members": [
//!         {"name": "bindings", "type": {"kind": "object", "members": [
//!           {"name": "widget", "type": {"kind": "named", "name": "Reusable", "args": [
//!             {"kind": "named", "name": "Widget"}
//!           ]}}
//!         ]}}
//!       ]}]}}
//!   ]
//! }]}"#)?;
//!
//! let corpus = Corpus::new(index.files);
//! let generation = wirekit::generate(&corpus, &Config::default().options())?;
//!
//! let unit = &generation.units[0];
//! assert_eq!(unit.output.to_str(), Some("src/main.generated.ts"));
//! assert!(unit.content.contains("private _widget: Widget | null = null;"));
//! # Ok(())
//! # }
//! ```
//!
//! # Mechanism
//!
//! * The [corpus] holds what the host type checker knows about the project and
//!   answers cross-file questions through [SymbolLookup](corpus::SymbolLookup).
//! * Every type is reduced to a [TypeIdentity](identity::TypeIdentity): equal
//!   identities denote the same declaration, whatever the import path.
//! * The [scan]ner finds containers, the [graph] links them and rejects cycles,
//!   and [resolve] turns each binding into a lifecycle, a bound identity and an
//!   implementation with its parameters.
//! * [inject] decides where each constructor parameter comes from: local
//!   bindings first, then provided values, dependencies in declared order, and
//!   finally the parent.
//! * [codegen] writes one deterministic unit per source file.
//!
//! The [pipeline] runs all of the above over a corpus and collects every failure.

pub mod codegen;
pub mod config;
pub mod corpus;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod identity;
pub mod inject;
pub mod logging;
pub mod pipeline;
pub mod resolve;
pub mod scan;
pub mod typeref;

pub use diagnostics::Diagnostic;
pub use error::{Error, WiringError};
pub use pipeline::{generate, write_units, Generation};

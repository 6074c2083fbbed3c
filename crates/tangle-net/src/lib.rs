//! Tangle-Net: a graph-rewriting virtual machine for interaction nets.
//!
//! This crate executes nets of typed cells connected through directed port
//! wires, reduced by local, confluence-preserving rewrite rules whenever
//! two cells' principal ports face each other.
//!
//! # Architecture
//!
//! The machine is built around three tightly coupled components:
//!
//! - [`rules`]: the rule compiler, turning the declarative rule DSL into a
//!   dispatch table of specialized rewrite procedures, one per ordered
//!   pair of active kinds plus one erasure procedure per user kind
//! - [`mem`]: the flat cell store with bit-packed port addressing and
//!   size-bucketed free-list allocation
//! - [`engine`]: the reduction engine, draining the redex worklist one
//!   generation at a time and propagating wiring changes through
//!   transient Air placeholders
//!
//! [`kind`] holds the immutable kind registry that everything else
//! consumes, and [`text`] provides the line-oriented net reader and
//! dumper.
//!
//! # Usage
//!
//! ```no_run
//! use tangle_net::{compile, dump, parse_net, Engine};
//!
//! let statements = tangle_ir::parse(
//!     "(kind Con 3)\n(kind Dup 3)\n\
//!      (rule Dup Con (Con <1 x y) (Con <2 z w) (Dup 1> x z) (Dup 2> y w))",
//! )?;
//! let rules = compile(&statements)?;
//! let mem = parse_net("Dup x p q\nCon x s r", rules.registry())?;
//!
//! let mut engine = Engine::new(mem, &rules);
//! engine.scan_all();
//! engine.run(None);
//! println!("{}", dump(engine.memory(), rules.registry()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Resource model
//!
//! Single-threaded and synchronous: a [`Engine::step`] call runs its whole
//! generation to completion, and the memory is exclusively owned by the
//! engine. Freed cells go to per-size free lists and are reused verbatim;
//! there is no garbage collection beyond that.

pub mod encoding;
pub mod engine;
pub mod kind;
pub mod mem;
pub mod port;
pub mod rules;
pub mod text;

pub use engine::{attach, check_redex, scan_all, Engine, Redex};
pub use kind::{Kind, KindId, KindRegistry};
pub use mem::Memory;
pub use port::Port;
pub use rules::{compile, CompiledRules, RuleError};
pub use text::{dump, parse_net, NetError};

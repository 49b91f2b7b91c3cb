//! Stepchain - dependency-ordered step chain assembly and execution.
//!
//! Stepchain builds a one-shot, dependency-ordered execution pipeline out
//! of independently-registered named steps. Modules contribute steps
//! without knowing each other's relative order; each step only names the
//! steps it depends on, and the chain resolves those declarations into a
//! runnable order.
//!
//! # Modules
//!
//! - [`chain`] - Chain controller: registration, freezing, execution
//! - [`error`] - Error types, result alias, and the `require` guard
//! - [`graph`] - Generic dependency graph and topological ordering
//! - [`step`] - Step contract, dependency declarations, chain links
//!
//! # Example
//!
//! ```
//! use stepchain::{Chain, Dependency, Next, Result, Step};
//!
//! struct Greet;
//!
//! impl Step<Vec<String>> for Greet {
//!     fn name(&self) -> &str {
//!         "greet"
//!     }
//!
//!     fn dependencies(&self) -> Vec<Dependency> {
//!         vec![Dependency::mandatory("prepare")]
//!     }
//!
//!     fn execute(&self, state: &mut Vec<String>, next: Next<'_, Vec<String>>) -> Result<()> {
//!         state.push("hello".to_string());
//!         next.run(state)
//!     }
//! }
//!
//! struct Prepare;
//!
//! impl Step<Vec<String>> for Prepare {
//!     fn name(&self) -> &str {
//!         "prepare"
//!     }
//!
//!     fn execute(&self, state: &mut Vec<String>, next: Next<'_, Vec<String>>) -> Result<()> {
//!         state.push("ready".to_string());
//!         next.run(state)
//!     }
//! }
//!
//! let chain = Chain::new("greeting");
//! chain.register_step(Greet)?;
//! chain.register_step(Prepare)?;
//!
//! let mut state = Vec::new();
//! chain.execute(&mut state)?;
//! assert_eq!(state, vec!["ready", "hello"]);
//! # stepchain::Result::Ok(())
//! ```

pub mod chain;
pub mod error;
pub mod graph;
pub mod step;

pub use chain::Chain;
pub use error::{require, Result, StepchainError};
pub use step::{Dependency, Link, Next, Step};

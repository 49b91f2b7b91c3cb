//! Step contract and assembled chain links.
//!
//! A [`Step`] is a named unit of work with declared dependencies on
//! other steps. The chain controller resolves those declarations into
//! an order and threads the steps into a singly-linked chain of
//! [`Link`]s; each step receives the remainder of the chain as a
//! [`Next`] handle and forwards to it after doing its own work.

use std::sync::Arc;

use crate::error::Result;

/// A declared ordering constraint on another step, referenced by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Name of the step this dependency refers to.
    pub target: String,
    /// Whether the target must be registered for resolution to succeed.
    ///
    /// An absent mandatory target fails chain assembly; an absent
    /// optional target contributes no edge and no error.
    pub mandatory: bool,
}

impl Dependency {
    /// A dependency whose target must be registered.
    pub fn mandatory(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            mandatory: true,
        }
    }

    /// A dependency that is silently ignored if its target is absent.
    pub fn optional(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            mandatory: false,
        }
    }
}

/// A named unit of work participating in a chain.
///
/// `S` is the shared state type threaded through an execution. The
/// chain never inspects step logic; it only guarantees that the
/// [`Next`] handle passed to [`execute`](Step::execute) reflects the
/// dependency-resolved order.
pub trait Step<S>: Send + Sync {
    /// Stable name, unique within a chain.
    fn name(&self) -> &str;

    /// Dependencies on other steps, consulted only during chain assembly.
    ///
    /// Assembly runs under the owning chain's internal lock, so this
    /// method must not call back into that chain (not even read-only
    /// queries like [`Chain::step_names`]); doing so deadlocks.
    ///
    /// [`Chain::step_names`]: crate::chain::Chain::step_names
    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }

    /// Run this step against the shared state.
    ///
    /// By convention a step does its own work and then forwards with
    /// `next.run(state)`. A step may short-circuit the rest of the
    /// chain by returning without forwarding.
    fn execute(&self, state: &mut S, next: Next<'_, S>) -> Result<()>;
}

/// One link of an assembled chain: a step plus its successor.
///
/// Links are built fresh on each assembly pass; the successor is set
/// exactly once, at construction. Registered steps themselves are
/// never mutated.
pub struct Link<S> {
    step: Arc<dyn Step<S>>,
    successor: Option<Arc<Link<S>>>,
}

impl<S> Link<S> {
    pub(crate) fn new(step: Arc<dyn Step<S>>, successor: Option<Arc<Link<S>>>) -> Self {
        Self { step, successor }
    }

    /// The step this link wraps.
    pub fn step(&self) -> &dyn Step<S> {
        self.step.as_ref()
    }

    /// The next link in the chain, if any.
    pub fn successor(&self) -> Option<&Link<S>> {
        self.successor.as_deref()
    }

    /// Execute this link's step, handing it the remainder of the chain.
    pub fn run(&self, state: &mut S) -> Result<()> {
        self.step.execute(
            state,
            Next {
                link: self.successor.as_deref(),
            },
        )
    }
}

/// Handle to the remainder of the chain after the current step.
pub struct Next<'a, S> {
    link: Option<&'a Link<S>>,
}

impl<S> Next<'_, S> {
    /// Execute the rest of the chain. No-op at the terminal link.
    pub fn run(&self, state: &mut S) -> Result<()> {
        match self.link {
            Some(link) => link.run(state),
            None => Ok(()),
        }
    }

    /// Whether the current step is the last in the chain.
    pub fn is_terminal(&self) -> bool {
        self.link.is_none()
    }
}

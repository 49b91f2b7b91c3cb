//! Chain controller: registration, freezing, and ordered execution.
//!
//! A [`Chain`] owns the set of registered steps for one pipeline
//! instance. On execution it resolves the steps' declared dependencies
//! through a [`DependencyGraph`], threads the resulting topological
//! order into a singly-linked chain of [`Link`]s, and runs the head.
//! Freezing the chain makes the step set immutable and lets the
//! assembled chain be cached across executions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::{require, Result, StepchainError};
use crate::graph::DependencyGraph;
use crate::step::{Link, Step};

/// Mutable bookkeeping behind the chain's lock.
struct Registry<S> {
    /// Registered steps in insertion order; names are unique.
    steps: Vec<Arc<dyn Step<S>>>,
    /// Monotonic: set once by `freeze`, never cleared.
    frozen: bool,
    /// Assembled head, cached only while frozen.
    head: Option<Arc<Link<S>>>,
}

/// One pipeline instance: a set of named steps and the machinery to
/// run them in dependency order.
///
/// `S` is the shared state type handed to every step. The chain is
/// `Send + Sync` and can be shared via `Arc`; at most one execution is
/// admitted at a time, and concurrent attempts fail immediately with
/// [`StepchainError::AlreadyExecuting`].
pub struct Chain<S> {
    name: String,
    registry: Mutex<Registry<S>>,
    executing: AtomicBool,
}

/// Clears the executing flag when execution leaves scope, success or
/// failure, so a failed run never locks out future attempts.
struct ClearExecuting<'a>(&'a AtomicBool);

impl Drop for ClearExecuting<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S> Chain<S> {
    /// Create an empty, unfrozen chain with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: Mutex::new(Registry {
                steps: Vec::new(),
                frozen: false,
                head: None,
            }),
            executing: AtomicBool::new(false),
        }
    }

    /// The chain's name, as supplied at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the chain has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.lock_registry().frozen
    }

    /// Number of registered steps.
    pub fn step_count(&self) -> usize {
        self.lock_registry().steps.len()
    }

    /// Whether no steps are registered.
    pub fn is_empty(&self) -> bool {
        self.lock_registry().steps.is_empty()
    }

    /// Names of the registered steps, in registration order.
    pub fn step_names(&self) -> Vec<String> {
        self.lock_registry()
            .steps
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Register a step, keyed by its name.
    ///
    /// Fails with [`StepchainError::InvalidState`] while the chain is
    /// executing or after it has been frozen, and with
    /// [`StepchainError::DuplicateKey`] if the name is taken.
    pub fn register_step(&self, step: impl Step<S> + 'static) -> Result<()> {
        self.register_arc(Arc::new(step))
    }

    /// Register a factory-constructed step of type `T`.
    pub fn register_default<T>(&self) -> Result<()>
    where
        T: Step<S> + Default + 'static,
    {
        self.register_step(T::default())
    }

    /// Register an already-shared step.
    pub fn register_arc(&self, step: Arc<dyn Step<S>>) -> Result<()> {
        let mut registry = self.lock_registry();
        self.check_mutable(&registry)?;
        require(
            !registry.steps.iter().any(|s| s.name() == step.name()),
            || StepchainError::DuplicateKey {
                key: step.name().to_string(),
            },
        )?;

        debug!("Chain '{}' registered step '{}'", self.name, step.name());
        registry.steps.push(step);
        Ok(())
    }

    /// Remove the registered step with the given name, if any.
    ///
    /// Returns whether a step was removed; an unknown name is not an
    /// error. Fails with [`StepchainError::InvalidState`] under the
    /// same conditions as registration.
    pub fn unregister_step(&self, name: &str) -> Result<bool> {
        let mut registry = self.lock_registry();
        self.check_mutable(&registry)?;

        match registry.steps.iter().position(|s| s.name() == name) {
            Some(index) => {
                registry.steps.remove(index);
                debug!("Chain '{}' unregistered step '{}'", self.name, name);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Permanently freeze the step set. Idempotent.
    ///
    /// Freezing computes nothing itself; the assembled chain is built
    /// lazily on the first execution after the freeze and cached for
    /// the ones that follow.
    pub fn freeze(&self) -> Result<()> {
        let mut registry = self.lock_registry();
        require(!self.executing.load(Ordering::Acquire), || {
            StepchainError::InvalidState {
                chain: self.name.clone(),
                reason: "an execution is in flight".into(),
            }
        })?;

        if !registry.frozen {
            registry.frozen = true;
            debug!(
                "Chain '{}' frozen with {} step(s)",
                self.name,
                registry.steps.len()
            );
        }
        Ok(())
    }

    /// Run the chain against the caller-supplied state.
    ///
    /// Resolves dependencies, links the steps into execution order,
    /// and invokes the head; each step forwards to its successor per
    /// the [`Step`] contract. Zero registered steps is a no-op. Fails
    /// with [`StepchainError::AlreadyExecuting`] if another execution
    /// is in flight on this instance.
    pub fn execute(&self, state: &mut S) -> Result<()> {
        require(
            self.executing
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok(),
            || StepchainError::AlreadyExecuting {
                chain: self.name.clone(),
            },
        )?;
        let _clear = ClearExecuting(&self.executing);

        let head = {
            let mut registry = self.lock_registry();
            match &registry.head {
                Some(head) => Some(Arc::clone(head)),
                None => {
                    let head = self.assemble(&registry.steps)?;
                    if registry.frozen {
                        registry.head = head.clone();
                    }
                    head
                }
            }
        };

        // Step logic runs outside the lock; the lock only serializes
        // admission and bookkeeping.
        match head {
            Some(link) => link.run(state),
            None => Ok(()),
        }
    }

    /// Build the executable chain from the registered steps.
    fn assemble(&self, steps: &[Arc<dyn Step<S>>]) -> Result<Option<Arc<Link<S>>>> {
        if steps.is_empty() {
            return Ok(None);
        }

        let mut graph = DependencyGraph::new();
        for step in steps {
            graph.add_node(step.name(), Arc::clone(step))?;
        }
        for step in steps {
            for dependency in step.dependencies() {
                if graph.contains(&dependency.target) {
                    graph.add_edge(step.name(), &dependency.target)?;
                } else {
                    require(!dependency.mandatory, || {
                        StepchainError::MissingDependency {
                            step: step.name().to_string(),
                            dependency: dependency.target.clone(),
                        }
                    })?;
                    debug!(
                        "Chain '{}': step '{}' optionally depends on unregistered '{}'; no edge",
                        self.name,
                        step.name(),
                        dependency.target
                    );
                }
            }
        }

        let order = graph.topological_order()?;

        // Thread successor links back-to-front: the least-constrained
        // step becomes the head, so every dependency runs before the
        // steps that declared it.
        let mut next = None;
        for node in order.iter().rev() {
            next = Some(Arc::new(Link::new(Arc::clone(node.value()), next.take())));
        }

        debug!(
            "Chain '{}' assembled with {} step(s)",
            self.name,
            order.len()
        );
        Ok(next)
    }

    fn check_mutable(&self, registry: &Registry<S>) -> Result<()> {
        require(!self.executing.load(Ordering::Acquire), || {
            StepchainError::InvalidState {
                chain: self.name.clone(),
                reason: "an execution is in flight".into(),
            }
        })?;
        require(!registry.frozen, || StepchainError::InvalidState {
            chain: self.name.clone(),
            reason: "chain is frozen".into(),
        })
    }

    fn lock_registry(&self) -> MutexGuard<'_, Registry<S>> {
        // The lock guards plain bookkeeping; a poisoned guard cannot
        // hold a broken invariant.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

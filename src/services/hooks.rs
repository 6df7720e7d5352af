//! Insert hooks.
//!
//! Collaborators may veto or augment an insert before it is validated
//! (`pre_insert`) and observe it after it commits (`post_insert`).
//!
//! | Stage | Failure |
//! |-------|---------|
//! | `pre_insert` | aborts the insert; nothing is stored |
//! | `post_insert` | logged and counted; the insert stands |

use std::sync::Arc;

use crate::Result;
use crate::models::{Identity, IdentityRecord, MetaInput, Principal};

/// The payload an insert is about to store.
///
/// Pre-insert hooks receive a clone of the caller's identity, never the
/// caller's value itself.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertDraft {
    /// The identity document.
    pub identity: Identity,
    /// Initial status and resource roles.
    pub meta: MetaInput,
}

/// Extension point around [`crate::IdentityService::insert`].
pub trait InsertHook: Send + Sync {
    /// Hook name for logs.
    fn name(&self) -> &'static str;

    /// Inspects or rewrites the draft before validation.
    ///
    /// # Errors
    ///
    /// Any error vetoes the insert and is returned to the caller.
    fn pre_insert(&self, _actor: &Principal, draft: InsertDraft) -> Result<InsertDraft> {
        Ok(draft)
    }

    /// Observes a committed insert.
    ///
    /// # Errors
    ///
    /// Errors are logged and otherwise ignored.
    fn post_insert(&self, _actor: &Principal, _record: &IdentityRecord) -> Result<()> {
        Ok(())
    }
}

/// Registered hooks, run in registration order.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn InsertHook>>,
}

impl HookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook.
    pub fn register(&mut self, hook: Arc<dyn InsertHook>) {
        tracing::debug!(hook = hook.name(), "Registered insert hook");
        self.hooks.push(hook);
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns `true` if no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Threads `draft` through every pre-insert hook.
    ///
    /// # Errors
    ///
    /// Returns the first hook error.
    pub fn run_pre_insert(&self, actor: &Principal, draft: InsertDraft) -> Result<InsertDraft> {
        self.hooks.iter().try_fold(draft, |draft, hook| {
            hook.pre_insert(actor, draft).inspect_err(|e| {
                tracing::warn!(hook = hook.name(), error = %e, "Pre-insert hook vetoed insert");
            })
        })
    }

    /// Runs every post-insert hook; failures are logged, never returned.
    pub fn run_post_insert(&self, actor: &Principal, record: &IdentityRecord) {
        for hook in &self.hooks {
            if let Err(e) = hook.post_insert(actor, record) {
                metrics::counter!("insert_hook_failures_total", "hook" => hook.name())
                    .increment(1);
                tracing::warn!(
                    hook = hook.name(),
                    identity.id = %record.id(),
                    error = %e,
                    "Post-insert hook failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name()))
            .finish()
    }
}

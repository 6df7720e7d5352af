//! Resource translation.
//!
//! Translators widen the resource list of a capability before it is
//! checked. They run in registration order, each taking and returning a
//! capability value. The default [`OwnerTranslator`] lets the owner of a
//! resource satisfy checks written against that resource.

use std::collections::HashSet;
use std::sync::Arc;

use crate::Result;
use crate::models::{Capability, IdentityId};
use crate::storage::IdentityStore;

/// A rule that extends a capability's resource list.
pub trait ResourceTranslator: Send + Sync {
    /// Translator name for logs.
    fn name(&self) -> &'static str;

    /// Returns `capability` with any additional resources appended.
    ///
    /// Only called for capabilities with a resource list.
    ///
    /// # Errors
    ///
    /// Returns an error if resource lookups fail.
    fn translate(&self, capability: Capability) -> Result<Capability>;
}

/// Appends the owners of listed resources, transitively.
///
/// Lookups are batched per level; owners already visited are not looked up
/// again, so ownership cycles terminate.
pub struct OwnerTranslator {
    store: Arc<dyn IdentityStore>,
}

impl OwnerTranslator {
    /// Creates a translator reading owners from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }
}

impl ResourceTranslator for OwnerTranslator {
    fn name(&self) -> &'static str {
        "owner"
    }

    fn translate(&self, capability: Capability) -> Result<Capability> {
        let Some(resources) = capability.resources() else {
            return Ok(capability);
        };

        let mut visited: HashSet<String> = resources.iter().cloned().collect();
        let mut frontier: Vec<IdentityId> = resources.iter().map(IdentityId::new).collect();
        let mut owners: Vec<String> = Vec::new();

        while !frontier.is_empty() {
            let records = self.store.find_many(&frontier)?;
            frontier = records
                .into_iter()
                .filter_map(|record| record.identity.owner)
                .filter(|owner| visited.insert(owner.to_string()))
                .collect();
            owners.extend(frontier.iter().map(ToString::to_string));
        }

        if !owners.is_empty() {
            tracing::trace!(
                permission = %capability.permission,
                owners = ?owners,
                "Owner translation appended resources"
            );
        }
        Ok(capability.with_resources(owners))
    }
}

/// Ordered list of registered translators.
#[derive(Clone, Default)]
pub struct TranslatorChain {
    translators: Vec<Arc<dyn ResourceTranslator>>,
}

impl TranslatorChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a translator; it runs after those already registered.
    pub fn register(&mut self, translator: Arc<dyn ResourceTranslator>) {
        tracing::debug!(translator = translator.name(), "Registered resource translator");
        self.translators.push(translator);
    }

    /// Number of registered translators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.translators.len()
    }

    /// Returns `true` if no translator is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }

    /// Runs every translator over `capability`.
    ///
    /// Unrestricted capabilities pass through untouched.
    ///
    /// # Errors
    ///
    /// Returns the first translator error.
    pub fn translate(&self, capability: Capability) -> Result<Capability> {
        if capability.is_unrestricted() {
            return Ok(capability);
        }
        self.translators
            .iter()
            .try_fold(capability, |capability, translator| translator.translate(capability))
    }
}

impl std::fmt::Debug for TranslatorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.translators.iter().map(|t| t.name()))
            .finish()
    }
}

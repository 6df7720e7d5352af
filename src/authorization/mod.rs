//! Capability-based authorization.
//!
//! An [`Authorizer`] owns the long-lived collaborators: the role catalog
//! and the registered resource translators. Each operation begins an
//! [`AuthorizationPass`], which fetches the role catalog once, builds the
//! permission oracle for the acting principal, and is dropped when the
//! operation returns.
//!
//! # Validators
//!
//! | Function | Checks |
//! |----------|--------|
//! | [`validate_capability_delegation`] | the actor holds every granted capability plus the delegate permission |
//! | [`validate_capability_revocation`] | blanket meta-update over the target, or revoke over each named resource |
//! | [`ensure_membership_valid`] | claimed groups exist, are active groups, and the actor may manage their membership |
//!
//! All validators are read-only and fail on the first violation.

mod catalog;
mod context;
mod delegation;
mod expand;
mod membership;
pub mod permissions;
mod revocation;
mod translate;

pub use catalog::{RoleCatalog, RoleSnapshot, StaticRoleCatalog, builtin_roles};
pub use context::{AuthorizationContext, PermissionOracle};
pub use delegation::validate_capability_delegation;
pub use expand::expand;
pub use membership::ensure_membership_valid;
pub use revocation::validate_capability_revocation;
pub use translate::{OwnerTranslator, ResourceTranslator, TranslatorChain};

use std::sync::Arc;

use crate::Result;
use crate::models::{Capability, Principal};

/// Entry point for authorization decisions.
#[derive(Clone)]
pub struct Authorizer {
    catalog: Arc<dyn RoleCatalog>,
    translators: TranslatorChain,
}

impl Authorizer {
    /// Creates an authorizer with no translators.
    #[must_use]
    pub fn new(catalog: Arc<dyn RoleCatalog>) -> Self {
        Self {
            catalog,
            translators: TranslatorChain::new(),
        }
    }

    /// Adds a translator (builder form).
    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn ResourceTranslator>) -> Self {
        self.translators.register(translator);
        self
    }

    /// Adds a translator; it runs after those already registered.
    pub fn register_translator(&mut self, translator: Arc<dyn ResourceTranslator>) {
        self.translators.register(translator);
    }

    /// Returns the role catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn RoleCatalog> {
        &self.catalog
    }

    /// Begins an authorization pass for `principal`.
    ///
    /// # Errors
    ///
    /// Returns an error if the role catalog cannot be read.
    pub fn begin(&self, principal: Principal) -> Result<AuthorizationPass<'_>> {
        let roles = RoleSnapshot::load(self.catalog.as_ref())?;
        let oracle = AuthorizationContext::build(principal, &roles);
        Ok(AuthorizationPass::new(&self.translators, roles, Box::new(oracle)))
    }
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("translators", &self.translators)
            .finish_non_exhaustive()
    }
}

/// State for one authorization pass: the role snapshot and the oracle.
pub struct AuthorizationPass<'a> {
    translators: &'a TranslatorChain,
    roles: RoleSnapshot,
    oracle: Box<dyn PermissionOracle>,
}

impl<'a> AuthorizationPass<'a> {
    /// Assembles a pass from its parts.
    #[must_use]
    pub fn new(
        translators: &'a TranslatorChain,
        roles: RoleSnapshot,
        oracle: Box<dyn PermissionOracle>,
    ) -> Self {
        Self {
            translators,
            roles,
            oracle,
        }
    }

    /// The acting principal.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        self.oracle.principal()
    }

    /// The role snapshot fetched for this pass.
    #[must_use]
    pub const fn roles(&self) -> &RoleSnapshot {
        &self.roles
    }

    /// The permission oracle.
    #[must_use]
    pub fn oracle(&self) -> &dyn PermissionOracle {
        self.oracle.as_ref()
    }

    /// Runs the registered translators over `capability`.
    ///
    /// # Errors
    ///
    /// Returns the first translator error.
    pub fn translate(&self, capability: Capability) -> Result<Capability> {
        self.translators.translate(capability)
    }

    /// Checks `permission` over `resources` after translation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::PermissionDenied`] if the check fails.
    pub fn check(&self, permission: &str, resources: Option<Vec<String>>) -> Result<()> {
        if self.principal().is_full_trust() {
            return Ok(());
        }
        let capability = self.translate(Capability {
            permission: permission.to_string(),
            resource: resources,
        })?;
        self.check_capability(&capability)
    }

    /// Checks an already-translated capability.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::PermissionDenied`] if the check fails.
    pub fn check_capability(&self, capability: &Capability) -> Result<()> {
        let result = self
            .oracle
            .check(&capability.permission, capability.resources());
        if let Err(e) = &result {
            tracing::warn!(principal = %self.principal().label(), error = %e, "Authorization denied");
        }
        result
    }
}

//! Identity service.
//!
//! Applies identity mutations for an acting principal: every operation
//! begins one authorization pass, runs the validators it needs, and then
//! performs a single sequence-gated write.
//!
//! # Permissions
//!
//! | Operation | Permission | Resource |
//! |-----------|------------|----------|
//! | `insert` | `IDENTITY_INSERT` | new identity (+ owner) |
//! | `get`, `exists` | `IDENTITY_ACCESS` | the identity |
//! | `get_all` | `IDENTITY_ACCESS` | unrestricted |
//! | `update` | `IDENTITY_UPDATE` | the identity (+ owner) |
//! | `set_status` | `IDENTITY_META_UPDATE` | the identity (+ owner) |
//! | `update_roles` | delegation / revocation rules | granted / revoked resources |
//!
//! Resource lists are widened by the registered translators (owners by
//! default) before every check.

use std::sync::Arc;

use tracing::instrument;

use super::hooks::{HookRegistry, InsertDraft, InsertHook};
use super::role_changes::apply_role_changes;
use crate::authorization::permissions::{
    IDENTITY_ACCESS, IDENTITY_INSERT, IDENTITY_META_UPDATE, IDENTITY_UPDATE,
};
use crate::authorization::{
    Authorizer, OwnerTranslator, ResourceTranslator, RoleCatalog,
    StaticRoleCatalog, ensure_membership_valid, validate_capability_delegation,
    validate_capability_revocation,
};
use crate::config::{SeedIdentity, WardenConfig};
use crate::models::{
    EventMeta, Identity, IdentityEvent, IdentityFilter, IdentityId, IdentityPatch,
    IdentityRecord, IdentityStatus, Meta, MetaInput, Principal, ResourceRole, resolve_directives,
};
use crate::observability::{EventBus, global_event_bus};
use crate::storage::{IdentityStorageFactory, IdentityStore, RecordMutation};
use crate::{Error, Result};

/// Options for [`IdentityService::get`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Treat a deleted identity as not found.
    pub active_only: bool,
}

impl GetOptions {
    /// Only return active identities.
    #[must_use]
    pub const fn active() -> Self {
        Self { active_only: true }
    }
}

/// Request for [`IdentityService::update_roles`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRolesRequest {
    /// Identity whose roles change.
    pub id: IdentityId,
    /// Entries to grant.
    pub add: Vec<ResourceRole>,
    /// Entries to revoke.
    pub remove: Vec<ResourceRole>,
    /// Sequence the caller last read.
    pub sequence: u64,
}

impl UpdateRolesRequest {
    /// Creates a request with no changes.
    #[must_use]
    pub fn new(id: impl Into<IdentityId>, sequence: u64) -> Self {
        Self {
            id: id.into(),
            add: Vec::new(),
            remove: Vec::new(),
            sequence,
        }
    }

    /// Adds an entry to grant.
    #[must_use]
    pub fn add(mut self, role: ResourceRole) -> Self {
        self.add.push(role);
        self
    }

    /// Adds an entry to revoke.
    #[must_use]
    pub fn remove(mut self, role: ResourceRole) -> Self {
        self.remove.push(role);
        self
    }
}

/// Direction of a single-role change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleOperation {
    /// Grant the role.
    Add,
    /// Revoke the role.
    Remove,
}

/// Request for [`IdentityService::update_role`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRoleRequest {
    /// Identity whose roles change.
    pub identity_id: IdentityId,
    /// Role id.
    pub role: String,
    /// Resource the role is granted over; `None` means unrestricted.
    pub resource_id: Option<String>,
    /// Grant or revoke.
    pub operation: RoleOperation,
    /// Sequence the caller last read.
    pub sequence: u64,
}

/// Service applying authorized identity mutations.
pub struct IdentityService {
    store: Arc<dyn IdentityStore>,
    authorizer: Authorizer,
    hooks: HookRegistry,
    fields: Vec<String>,
    events: EventBus,
    role_base_url: String,
}

impl IdentityService {
    /// Creates a service over `store` with ownership translation enabled.
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, catalog: Arc<dyn RoleCatalog>) -> Self {
        let authorizer = Authorizer::new(catalog)
            .with_translator(Arc::new(OwnerTranslator::new(Arc::clone(&store))));
        Self {
            store,
            authorizer,
            hooks: HookRegistry::new(),
            fields: WardenConfig::default().identity.fields,
            events: global_event_bus().clone(),
            role_base_url: String::new(),
        }
    }

    /// Creates a service from configuration, opening the on-disk store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn from_config(config: &WardenConfig) -> Result<Self> {
        let store = IdentityStorageFactory::create_for_config(config)?;
        Ok(Self::new(store, Arc::new(config.role_catalog()))
            .with_fields(config.identity.fields.clone())
            .with_role_base_url(config.role_base_url.clone()))
    }

    /// Creates a service over an in-memory store with the built-in roles.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(
            IdentityStorageFactory::create_in_memory()?,
            Arc::new(StaticRoleCatalog::builtin()),
        ))
    }

    /// Sets the attribute fields `update` may change.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the prefix for relative role ids.
    #[must_use]
    pub fn with_role_base_url(mut self, base: impl Into<String>) -> Self {
        self.role_base_url = base.into();
        self
    }

    /// Publishes events on `bus` instead of the global bus.
    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = bus;
        self
    }

    /// Registers an insert hook.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn InsertHook>) -> Self {
        self.hooks.register(hook);
        self
    }

    /// Registers a resource translator after the owner translator.
    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn ResourceTranslator>) -> Self {
        self.authorizer.register_translator(translator);
        self
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    /// Returns the authorizer.
    #[must_use]
    pub const fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    /// Resolves the principal acting as identity `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the identity is missing or deleted.
    pub fn principal_for(&self, id: &IdentityId) -> Result<Principal> {
        match self.store.find_one(id)? {
            Some(record) if record.is_active() => Ok(Principal::from_record(&self.present(record))),
            _ => Err(Error::NotFound { id: id.to_string() }),
        }
    }

    /// Inserts a new identity.
    ///
    /// Steps, in order: insert permission over the identity, pre-insert
    /// hooks on a clone, `generateResource` resolution, role catalog
    /// lookup, membership and delegation validation, storage at sequence
    /// 0, post-insert hooks.
    ///
    /// # Errors
    ///
    /// - [`Error::PermissionDenied`] if any check fails
    /// - [`Error::NotAllowed`] if `memberOf` names an invalid group
    /// - [`Error::NotSupported`] for unknown roles or directives
    /// - [`Error::Duplicate`] if the id already exists
    #[instrument(skip(self, actor, identity, meta), fields(identity.id = %identity.id, actor = %actor.label()))]
    pub fn insert(
        &self,
        actor: &Principal,
        identity: Identity,
        meta: MetaInput,
    ) -> Result<IdentityRecord> {
        let result = self.insert_inner(actor, &identity, meta);
        record_mutation("insert", &result);
        let record = result?;

        self.hooks.run_post_insert(actor, &record);
        self.publish(IdentityEvent::Inserted {
            meta: event_meta(actor),
            id: record.id().clone(),
        });
        tracing::info!(
            identity.id = %record.id(),
            roles = record.meta.sys_resource_role.len(),
            "Inserted identity"
        );
        Ok(record)
    }

    fn insert_inner(
        &self,
        actor: &Principal,
        identity: &Identity,
        meta: MetaInput,
    ) -> Result<IdentityRecord> {
        let pass = self.authorizer.begin(actor.clone())?;
        pass.check(IDENTITY_INSERT, Some(identity.resource_list()))?;

        let draft = self.hooks.run_pre_insert(
            actor,
            InsertDraft {
                identity: identity.clone(),
                meta,
            },
        )?;
        let roles = self.normalize_roles(&draft.meta.sys_resource_role, &draft.identity.id)?;

        pass.roles().ensure_supported(&roles)?;
        ensure_membership_valid(&pass, self.store.as_ref(), &draft.identity)?;
        validate_capability_delegation(&pass, &roles)?;

        self.store.insert(IdentityRecord {
            identity: draft.identity,
            meta: Meta::new(draft.meta.status, roles),
        })
    }

    /// Retrieves an identity.
    ///
    /// Access is checked before the lookup, so a caller without access
    /// cannot discover whether the identity exists.
    ///
    /// # Errors
    ///
    /// - [`Error::PermissionDenied`] without `IDENTITY_ACCESS`
    /// - [`Error::NotFound`] if missing, or deleted with `active_only`
    #[instrument(skip(self, actor), fields(identity.id = %id, actor = %actor.label()))]
    pub fn get(
        &self,
        actor: &Principal,
        id: &IdentityId,
        options: GetOptions,
    ) -> Result<IdentityRecord> {
        let pass = self.authorizer.begin(actor.clone())?;
        pass.check(IDENTITY_ACCESS, Some(vec![id.to_string()]))?;

        match self.store.find_one(id)? {
            Some(record) if record.is_active() || !options.active_only => Ok(self.present(record)),
            _ => Err(Error::NotFound { id: id.to_string() }),
        }
    }

    /// Returns `true` if the identity exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] without `IDENTITY_ACCESS`.
    #[instrument(skip(self, actor), fields(identity.id = %id, actor = %actor.label()))]
    pub fn exists(&self, actor: &Principal, id: &IdentityId) -> Result<bool> {
        let pass = self.authorizer.begin(actor.clone())?;
        pass.check(IDENTITY_ACCESS, Some(vec![id.to_string()]))?;
        self.store.exists(id)
    }

    /// Lists identities matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] without unrestricted
    /// `IDENTITY_ACCESS`.
    #[instrument(skip(self, actor, filter), fields(actor = %actor.label()))]
    pub fn get_all(&self, actor: &Principal, filter: &IdentityFilter) -> Result<Vec<IdentityRecord>> {
        let pass = self.authorizer.begin(actor.clone())?;
        pass.check(IDENTITY_ACCESS, None)?;
        Ok(self
            .store
            .find(filter)?
            .into_iter()
            .map(|record| self.present(record))
            .collect())
    }

    /// Applies `patch` to an identity's attributes.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the identity does not exist
    /// - [`Error::InvalidState`] if `sequence` is stale, before or at write time
    /// - [`Error::PermissionDenied`] without `IDENTITY_UPDATE`
    /// - [`Error::ValidationError`] if the patch is not allowed or invalid
    /// - [`Error::NotAllowed`] if a changed `memberOf` names an invalid group
    #[instrument(skip(self, actor, patch), fields(identity.id = %id, actor = %actor.label()))]
    pub fn update(
        &self,
        actor: &Principal,
        id: &IdentityId,
        patch: &IdentityPatch,
        sequence: u64,
    ) -> Result<IdentityRecord> {
        let result = self.update_inner(actor, id, patch, sequence);
        record_mutation("update", &result);
        let record = result?;

        self.publish(IdentityEvent::Updated {
            meta: event_meta(actor),
            id: id.clone(),
            sequence: record.meta.sequence,
            fields: patch.touched_fields(),
        });
        tracing::info!(identity.id = %id, sequence = record.meta.sequence, "Updated identity");
        Ok(record)
    }

    fn update_inner(
        &self,
        actor: &Principal,
        id: &IdentityId,
        patch: &IdentityPatch,
        sequence: u64,
    ) -> Result<IdentityRecord> {
        let pass = self.authorizer.begin(actor.clone())?;
        let record = self.load_at(id, sequence)?;
        pass.check(IDENTITY_UPDATE, Some(record.identity.resource_list()))?;

        let patched = patch.apply(&record.identity, &self.fields)?;
        if member_of_changed(&record.identity, &patched) {
            ensure_membership_valid(&pass, self.store.as_ref(), &patched)?;
        }

        self.write(id, sequence, RecordMutation::Identity(patched))
    }

    /// Changes an identity's lifecycle status.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the identity does not exist
    /// - [`Error::InvalidState`] if `sequence` is stale
    /// - [`Error::PermissionDenied`] without `IDENTITY_META_UPDATE`
    #[instrument(skip(self, actor), fields(identity.id = %id, actor = %actor.label()))]
    pub fn set_status(
        &self,
        actor: &Principal,
        id: &IdentityId,
        status: IdentityStatus,
        sequence: u64,
    ) -> Result<IdentityRecord> {
        let result = self.set_status_inner(actor, id, status, sequence);
        record_mutation("set_status", &result);
        let record = result?;

        self.publish(IdentityEvent::StatusChanged {
            meta: event_meta(actor),
            id: id.clone(),
            status,
            sequence: record.meta.sequence,
        });
        tracing::info!(identity.id = %id, %status, sequence = record.meta.sequence, "Changed identity status");
        Ok(record)
    }

    fn set_status_inner(
        &self,
        actor: &Principal,
        id: &IdentityId,
        status: IdentityStatus,
        sequence: u64,
    ) -> Result<IdentityRecord> {
        let pass = self.authorizer.begin(actor.clone())?;
        let record = self.load_at(id, sequence)?;
        pass.check(IDENTITY_META_UPDATE, Some(record.identity.resource_list()))?;
        self.write(id, sequence, RecordMutation::Status(status))
    }

    /// Grants and revokes resource roles.
    ///
    /// Added entries have their directives resolved against the target and
    /// are stamped with the actor as delegator; the actor must be able to
    /// delegate them. Removed entries go through revocation validation.
    /// Removals apply before additions. A request with nothing to add or
    /// remove still writes and bumps the sequence.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the identity does not exist
    /// - [`Error::InvalidState`] if `sequence` is stale
    /// - [`Error::PermissionDenied`] if delegation or revocation fails
    /// - [`Error::NotSupported`] for unknown roles or directives
    #[instrument(
        skip(self, actor, request),
        fields(identity.id = %request.id, actor = %actor.label(), sequence = request.sequence)
    )]
    pub fn update_roles(
        &self,
        actor: &Principal,
        request: UpdateRolesRequest,
    ) -> Result<IdentityRecord> {
        let result = self.update_roles_inner(actor, &request);
        record_mutation("update_roles", &result);
        let record = result?;

        self.publish(IdentityEvent::RolesChanged {
            meta: event_meta(actor),
            id: request.id.clone(),
            added: request.add.len(),
            removed: request.remove.len(),
            sequence: record.meta.sequence,
        });
        tracing::info!(
            identity.id = %request.id,
            added = request.add.len(),
            removed = request.remove.len(),
            sequence = record.meta.sequence,
            "Updated resource roles"
        );
        Ok(record)
    }

    fn update_roles_inner(
        &self,
        actor: &Principal,
        request: &UpdateRolesRequest,
    ) -> Result<IdentityRecord> {
        let pass = self.authorizer.begin(actor.clone())?;
        let record = self.load_at(&request.id, request.sequence)?;

        let add: Vec<ResourceRole> = self
            .normalize_roles(&request.add, &request.id)?
            .into_iter()
            .map(|role| stamp_delegator(role, actor))
            .collect();
        let remove = self.normalize_roles(&request.remove, &request.id)?;

        pass.roles().ensure_supported(&add)?;
        validate_capability_delegation(&pass, &add)?;
        validate_capability_revocation(&pass, &record.identity, &remove)?;

        let current = self.present(record).meta.sys_resource_role;
        let roles = apply_role_changes(current, &add, &remove);
        self.write(&request.id, request.sequence, RecordMutation::ResourceRoles(roles))
    }

    /// Grants or revokes one role over one resource.
    ///
    /// # Errors
    ///
    /// Same as [`Self::update_roles`].
    pub fn update_role(
        &self,
        actor: &Principal,
        request: UpdateRoleRequest,
    ) -> Result<IdentityRecord> {
        let mut role = ResourceRole::new(request.role);
        if let Some(resource) = request.resource_id {
            role = role.with_resource([resource]);
        }
        let roles_request = UpdateRolesRequest::new(request.identity_id, request.sequence);
        let roles_request = match request.operation {
            RoleOperation::Add => roles_request.add(role),
            RoleOperation::Remove => roles_request.remove(role),
        };
        self.update_roles(actor, roles_request)
    }

    /// Inserts configured identities under full trust.
    ///
    /// Identities that already exist are skipped. Returns the number
    /// inserted.
    ///
    /// # Errors
    ///
    /// Returns the first error other than [`Error::Duplicate`].
    pub fn seed(&self, identities: &[SeedIdentity]) -> Result<usize> {
        let mut inserted = 0;
        for seed in identities {
            let meta = MetaInput {
                status: seed.status,
                sys_resource_role: seed.resource_roles.clone(),
            };
            match self.insert(&Principal::FullTrust, seed.identity.clone(), meta) {
                Ok(_) => inserted += 1,
                Err(e) if e.is_duplicate() => {
                    tracing::debug!(identity.id = %seed.identity.id, "Seed identity already exists");
                },
                Err(e) => return Err(e),
            }
        }
        Ok(inserted)
    }

    /// Loads a record and checks the caller's sequence against it.
    fn load_at(&self, id: &IdentityId, sequence: u64) -> Result<IdentityRecord> {
        let record = self
            .store
            .find_one(id)?
            .ok_or_else(|| Error::NotFound { id: id.to_string() })?;
        if record.meta.sequence != sequence {
            metrics::counter!("identity_sequence_conflicts_total", "stage" => "read").increment(1);
            return Err(Error::InvalidState {
                id: id.to_string(),
                expected: sequence,
                actual: record.meta.sequence,
            });
        }
        Ok(record)
    }

    /// Performs the conditional write and returns the stored result.
    fn write(
        &self,
        id: &IdentityId,
        sequence: u64,
        mutation: RecordMutation,
    ) -> Result<IdentityRecord> {
        if self.store.conditional_update(id, sequence, mutation)? == 0 {
            metrics::counter!("identity_sequence_conflicts_total", "stage" => "write")
                .increment(1);
            // Another writer committed between the read and this write.
            let current = self
                .store
                .find_one(id)?
                .ok_or_else(|| Error::NotFound { id: id.to_string() })?;
            return Err(Error::InvalidState {
                id: id.to_string(),
                expected: sequence,
                actual: current.meta.sequence,
            });
        }
        self.store
            .find_one(id)?
            .map(|record| self.present(record))
            .ok_or_else(|| Error::NotFound { id: id.to_string() })
    }

    /// Resolves directives and role ids of caller-supplied entries.
    fn normalize_roles(&self, roles: &[ResourceRole], holder: &IdentityId) -> Result<Vec<ResourceRole>> {
        Ok(resolve_directives(roles, holder.as_str())?
            .into_iter()
            .map(|mut role| {
                role.sys_role = self.resolve_role_id(&role.sys_role);
                role
            })
            .collect())
    }

    /// Joins a relative role id onto the configured base url.
    ///
    /// Ids containing `:` are already absolute and pass through unchanged.
    fn resolve_role_id(&self, role_id: &str) -> String {
        if self.role_base_url.is_empty() || role_id.contains(':') {
            role_id.to_string()
        } else {
            format!("{}/{}", self.role_base_url, urlencoding::encode(role_id))
        }
    }

    /// Rewrites stored role ids for callers.
    fn present(&self, mut record: IdentityRecord) -> IdentityRecord {
        if !self.role_base_url.is_empty() {
            for role in &mut record.meta.sys_resource_role {
                role.sys_role = self.resolve_role_id(&role.sys_role);
            }
        }
        record
    }

    fn publish(&self, event: IdentityEvent) {
        self.events.publish(event);
    }
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("authorizer", &self.authorizer)
            .field("hooks", &self.hooks)
            .field("fields", &self.fields)
            .field("role_base_url", &self.role_base_url)
            .finish_non_exhaustive()
    }
}

fn member_of_changed(before: &Identity, after: &Identity) -> bool {
    let mut old = before.normalized_member_of();
    let mut new = after.normalized_member_of();
    old.sort();
    new.sort();
    old != new
}

fn stamp_delegator(mut role: ResourceRole, actor: &Principal) -> ResourceRole {
    if role.delegator.is_none()
        && let Some(id) = actor.id()
    {
        role.delegator = Some(id.to_string());
    }
    role
}

fn event_meta(actor: &Principal) -> EventMeta {
    EventMeta::new(actor.id().map(ToString::to_string))
}

fn record_mutation<T>(operation: &'static str, result: &Result<T>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.name(),
    };
    metrics::counter!(
        "identity_mutations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
    if let Err(e) = result {
        tracing::warn!(operation, error = %e, "Identity mutation rejected");
    }
}

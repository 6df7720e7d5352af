//! Integration tests for warden.
#![allow(clippy::unwrap_used, clippy::panic, clippy::too_many_lines)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use warden::authorization::StaticRoleCatalog;
use warden::authorization::permissions::{
    ADMIN_ROLE, IDENTITY_ACCESS, REGULAR_PERMISSIONS, REGULAR_ROLE,
};
use warden::models::IdentityEvent;
use warden::observability::EventBus;
use warden::services::{
    GetOptions, InsertDraft, InsertHook, RoleOperation, UpdateRoleRequest, UpdateRolesRequest,
};
use warden::storage::IdentityStorageFactory;
use warden::{
    Error, Identity, IdentityFilter, IdentityId, IdentityPatch, IdentityRecord, IdentityService,
    IdentityStatus, IdentityStore, MetaInput, Principal, RecordMutation, ResourceRole, Role,
    WardenConfig,
};

const ALPHA: &str = "https://example.com/i/alpha";
const BETA: &str = "https://example.com/i/beta";
const OWNER: &str = "https://example.com/i/owner";
const MEMBER: &str = "https://example.com/i/member";
const THIRD: &str = "https://example.com/i/third";
const GROUP: &str = "https://example.com/g/team";

fn service() -> IdentityService {
    IdentityService::in_memory()
        .unwrap()
        .with_event_bus(EventBus::new(64))
}

fn regular_self() -> MetaInput {
    MetaInput::default().with_resource_role(ResourceRole::new(REGULAR_ROLE).generating_id())
}

fn insert_regular(service: &IdentityService, identity: Identity) -> IdentityRecord {
    service
        .insert(&Principal::FullTrust, identity, regular_self())
        .unwrap()
}

fn act_as(service: &IdentityService, id: &str) -> Principal {
    service.principal_for(&IdentityId::new(id)).unwrap()
}

fn stored(service: &IdentityService, id: &str) -> IdentityRecord {
    service
        .get(&Principal::FullTrust, &IdentityId::new(id), GetOptions::default())
        .unwrap()
}

#[test]
fn test_insert_then_get_round_trips() {
    let service = service();
    let identity = Identity::new(ALPHA)
        .with_attribute("label", "Alpha")
        .with_attribute("email", "alpha@example.com");

    service
        .insert(&Principal::FullTrust, identity.clone(), MetaInput::default())
        .unwrap();

    let record = stored(&service, ALPHA);
    assert_eq!(record.identity, identity);
    assert_eq!(record.meta.sequence, 0);
    assert_eq!(record.meta.status, IdentityStatus::Active);
}

#[test]
fn test_duplicate_insert_rejected() {
    let service = service();
    insert_regular(&service, Identity::new(ALPHA));
    let err = service
        .insert(&Principal::FullTrust, Identity::new(ALPHA), MetaInput::default())
        .unwrap_err();
    assert!(err.is_duplicate());
}

#[test]
fn test_generate_resource_resolved_on_insert() {
    let service = service();
    let record = insert_regular(&service, Identity::new(ALPHA));

    let role = &record.meta.sys_resource_role[0];
    assert_eq!(role.resources(), Some(&[ALPHA.to_string()][..]));
    assert!(role.generate_resource.is_none());

    let json = serde_json::to_value(&stored(&service, ALPHA)).unwrap();
    assert!(!json.to_string().contains("generateResource"));
}

#[test]
fn test_unknown_directive_not_supported() {
    let service = service();
    let mut role = ResourceRole::new(REGULAR_ROLE);
    role.generate_resource = Some("owner".to_string());
    let err = service
        .insert(
            &Principal::FullTrust,
            Identity::new(ALPHA),
            MetaInput::default().with_resource_role(role),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotSupported(_)));
    assert!(!service.exists(&Principal::FullTrust, &IdentityId::new(ALPHA)).unwrap());
}

#[test]
fn test_unknown_role_not_supported() {
    let service = service();
    let err = service
        .insert(
            &Principal::FullTrust,
            Identity::new(ALPHA),
            MetaInput::default().with_resource_role(ResourceRole::new("identity.ghost")),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotSupported(_)));
}

#[test]
fn test_noop_update_roles_still_bumps_sequence() {
    let service = service();
    let before = insert_regular(&service, Identity::new(ALPHA));

    let after = service
        .update_roles(&Principal::FullTrust, UpdateRolesRequest::new(ALPHA, 0))
        .unwrap();

    assert_eq!(after.meta.sys_resource_role, before.meta.sys_resource_role);
    assert_eq!(after.meta.sequence, 1);
}

#[test]
fn test_regular_principal_cannot_self_grant() {
    let service = service();
    insert_regular(&service, Identity::new(ALPHA));
    insert_regular(&service, Identity::new(BETA));
    let alpha = act_as(&service, ALPHA);

    let err = service
        .update_roles(
            &alpha,
            UpdateRolesRequest::new(ALPHA, 0)
                .add(ResourceRole::new(REGULAR_ROLE).with_resource([BETA])),
        )
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));

    let err = service
        .update_roles(
            &alpha,
            UpdateRolesRequest::new(ALPHA, 0).add(ResourceRole::new(ADMIN_ROLE)),
        )
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));

    assert_eq!(stored(&service, ALPHA).meta.sequence, 0);
}

#[test]
fn test_group_owner_may_delegate_but_member_may_not() {
    let service = service();
    insert_regular(&service, Identity::new(OWNER));
    service
        .insert(
            &Principal::FullTrust,
            Identity::group(GROUP).with_owner(OWNER),
            MetaInput::default(),
        )
        .unwrap();
    insert_regular(&service, Identity::new(MEMBER).with_member_of(GROUP));
    insert_regular(&service, Identity::new(THIRD));

    let grant = ResourceRole::new(REGULAR_ROLE).with_resource([GROUP]);

    let member = act_as(&service, MEMBER);
    let err = service
        .update_roles(&member, UpdateRolesRequest::new(THIRD, 0).add(grant.clone()))
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));

    let owner = act_as(&service, OWNER);
    let record = service
        .update_roles(&owner, UpdateRolesRequest::new(THIRD, 0).add(grant))
        .unwrap();
    assert_eq!(
        record.meta.sys_resource_role[0].resources(),
        Some(&[THIRD.to_string(), GROUP.to_string()][..])
    );
}

#[test]
fn test_sequence_conflict_leaves_record_untouched() {
    let service = service();
    insert_regular(&service, Identity::new(ALPHA));
    let id = IdentityId::new(ALPHA);

    service
        .update(&Principal::FullTrust, &id, &IdentityPatch::new().add("/label", "one"), 0)
        .unwrap();
    service
        .update(&Principal::FullTrust, &id, &IdentityPatch::new().add("/label", "two"), 1)
        .unwrap();
    let before = stored(&service, ALPHA);
    assert_eq!(before.meta.sequence, 2);

    let err = service
        .update(&Principal::FullTrust, &id, &IdentityPatch::new().add("/label", "stale"), 1)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            expected: 1,
            actual: 2,
            ..
        }
    ));
    assert_eq!(stored(&service, ALPHA), before);
}

/// Store that lets one competing writer commit just before the first
/// conditional write.
struct RacingStore {
    inner: Arc<dyn IdentityStore>,
    raced: AtomicBool,
}

impl IdentityStore for RacingStore {
    fn find_one(&self, id: &IdentityId) -> warden::Result<Option<IdentityRecord>> {
        self.inner.find_one(id)
    }

    fn find_many(&self, ids: &[IdentityId]) -> warden::Result<Vec<IdentityRecord>> {
        self.inner.find_many(ids)
    }

    fn find(&self, filter: &IdentityFilter) -> warden::Result<Vec<IdentityRecord>> {
        self.inner.find(filter)
    }

    fn insert(&self, record: IdentityRecord) -> warden::Result<IdentityRecord> {
        self.inner.insert(record)
    }

    fn conditional_update(
        &self,
        id: &IdentityId,
        expected_sequence: u64,
        mutation: RecordMutation,
    ) -> warden::Result<u64> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let won = self.inner.conditional_update(
                id,
                expected_sequence,
                RecordMutation::Status(IdentityStatus::Deleted),
            )?;
            assert_eq!(won, 1);
        }
        self.inner.conditional_update(id, expected_sequence, mutation)
    }
}

#[test]
fn test_lost_write_race_reports_stored_sequence() {
    let store = Arc::new(RacingStore {
        inner: IdentityStorageFactory::create_in_memory().unwrap(),
        raced: AtomicBool::new(false),
    });
    let service = IdentityService::new(store, Arc::new(StaticRoleCatalog::builtin()))
        .with_event_bus(EventBus::new(16));
    insert_regular(&service, Identity::new(ALPHA));

    let err = service
        .update(
            &Principal::FullTrust,
            &IdentityId::new(ALPHA),
            &IdentityPatch::new().add("/label", "late"),
            0,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            expected: 0,
            actual: 1,
            ..
        }
    ));

    // only the competing write landed
    let record = stored(&service, ALPHA);
    assert_eq!(record.meta.sequence, 1);
    assert_eq!(record.meta.status, IdentityStatus::Deleted);
    assert!(record.identity.attributes.get("label").is_none());
}

#[test]
fn test_update_requires_permission() {
    let service = service();
    insert_regular(&service, Identity::new(ALPHA));
    insert_regular(&service, Identity::new(BETA));
    let beta = act_as(&service, BETA);

    let err = service
        .update(
            &beta,
            &IdentityId::new(ALPHA),
            &IdentityPatch::new().add("/label", "hijacked"),
            0,
        )
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));

    let alpha = act_as(&service, ALPHA);
    let record = service
        .update(
            &alpha,
            &IdentityId::new(ALPHA),
            &IdentityPatch::new().add("/label", "mine"),
            0,
        )
        .unwrap();
    assert_eq!(record.identity.attributes["label"], "mine");
    assert_eq!(record.meta.sequence, 1);
}

#[test]
fn test_update_rejects_disallowed_field() {
    let service = service();
    insert_regular(&service, Identity::new(ALPHA));
    let err = service
        .update(
            &Principal::FullTrust,
            &IdentityId::new(ALPHA),
            &IdentityPatch::new().add("/owner", BETA),
            0,
        )
        .unwrap_err();
    assert!(matches!(err, Error::ValidationError(_)));
}

#[test]
fn test_member_of_missing_group_not_allowed() {
    let service = service();
    let err = service
        .insert(
            &Principal::FullTrust,
            Identity::new(ALPHA).with_member_of(GROUP),
            regular_self(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotAllowed(_)));
    assert!(!service.exists(&Principal::FullTrust, &IdentityId::new(ALPHA)).unwrap());
}

#[test]
fn test_member_of_deleted_group_not_allowed() {
    let service = service();
    service
        .insert(&Principal::FullTrust, Identity::group(GROUP), MetaInput::default())
        .unwrap();
    service
        .set_status(&Principal::FullTrust, &IdentityId::new(GROUP), IdentityStatus::Deleted, 0)
        .unwrap();
    insert_regular(&service, Identity::new(ALPHA));

    let err = service
        .insert(
            &Principal::FullTrust,
            Identity::new(BETA).with_member_of(GROUP),
            regular_self(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotAllowed(_)));
    assert!(!service.exists(&Principal::FullTrust, &IdentityId::new(BETA)).unwrap());

    let before = stored(&service, ALPHA);
    let err = service
        .update(
            &Principal::FullTrust,
            &IdentityId::new(ALPHA),
            &IdentityPatch::new().add("/memberOf/-", GROUP),
            0,
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotAllowed(_)));
    assert_eq!(stored(&service, ALPHA), before);
}

#[test]
fn test_joining_group_requires_membership_permission() {
    let service = service();
    insert_regular(&service, Identity::new(OWNER));
    service
        .insert(
            &Principal::FullTrust,
            Identity::group(GROUP).with_owner(OWNER),
            MetaInput::default(),
        )
        .unwrap();
    insert_regular(&service, Identity::new(ALPHA));
    let join = IdentityPatch::new().add("/memberOf/-", GROUP);

    let alpha = act_as(&service, ALPHA);
    let err = service
        .update(&alpha, &IdentityId::new(ALPHA), &join, 0)
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));

    // the group's owner may add members to it
    let owner = act_as(&service, OWNER);
    service
        .update_roles(
            &owner,
            UpdateRolesRequest::new(ALPHA, 0)
                .add(ResourceRole::new(REGULAR_ROLE).with_resource([GROUP])),
        )
        .unwrap();
    let alpha = act_as(&service, ALPHA);
    let record = service
        .update(&alpha, &IdentityId::new(ALPHA), &join, 1)
        .unwrap();
    assert_eq!(record.identity.member_of, vec![IdentityId::new(GROUP)]);
}

#[test]
fn test_delegate_then_revoke() {
    let service = service();
    insert_regular(&service, Identity::new(ALPHA));
    insert_regular(&service, Identity::new(BETA));
    let alpha = act_as(&service, ALPHA);

    let granted = service
        .update_roles(
            &alpha,
            UpdateRolesRequest::new(BETA, 0)
                .add(ResourceRole::new(REGULAR_ROLE).with_resource([ALPHA])),
        )
        .unwrap();
    assert_eq!(granted.meta.sys_resource_role.len(), 1);
    assert_eq!(
        granted.meta.sys_resource_role[0].resources(),
        Some(&[BETA.to_string(), ALPHA.to_string()][..])
    );

    // beta can now act on alpha
    let beta = act_as(&service, BETA);
    assert!(
        service
            .get(&beta, &IdentityId::new(ALPHA), GetOptions::default())
            .is_ok()
    );

    let revoked = service
        .update_roles(
            &alpha,
            UpdateRolesRequest::new(BETA, 1)
                .remove(ResourceRole::new(REGULAR_ROLE).with_resource([ALPHA])),
        )
        .unwrap();
    assert_eq!(
        revoked.meta.sys_resource_role,
        vec![ResourceRole::new(REGULAR_ROLE).with_resource([BETA])]
    );

    let beta = act_as(&service, BETA);
    let err = service
        .get(&beta, &IdentityId::new(ALPHA), GetOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));
}

#[test]
fn test_revoke_requires_revoke_permission() {
    let service = service();
    insert_regular(&service, Identity::new(ALPHA));
    insert_regular(&service, Identity::new(BETA));
    insert_regular(&service, Identity::new(THIRD));

    service
        .update_roles(
            &Principal::FullTrust,
            UpdateRolesRequest::new(THIRD, 0)
                .add(ResourceRole::new(REGULAR_ROLE).with_resource([ALPHA])),
        )
        .unwrap();

    let removal = ResourceRole::new(REGULAR_ROLE).with_resource([ALPHA]);
    let beta = act_as(&service, BETA);
    let err = service
        .update_roles(&beta, UpdateRolesRequest::new(THIRD, 1).remove(removal.clone()))
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));

    // a revoke capability over alpha covers grants alpha never issued
    let alpha = act_as(&service, ALPHA);
    let record = service
        .update_roles(&alpha, UpdateRolesRequest::new(THIRD, 1).remove(removal))
        .unwrap();
    assert_eq!(
        record.meta.sys_resource_role,
        vec![ResourceRole::new(REGULAR_ROLE).with_resource([THIRD])]
    );
}

#[test]
fn test_update_role_single_entry() {
    let service = service();
    insert_regular(&service, Identity::new(ALPHA));

    let record = service
        .update_role(
            &Principal::FullTrust,
            UpdateRoleRequest {
                identity_id: IdentityId::new(ALPHA),
                role: ADMIN_ROLE.to_string(),
                resource_id: None,
                operation: RoleOperation::Add,
                sequence: 0,
            },
        )
        .unwrap();
    assert_eq!(record.meta.sys_resource_role.len(), 2);

    let record = service
        .update_role(
            &Principal::FullTrust,
            UpdateRoleRequest {
                identity_id: IdentityId::new(ALPHA),
                role: ADMIN_ROLE.to_string(),
                resource_id: None,
                operation: RoleOperation::Remove,
                sequence: 1,
            },
        )
        .unwrap();
    assert_eq!(record.meta.sys_resource_role.len(), 1);
    assert_eq!(record.meta.sequence, 2);
}

#[test]
fn test_status_round_trip_and_active_only() {
    let service = service();
    insert_regular(&service, Identity::new(ALPHA));
    let id = IdentityId::new(ALPHA);

    let deleted = service
        .set_status(&Principal::FullTrust, &id, IdentityStatus::Deleted, 0)
        .unwrap();
    assert_eq!(deleted.meta.status, IdentityStatus::Deleted);
    assert!(matches!(
        service
            .get(&Principal::FullTrust, &id, GetOptions::active())
            .unwrap_err(),
        Error::NotFound { .. }
    ));
    assert!(service.principal_for(&id).is_err());

    let restored = service
        .set_status(&Principal::FullTrust, &id, IdentityStatus::Active, 1)
        .unwrap();
    assert_eq!(restored.meta.status, IdentityStatus::Active);
    assert_eq!(restored.meta.sequence, 2);
}

#[test]
fn test_set_status_requires_meta_update() {
    let service = service();
    insert_regular(&service, Identity::new(ALPHA));
    let alpha = act_as(&service, ALPHA);
    let err = service
        .set_status(&alpha, &IdentityId::new(ALPHA), IdentityStatus::Deleted, 0)
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));
}

#[test]
fn test_get_denied_does_not_reveal_existence() {
    let service = service();
    insert_regular(&service, Identity::new(ALPHA));
    let alpha = act_as(&service, ALPHA);

    let missing = service
        .get(&alpha, &IdentityId::new("https://example.com/i/ghost"), GetOptions::default())
        .unwrap_err();
    assert!(matches!(missing, Error::PermissionDenied { .. }));
}

#[test]
fn test_get_all_requires_unrestricted_access() {
    let service = service();
    insert_regular(&service, Identity::new(ALPHA));
    service
        .insert(&Principal::FullTrust, Identity::group(GROUP), MetaInput::default())
        .unwrap();

    let alpha = act_as(&service, ALPHA);
    assert!(service.get_all(&alpha, &IdentityFilter::new()).is_err());

    let groups = service
        .get_all(&Principal::FullTrust, &IdentityFilter::new().with_kind("Group"))
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id().as_str(), GROUP);
}

#[test]
fn test_role_base_url_prefixes_relative_roles() {
    const BASE: &str = "https://example.com/roles";
    let catalog = StaticRoleCatalog::new(vec![
        Role::new(
            format!("{BASE}/{REGULAR_ROLE}"),
            REGULAR_PERMISSIONS.iter().copied(),
        ),
        Role::new(
            format!("{BASE}/identity%20viewer"),
            [IDENTITY_ACCESS],
        ),
    ]);
    let service = IdentityService::new(
        IdentityStorageFactory::create_in_memory().unwrap(),
        Arc::new(catalog),
    )
    .with_role_base_url(BASE)
    .with_event_bus(EventBus::new(16));

    let record = insert_regular(&service, Identity::new(ALPHA));
    assert_eq!(
        record.meta.sys_resource_role[0].sys_role,
        format!("{BASE}/{REGULAR_ROLE}")
    );
    insert_regular(&service, Identity::new(BETA));

    // relative ids in requests resolve against the same base
    let alpha = act_as(&service, ALPHA);
    let record = service
        .update_roles(
            &alpha,
            UpdateRolesRequest::new(BETA, 0)
                .add(ResourceRole::new(REGULAR_ROLE).with_resource([ALPHA])),
        )
        .unwrap();
    assert_eq!(record.meta.sys_resource_role.len(), 1);

    // role ids are percent-encoded before joining
    let record = service
        .insert(
            &Principal::FullTrust,
            Identity::new(THIRD),
            MetaInput::default()
                .with_resource_role(ResourceRole::new("identity viewer").generating_id()),
        )
        .unwrap();
    assert_eq!(
        record.meta.sys_resource_role[0].sys_role,
        format!("{BASE}/identity%20viewer")
    );
}

#[test]
fn test_events_published_after_commit() {
    let bus = EventBus::new(16);
    let service = IdentityService::in_memory()
        .unwrap()
        .with_event_bus(bus.clone());
    let mut inserted = bus.subscribe_event_type("inserted");
    let mut roles = bus.subscribe_event_type("roles_changed");

    insert_regular(&service, Identity::new(ALPHA));
    service
        .update_roles(
            &Principal::FullTrust,
            UpdateRolesRequest::new(ALPHA, 0).add(ResourceRole::new(ADMIN_ROLE)),
        )
        .unwrap();
    // rejected mutations publish nothing
    assert!(
        service
            .update_roles(&Principal::FullTrust, UpdateRolesRequest::new(ALPHA, 0))
            .is_err()
    );

    let event = inserted.try_recv().unwrap();
    assert_eq!(event.id().as_str(), ALPHA);
    assert!(inserted.try_recv().is_none());

    match roles.try_recv().unwrap() {
        IdentityEvent::RolesChanged {
            added, sequence, ..
        } => {
            assert_eq!(added, 1);
            assert_eq!(sequence, 1);
        },
        other => panic!("unexpected event {other:?}"),
    }
    assert!(roles.try_recv().is_none());
}

struct Stamp(AtomicUsize);

impl InsertHook for Stamp {
    fn name(&self) -> &'static str {
        "stamp"
    }

    fn pre_insert(&self, _actor: &Principal, mut draft: InsertDraft) -> warden::Result<InsertDraft> {
        draft.identity = draft.identity.with_attribute("description", "stamped");
        Ok(draft)
    }

    fn post_insert(&self, _actor: &Principal, _record: &IdentityRecord) -> warden::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Err(Error::InvalidInput("post hooks never fail the insert".to_string()))
    }
}

struct RejectGroups;

impl InsertHook for RejectGroups {
    fn name(&self) -> &'static str {
        "reject-groups"
    }

    fn pre_insert(&self, _actor: &Principal, draft: InsertDraft) -> warden::Result<InsertDraft> {
        if draft.identity.is_group() {
            return Err(Error::NotAllowed("groups are closed".to_string()));
        }
        Ok(draft)
    }
}

#[test]
fn test_insert_hooks() {
    let stamp = Arc::new(Stamp(AtomicUsize::new(0)));
    let service = service()
        .with_hook(stamp.clone())
        .with_hook(Arc::new(RejectGroups));

    let identity = Identity::new(ALPHA);
    let record = service
        .insert(&Principal::FullTrust, identity.clone(), regular_self())
        .unwrap();
    assert_eq!(record.identity.attributes["description"], "stamped");
    assert!(identity.attributes.is_empty());
    assert_eq!(stamp.0.load(Ordering::SeqCst), 1);

    let err = service
        .insert(&Principal::FullTrust, Identity::group(GROUP), MetaInput::default())
        .unwrap_err();
    assert!(matches!(err, Error::NotAllowed(_)));
    assert!(!service.exists(&Principal::FullTrust, &IdentityId::new(GROUP)).unwrap());
    assert_eq!(stamp.0.load(Ordering::SeqCst), 1);
}

#[test]
fn test_on_disk_service_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = WardenConfig::default().with_data_dir(dir.path().join("data"));
    config.identity.identities = vec![warden::config::SeedIdentity {
        identity: Identity::new(ALPHA),
        resource_roles: vec![ResourceRole::new(ADMIN_ROLE)],
        status: IdentityStatus::Active,
    }];

    {
        let service = IdentityService::from_config(&config).unwrap();
        assert_eq!(service.seed(&config.identity.identities).unwrap(), 1);
        assert_eq!(service.seed(&config.identity.identities).unwrap(), 0);
    }

    let service = IdentityService::from_config(&config).unwrap();
    let admin = service.principal_for(&IdentityId::new(ALPHA)).unwrap();
    service
        .insert(&admin, Identity::new(BETA), regular_self())
        .unwrap();
    assert_eq!(
        service
            .get_all(&admin, &IdentityFilter::new())
            .unwrap()
            .len(),
        2
    );
    assert!(dir.path().join("data").join("identities.db").exists());
}

//! Identity CLI commands.

// CLI commands are allowed to use println! for output
#![allow(clippy::print_stdout)]
// Command functions take owned arguments straight from clap
#![allow(clippy::needless_pass_by_value)]

use serde::Deserialize;

use super::args::{OutputFormat, parse_json, parse_roles, parse_status};
use crate::config::WardenConfig;
use crate::models::{
    Identity, IdentityFilter, IdentityId, IdentityPatch, IdentityRecord, MetaInput, Principal,
};
use crate::services::{GetOptions, IdentityService, UpdateRolesRequest};
use crate::{Error, Result};

/// Insert payload: the identity plus optional status and resource roles.
#[derive(Debug, Deserialize)]
struct InsertPayload {
    identity: Identity,
    #[serde(default)]
    meta: MetaInput,
}

/// Resolves the acting principal.
///
/// Without `--actor` the CLI acts with full trust, as an operator would.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the named actor is missing or deleted.
pub fn resolve_actor(service: &IdentityService, actor: Option<&str>) -> Result<Principal> {
    match actor {
        Some(id) => service.principal_for(&IdentityId::new(id)),
        None => Ok(Principal::FullTrust),
    }
}

/// Init command: creates the configured seed identities.
///
/// # Errors
///
/// Returns an error if a seed identity fails to insert.
pub fn cmd_init(
    service: &IdentityService,
    config: &WardenConfig,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let inserted = service.seed(&config.identity.identities)?;
    println!(
        "Initialized {} ({inserted} of {} seed identities inserted)",
        config.data_dir.display(),
        config.identity.identities.len()
    );
    Ok(())
}

/// Insert command.
///
/// `payload` is either an identity document or
/// `{"identity": {...}, "meta": {...}}`; `roles` adds resource roles.
///
/// # Errors
///
/// Returns an error if the payload is malformed or the insert is rejected.
pub fn cmd_insert(
    service: &IdentityService,
    actor: &Principal,
    payload: String,
    roles: Option<String>,
    format: OutputFormat,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (identity, mut meta) = parse_insert_payload(&payload)?;
    if let Some(roles) = roles {
        meta.sys_resource_role.extend(parse_roles(&roles)?);
    }
    let record = service.insert(actor, identity, meta)?;
    print_record(&record, format)
}

/// Get command.
///
/// # Errors
///
/// Returns an error if the identity is missing or not readable.
pub fn cmd_get(
    service: &IdentityService,
    actor: &Principal,
    id: String,
    active_only: bool,
    format: OutputFormat,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let options = if active_only {
        GetOptions::active()
    } else {
        GetOptions::default()
    };
    let record = service.get(actor, &IdentityId::new(id), options)?;
    print_record(&record, format)
}

/// List command.
///
/// # Errors
///
/// Returns an error if the actor may not list identities.
pub fn cmd_list(
    service: &IdentityService,
    actor: &Principal,
    filter: &IdentityFilter,
    format: OutputFormat,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let records = service.get_all(actor, filter)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No identities found.");
            }
            for record in &records {
                println!("{}", table_row(record));
            }
        },
    }
    Ok(())
}

/// Update command: applies a JSON patch.
///
/// # Errors
///
/// Returns an error if the patch is malformed or the update is rejected.
pub fn cmd_update(
    service: &IdentityService,
    actor: &Principal,
    id: String,
    sequence: u64,
    patch: String,
    format: OutputFormat,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let patch: IdentityPatch = parse_json("patch", &patch)?;
    let record = service.update(actor, &IdentityId::new(id), &patch, sequence)?;
    print_record(&record, format)
}

/// Status command.
///
/// # Errors
///
/// Returns an error if the status is unknown or the change is rejected.
pub fn cmd_status(
    service: &IdentityService,
    actor: &Principal,
    id: String,
    status: String,
    sequence: u64,
    format: OutputFormat,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let status = parse_status(&status)?;
    let record = service.set_status(actor, &IdentityId::new(id), status, sequence)?;
    print_record(&record, format)
}

/// Roles command: grants and revokes resource roles.
///
/// # Errors
///
/// Returns an error if the role lists are malformed or the change is
/// rejected.
pub fn cmd_roles(
    service: &IdentityService,
    actor: &Principal,
    id: String,
    sequence: u64,
    add: Option<String>,
    remove: Option<String>,
    format: OutputFormat,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut request = UpdateRolesRequest::new(id, sequence);
    if let Some(add) = add {
        request.add = parse_roles(&add)?;
    }
    if let Some(remove) = remove {
        request.remove = parse_roles(&remove)?;
    }
    let record = service.update_roles(actor, request)?;
    print_record(&record, format)
}

fn parse_insert_payload(text: &str) -> Result<(Identity, MetaInput)> {
    let value: serde_json::Value = parse_json("identity", text)?;
    if value.get("identity").is_some() {
        let payload: InsertPayload = serde_json::from_value(value)
            .map_err(|e| Error::InvalidInput(format!("invalid insert payload: {e}")))?;
        Ok((payload.identity, payload.meta))
    } else {
        let identity = serde_json::from_value(value)
            .map_err(|e| Error::InvalidInput(format!("invalid identity: {e}")))?;
        Ok((identity, MetaInput::default()))
    }
}

fn print_record(
    record: &IdentityRecord,
    format: OutputFormat,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Table => println!("{}", table_row(record)),
    }
    Ok(())
}

fn table_row(record: &IdentityRecord) -> String {
    format!(
        "{}\t{}\tseq={}\troles={}",
        record.id(),
        record.meta.status,
        record.meta.sequence,
        record.meta.sys_resource_role.len()
    )
}

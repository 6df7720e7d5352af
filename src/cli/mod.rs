//! CLI command implementations.
//!
//! The `warden` binary parses arguments with clap and dispatches to the
//! `cmd_*` functions here. Every command resolves the acting principal
//! first: `--actor <id>` acts as that stored identity, otherwise the
//! command runs with full trust.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `init` | Create the configured seed identities |
//! | `insert` | Insert an identity |
//! | `get` | Show one identity |
//! | `list` | List identities matching a filter |
//! | `update` | Patch identity attributes |
//! | `status` | Soft-delete or restore an identity |
//! | `roles` | Grant and revoke resource roles |
//!
//! # Example Usage
//!
//! ```bash
//! # Insert an identity that may act on itself
//! warden insert '{"id": "urn:a", "type": "Identity"}' \
//!     --roles '{"sysRole": "identity.regular", "generateResource": "id"}'
//!
//! # Let urn:a delegate its own capabilities to urn:b
//! warden --actor urn:a roles urn:b --sequence 0 \
//!     --add '{"sysRole": "identity.regular", "resource": "urn:a"}'
//! ```

mod args;
mod identity;

pub use args::{OutputFormat, build_filter, parse_json, parse_roles, parse_status};
pub use identity::{
    cmd_get, cmd_init, cmd_insert, cmd_list, cmd_roles, cmd_status, cmd_update, resolve_actor,
};

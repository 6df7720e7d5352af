//! Declarative identity patches.
//!
//! A patch is an ordered list of `add` / `replace` / `remove` operations
//! addressed by JSON-pointer paths. Only top-level attribute fields and one
//! level of array indexing are supported:
//!
//! | Path | Meaning |
//! |------|---------|
//! | `/label` | the `label` attribute |
//! | `/memberOf/-` | append to `memberOf` (`add` only) |
//! | `/memberOf/0` | element 0 of `memberOf` |
//!
//! Patches are applied to the stored identity, never blindly overwriting
//! it, and the result must still decode as an [`Identity`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::identity::Identity;
use crate::{Error, Result};

/// A patch operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Set a field, or insert/append into an array.
    Add,
    /// Replace an existing field or array element.
    Replace,
    /// Remove a field or array element.
    Remove,
}

/// A single patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// Operation kind.
    pub op: PatchOp,
    /// JSON-pointer path.
    pub path: String,
    /// Value for `add` / `replace`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// An ordered list of patch operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityPatch(Vec<PatchOperation>);

/// A parsed path: field name plus optional array position.
enum Target<'a> {
    Field(String),
    Element(String, &'a str),
}

impl IdentityPatch {
    /// Creates an empty patch.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an `add` operation.
    #[must_use]
    pub fn add(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push(PatchOperation {
            op: PatchOp::Add,
            path: path.into(),
            value: Some(value.into()),
        });
        self
    }

    /// Appends a `replace` operation.
    #[must_use]
    pub fn replace(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push(PatchOperation {
            op: PatchOp::Replace,
            path: path.into(),
            value: Some(value.into()),
        });
        self
    }

    /// Appends a `remove` operation.
    #[must_use]
    pub fn remove(mut self, path: impl Into<String>) -> Self {
        self.0.push(PatchOperation {
            op: PatchOp::Remove,
            path: path.into(),
            value: None,
        });
        self
    }

    /// Returns the operations.
    #[must_use]
    pub fn operations(&self) -> &[PatchOperation] {
        &self.0
    }

    /// Returns `true` if the patch has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the distinct top-level fields the patch touches.
    #[must_use]
    pub fn touched_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for op in &self.0 {
            if let Ok(target) = parse_path(&op.path) {
                let field = match target {
                    Target::Field(f) | Target::Element(f, _) => f,
                };
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }
        fields
    }

    /// Applies the patch to `identity`.
    ///
    /// `allowed_fields` lists the attribute fields that may change; `id`
    /// can never change regardless of the list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if a path is malformed, targets a
    /// field outside the allow-list, addresses a missing element, or the
    /// patched document no longer decodes as an identity.
    pub fn apply(&self, identity: &Identity, allowed_fields: &[String]) -> Result<Identity> {
        let Value::Object(mut doc) =
            serde_json::to_value(identity).map_err(|e| Error::OperationFailed {
                operation: "serialize_identity".to_string(),
                cause: e.to_string(),
            })?
        else {
            return Err(Error::ValidationError(
                "identity did not serialize to an object".to_string(),
            ));
        };

        for operation in &self.0 {
            apply_operation(&mut doc, operation, allowed_fields)?;
        }

        let patched: Identity = serde_json::from_value(Value::Object(doc))
            .map_err(|e| Error::ValidationError(format!("patched identity is invalid: {e}")))?;

        if patched.id != identity.id {
            return Err(Error::ValidationError("identity id is immutable".to_string()));
        }
        Ok(patched)
    }
}

impl From<Vec<PatchOperation>> for IdentityPatch {
    fn from(ops: Vec<PatchOperation>) -> Self {
        Self(ops)
    }
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn parse_path(path: &str) -> Result<Target<'_>> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(Error::ValidationError(format!(
            "patch path must start with '/': {path}"
        )));
    };
    let mut segments = rest.splitn(2, '/');
    let field = segments.next().unwrap_or_default();
    if field.is_empty() {
        return Err(Error::ValidationError("patch path names no field".to_string()));
    }
    match segments.next() {
        None => Ok(Target::Field(unescape(field))),
        Some(index) if !index.contains('/') => Ok(Target::Element(unescape(field), index)),
        Some(_) => Err(Error::ValidationError(format!(
            "nested patch paths are not supported: {path}"
        ))),
    }
}

fn require_value(operation: &PatchOperation) -> Result<Value> {
    operation.value.clone().ok_or_else(|| {
        Error::ValidationError(format!("'{}' requires a value", operation.path))
    })
}

fn apply_operation(
    doc: &mut Map<String, Value>,
    operation: &PatchOperation,
    allowed_fields: &[String],
) -> Result<()> {
    let target = parse_path(&operation.path)?;
    let field = match &target {
        Target::Field(f) | Target::Element(f, _) => f,
    };
    if field == "id" || !allowed_fields.iter().any(|allowed| allowed == field) {
        return Err(Error::ValidationError(format!(
            "field '{field}' may not be updated"
        )));
    }

    match (target, operation.op) {
        (Target::Field(field), PatchOp::Add) => {
            doc.insert(field, require_value(operation)?);
        },
        (Target::Field(field), PatchOp::Replace) => {
            if !doc.contains_key(&field) {
                return Err(Error::ValidationError(format!(
                    "cannot replace missing field '{field}'"
                )));
            }
            doc.insert(field, require_value(operation)?);
        },
        (Target::Field(field), PatchOp::Remove) => {
            if doc.remove(&field).is_none() {
                return Err(Error::ValidationError(format!(
                    "cannot remove missing field '{field}'"
                )));
            }
        },
        (Target::Element(field, index), op) => {
            let entry = doc
                .entry(field.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            // a scalar stands for a one-element list
            if !entry.is_array() {
                let scalar = entry.take();
                *entry = Value::Array(vec![scalar]);
            }
            let Value::Array(items) = entry else {
                return Err(Error::ValidationError(format!("'{field}' is not a list")));
            };
            apply_element(items, &field, index, op, operation)?;
        },
    }
    Ok(())
}

fn apply_element(
    items: &mut Vec<Value>,
    field: &str,
    index: &str,
    op: PatchOp,
    operation: &PatchOperation,
) -> Result<()> {
    if index == "-" {
        if op != PatchOp::Add {
            return Err(Error::ValidationError(format!(
                "'{field}/-' only supports add"
            )));
        }
        items.push(require_value(operation)?);
        return Ok(());
    }

    let position: usize = index
        .parse()
        .map_err(|_| Error::ValidationError(format!("invalid index '{index}' for '{field}'")))?;
    let in_bounds = position < items.len();
    match op {
        PatchOp::Add if position <= items.len() => items.insert(position, require_value(operation)?),
        PatchOp::Replace if in_bounds => items[position] = require_value(operation)?,
        PatchOp::Remove if in_bounds => {
            items.remove(position);
        },
        _ => {
            return Err(Error::ValidationError(format!(
                "index {position} out of bounds for '{field}'"
            )));
        },
    }
    Ok(())
}

//! Serde adapters for fields that accept a scalar or a list.
//!
//! Identity documents in the wild carry `"type": "Identity"` as often as
//! `"type": ["Identity", "Group"]`; both decode to a `Vec`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Deserializes a scalar or list into a `Vec`.
pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    OneOrMany::deserialize(deserializer).map(Into::into)
}

/// Serializes a single-element list as a scalar.
#[allow(clippy::ptr_arg)]
pub fn serialize<S, T>(values: &Vec<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    match values.as_slice() {
        [single] => single.serialize(serializer),
        _ => values.serialize(serializer),
    }
}

/// Optional variant: absent or `null` stays `None`.
pub mod option {
    use super::OneOrMany;
    use serde::{Deserialize, Deserializer};

    /// Deserializes an optional scalar or list.
    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<OneOrMany<T>>::deserialize(deserializer).map(|v| v.map(Into::into))
    }
}

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::DecodeError;

/// Per-bot state the parser needs: the bot's own username, resolved once at startup.
#[derive(Clone, Debug, Default)]
pub struct DecodeContext {
    pub own_username: String,
}

impl DecodeContext {
    pub fn new(own_username: impl Into<String>) -> Self {
        Self {
            own_username: own_username.into(),
        }
    }
}

/// Wire entity decoded with serde, then resolved against the bot's own identity.
pub trait Decode: DeserializeOwned {
    const ENTITY: &'static str;

    /// Fill derived fields that depend on context (command spans, `cmd`/`args`).
    fn resolve(&mut self, _ctx: &DecodeContext) {}

    fn decode(value: &Value, ctx: &DecodeContext) -> Result<Self, DecodeError> {
        if !value.is_object() {
            return Err(DecodeError::NotAnObject {
                entity: Self::ENTITY,
            });
        }
        let mut decoded =
            Self::deserialize(value).map_err(|e| DecodeError::from_serde(Self::ENTITY, &e))?;
        decoded.resolve(ctx);
        Ok(decoded)
    }
}

/// `deserialize_with` for optional nested entities. A malformed value is logged and
/// stored as `None`, so it never fails the object that carries it.
pub(crate) fn lenient<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Some(raw) = Option::<Value>::deserialize(de)? else {
        return Ok(None);
    };
    match T::deserialize(raw) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            tracing::warn!(
                entity = std::any::type_name::<T>(),
                "dropping malformed nested object: {e}"
            );
            Ok(None)
        }
    }
}

/// `deserialize_with` treating an explicit `null` like an absent field.
pub(crate) fn nullable<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Inner {
        name: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thing {
        id: i64,
        label: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        inner: Option<Inner>,
        #[serde(default, deserialize_with = "nullable")]
        tags: Vec<String>,
    }

    impl Decode for Thing {
        const ENTITY: &'static str = "Thing";
    }

    fn ctx() -> DecodeContext {
        DecodeContext::default()
    }

    #[test]
    fn null_counts_as_absent() {
        let thing = Thing::decode(
            &json!({"id": 3, "label": null, "inner": null, "tags": null}),
            &ctx(),
        )
        .unwrap();
        assert_eq!(
            thing,
            Thing {
                id: 3,
                label: None,
                inner: None,
                tags: Vec::new()
            }
        );
    }

    #[test]
    fn reports_missing_and_malformed_fields() {
        assert_eq!(
            Thing::decode(&json!({"label": "x"}), &ctx()).unwrap_err(),
            DecodeError::MissingField {
                entity: "Thing",
                field: "id".to_string()
            }
        );
        assert!(matches!(
            Thing::decode(&json!({"id": "x"}), &ctx()),
            Err(DecodeError::Malformed { entity: "Thing", .. })
        ));
        assert_eq!(
            Thing::decode(&json!([1]), &ctx()).unwrap_err(),
            DecodeError::NotAnObject { entity: "Thing" }
        );
    }

    #[test]
    fn malformed_optional_nested_entity_becomes_none() {
        let thing = Thing::decode(&json!({"id": 1, "inner": {"nom": "?"}}), &ctx()).unwrap();
        assert_eq!(thing.inner, None);

        let thing = Thing::decode(&json!({"id": 1, "inner": {"name": "ok"}}), &ctx()).unwrap();
        assert_eq!(
            thing.inner,
            Some(Inner {
                name: "ok".to_string()
            })
        );
    }
}

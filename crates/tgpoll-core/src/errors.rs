/// Core error type.
///
/// Adapter crates map their transport-specific failures into this type so the
/// poller can treat every failed fetch the same way (log, back off, retry).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// Network or timeout failure while talking to the bot API.
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered `ok: false` for a call whose result is mandatory.
    #[error("api call {method} returned no result")]
    Api { method: String },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("external error: {0}")]
    External(String),
}

/// Structured outcome of decoding one wire object into a typed entity.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("{entity}: expected a JSON object")]
    NotAnObject { entity: &'static str },

    #[error("{entity}: missing required field `{field}`")]
    MissingField { entity: &'static str, field: String },

    #[error("{entity}: {detail}")]
    Malformed { entity: &'static str, detail: String },
}

impl DecodeError {
    /// Classify a serde failure raised while decoding `entity`.
    pub fn from_serde(entity: &'static str, err: &serde_json::Error) -> Self {
        let detail = err.to_string();
        let missing = detail
            .strip_prefix("missing field `")
            .and_then(|rest| rest.split('`').next());
        match missing {
            Some(field) => Self::MissingField {
                entity,
                field: field.to_string(),
            },
            None => Self::Malformed { entity, detail },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

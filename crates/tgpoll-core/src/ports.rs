use async_trait::async_trait;

use crate::Result;

/// Form parameters of one outbound API call, in order.
pub type Params = Vec<(&'static str, String)>;

/// Hexagonal port for the bot API transport.
///
/// `Ok(None)` is a soft API failure (`ok: false` on the wire); the remote error
/// detail is not surfaced. `Err` is a network/timeout class failure.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: &str, params: Params) -> Result<Option<serde_json::Value>>;
}

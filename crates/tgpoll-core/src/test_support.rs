use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    bot::Bot,
    domain::UserId,
    model::User,
    ports::{Params, Transport},
    Result,
};

#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub method: String,
    pub params: Params,
    pub at: Instant,
}

/// Transport that replays scripted replies in order.
///
/// Once the script runs out it answers an empty batch and cancels `shutdown`, so a
/// poller under test stops after the last scripted reply.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Option<Value>>>>,
    calls: Mutex<Vec<RecordedCall>>,
    shutdown: Option<CancellationToken>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<Option<Value>>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn stopping(replies: Vec<Result<Option<Value>>>, shutdown: CancellationToken) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            shutdown: Some(shutdown),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, method: &str, params: Params) -> Result<Option<Value>> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            params,
            at: Instant::now(),
        });
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply,
            None => {
                if let Some(token) = &self.shutdown {
                    token.cancel();
                }
                Ok(Some(json!([])))
            }
        }
    }
}

pub fn test_bot(transport: Arc<dyn Transport>) -> Bot {
    Bot::with_identity(
        transport,
        User {
            id: UserId(42),
            first_name: "Bot".to_string(),
            last_name: None,
            username: Some("Bot1".to_string()),
        },
    )
}

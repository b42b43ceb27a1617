use std::{sync::Arc, time::Duration};

use serde_json::Value;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    errors::{DecodeError, Error},
    model::{Chat, ChatMember, Decode, DecodeContext, Message, User},
    ports::{Params, Transport},
    Result,
};

/// Cheap-to-clone handle over the transport plus the bot's own identity.
///
/// Handlers receive a `Bot` so they can call back into the API.
#[derive(Clone)]
pub struct Bot {
    transport: Arc<dyn Transport>,
    me: Arc<User>,
    ctx: Arc<DecodeContext>,
}

impl Bot {
    /// Resolve the bot's identity via `getMe`. The username is fixed from here on.
    pub async fn connect(transport: Arc<dyn Transport>) -> Result<Self> {
        let raw = transport
            .call("getMe", Vec::new())
            .await?
            .ok_or_else(|| Error::Api {
                method: "getMe".to_string(),
            })?;
        let me = User::decode(&raw, &DecodeContext::default())?;
        if me.username.is_none() {
            return Err(Error::Config("bot account has no username".to_string()));
        }
        Ok(Self::with_identity(transport, me))
    }

    pub fn with_identity(transport: Arc<dyn Transport>, me: User) -> Self {
        let ctx = DecodeContext::new(me.username.clone().unwrap_or_default());
        Self {
            transport,
            me: Arc::new(me),
            ctx: Arc::new(ctx),
        }
    }

    pub fn me(&self) -> &User {
        &self.me
    }

    pub fn username(&self) -> &str {
        &self.ctx.own_username
    }

    pub fn decode_context(&self) -> &DecodeContext {
        &self.ctx
    }

    /// Raw API call; `Ok(None)` means the API answered `ok: false`.
    pub async fn call(&self, method: &str, params: Params) -> Result<Option<Value>> {
        self.transport.call(method, params).await
    }

    /// Long-poll fetch. `Ok(None)` is a soft failure.
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Option<Vec<Value>>> {
        let params = vec![
            ("offset", offset.to_string()),
            ("timeout", timeout.as_secs().to_string()),
        ];
        self.call("getUpdates", params)
            .await?
            .map(|result| into_array("getUpdates", result))
            .transpose()
    }

    pub async fn get_chat(&self, chat_id: ChatId) -> Result<Option<Chat>> {
        let params = vec![("chat_id", chat_id.0.to_string())];
        self.call("getChat", params)
            .await?
            .map(|v| Chat::decode(&v, &self.ctx))
            .transpose()
            .map_err(Error::from)
    }

    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<Option<Message>> {
        let params = vec![("chat_id", chat_id.0.to_string()), ("text", text.to_string())];
        let sent = self.call("sendMessage", params).await?;
        self.decode_sent(sent)
    }

    pub async fn edit_message_text(&self, msg: MessageRef, text: &str) -> Result<Option<Message>> {
        let params = vec![
            ("chat_id", msg.chat_id.0.to_string()),
            ("message_id", msg.message_id.0.to_string()),
            ("text", text.to_string()),
        ];
        let edited = self.call("editMessageText", params).await?;
        self.decode_sent(edited)
    }

    pub async fn delete_message(&self, msg: MessageRef) -> Result<bool> {
        let params = vec![
            ("chat_id", msg.chat_id.0.to_string()),
            ("message_id", msg.message_id.0.to_string()),
        ];
        Ok(is_true(self.call("deleteMessage", params).await?))
    }

    /// Administrators of a chat, as the users behind each member record.
    /// `None` when the API refuses the call.
    pub async fn get_chat_administrators(&self, chat_id: ChatId) -> Result<Option<Vec<User>>> {
        let params = vec![("chat_id", chat_id.0.to_string())];
        let Some(result) = self.call("getChatAdministrators", params).await? else {
            return Ok(None);
        };
        let users = into_array("getChatAdministrators", result)?
            .iter()
            .map(|m| Ok(ChatMember::decode(m, &self.ctx)?.user))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(users))
    }

    pub async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<bool> {
        let mut params = vec![("callback_query_id", callback_id.to_string())];
        if let Some(t) = text {
            params.push(("text", t.to_string()));
        }
        Ok(is_true(self.call("answerCallbackQuery", params).await?))
    }

    // editMessageText answers `true` instead of a message for inline messages.
    fn decode_sent(&self, result: Option<Value>) -> Result<Option<Message>> {
        match result {
            Some(v @ Value::Object(_)) => Ok(Some(Message::decode(&v, &self.ctx)?)),
            _ => Ok(None),
        }
    }
}

fn into_array(method: &'static str, result: Value) -> Result<Vec<Value>> {
    match result {
        Value::Array(items) => Ok(items),
        other => Err(DecodeError::Malformed {
            entity: method,
            detail: format!("expected an array result, got {other}"),
        }
        .into()),
    }
}

fn is_true(result: Option<Value>) -> bool {
    matches!(result, Some(Value::Bool(true)))
}

impl Chat {
    pub async fn send_message(&self, bot: &Bot, text: &str) -> Result<Option<Message>> {
        bot.send_message(self.id, text).await
    }

    pub async fn edit_message_text(
        &self,
        bot: &Bot,
        message_id: MessageId,
        text: &str,
    ) -> Result<Option<Message>> {
        bot.edit_message_text(self.message_ref(message_id), text)
            .await
    }

    pub async fn delete_message(&self, bot: &Bot, message_id: MessageId) -> Result<bool> {
        bot.delete_message(self.message_ref(message_id)).await
    }

    pub async fn administrators(&self, bot: &Bot) -> Result<Option<Vec<User>>> {
        bot.get_chat_administrators(self.id).await
    }

    fn message_ref(&self, message_id: MessageId) -> MessageRef {
        MessageRef {
            chat_id: self.id,
            message_id,
        }
    }
}

use serde::Deserialize;
use serde_json::Value;

use crate::{
    domain::{ChatId, MessageId, UpdateId, UserId},
    model::{
        command::{command_args, command_at, BotCommand},
        decode::{lenient, nullable, Decode, DecodeContext},
    },
};

pub const BOT_COMMAND: &str = "bot_command";

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl Decode for User {
    const ENTITY: &'static str = "User";
}

/// Chat snapshot. Outbound calls on a chat live in [`crate::bot`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Decode for Chat {
    const ENTITY: &'static str = "Chat";
}

/// One row of `getChatAdministrators`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatMember {
    pub user: User,
    #[serde(default)]
    pub status: String,
}

impl Decode for ChatMember {
    const ENTITY: &'static str = "ChatMember";
}

/// Annotation over a span of message text. Once resolved, `end == offset + length`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: i64,
    pub length: i64,
    #[serde(skip)]
    pub end: i64,
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub user: Option<User>,
    /// Set only for `bot_command` entities whose span matches the command pattern.
    #[serde(skip)]
    pub command: Option<BotCommand>,
}

impl MessageEntity {
    /// Entities need the message text to resolve command spans.
    fn resolve(&mut self, text: Option<&str>) {
        self.end = self.offset.saturating_add(self.length);
        self.command = match text {
            Some(text) if self.kind == BOT_COMMAND => command_at(text, self.offset, self.end),
            _ => None,
        };
    }

    pub fn cmd(&self) -> Option<&str> {
        self.command.as_ref().map(|c| c.name.as_str())
    }

    pub fn cmd_target(&self) -> Option<&str> {
        self.command.as_ref().and_then(|c| c.target.as_deref())
    }
}

/// Media and contact payloads carried through without interpretation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Attachments {
    pub audio: Option<Value>,
    pub document: Option<Value>,
    pub photo: Option<Value>,
    pub sticker: Option<Value>,
    pub video: Option<Value>,
    pub voice: Option<Value>,
    pub caption: Option<String>,
    pub contact: Option<Value>,
    pub location: Option<Value>,
    pub venue: Option<Value>,
}

/// Chat service events. Only the member changes are typed.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ServiceEvents {
    #[serde(default, deserialize_with = "lenient")]
    pub new_chat_member: Option<User>,
    #[serde(default, deserialize_with = "lenient")]
    pub left_chat_member: Option<User>,
    pub new_chat_title: Option<Value>,
    pub new_chat_photo: Option<Value>,
    pub delete_chat_photo: Option<Value>,
    pub group_chat_created: Option<Value>,
    pub supergroup_chat_created: Option<Value>,
    pub channel_chat_created: Option<Value>,
    pub migrate_to_chat_id: Option<Value>,
    pub migrate_from_chat_id: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Message {
    #[serde(rename = "message_id")]
    pub id: MessageId,
    #[serde(rename = "from", default, deserialize_with = "lenient")]
    pub from_user: Option<User>,
    /// Unix seconds.
    pub date: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub chat: Option<Chat>,
    #[serde(default, deserialize_with = "lenient")]
    pub forward_from: Option<User>,
    #[serde(default, deserialize_with = "lenient")]
    pub forward_from_chat: Option<Chat>,
    pub forward_date: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub reply_to_message: Option<Box<Message>>,
    pub edit_date: Option<i64>,
    pub text: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub entities: Vec<MessageEntity>,
    /// Lowercased command name, when the text starts with a command addressed to us.
    #[serde(skip)]
    pub cmd: Option<String>,
    /// Text after the command; set together with `cmd`.
    #[serde(skip)]
    pub args: Option<String>,
    #[serde(flatten)]
    pub attachments: Attachments,
    #[serde(flatten)]
    pub service: ServiceEvents,
    #[serde(default, deserialize_with = "lenient")]
    pub pinned_message: Option<Box<Message>>,
}

impl Message {
    pub fn chat_id(&self) -> Option<ChatId> {
        self.chat.as_ref().map(|c| c.id)
    }
}

impl Decode for Message {
    const ENTITY: &'static str = "Message";

    fn resolve(&mut self, ctx: &DecodeContext) {
        let text = self.text.as_deref();
        for entity in &mut self.entities {
            entity.resolve(text);
        }

        let routed = self
            .entities
            .iter()
            .filter(|e| e.kind == BOT_COMMAND && e.offset == 0)
            .find_map(|e| {
                let c = e.command.as_ref()?;
                c.is_addressed_to(&ctx.own_username)
                    .then(|| (c.name.to_lowercase(), e.end))
            });
        if let (Some((cmd, end)), Some(text)) = (routed, text) {
            self.args = Some(command_args(text, end));
            self.cmd = Some(cmd);
        }

        if let Some(reply) = self.reply_to_message.as_deref_mut() {
            reply.resolve(ctx);
        }
        if let Some(pinned) = self.pinned_message.as_deref_mut() {
            pinned.resolve(ctx);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    #[serde(rename = "from")]
    pub from_user: User,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<Message>,
    pub chat_instance: String,
    pub data: Option<String>,
}

impl Decode for CallbackQuery {
    const ENTITY: &'static str = "CallbackQuery";

    fn resolve(&mut self, ctx: &DecodeContext) {
        if let Some(msg) = self.message.as_mut() {
            msg.resolve(ctx);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    #[serde(rename = "from")]
    pub from_user: User,
    pub location: Option<Value>,
    pub query: String,
    pub offset: String,
}

impl Decode for InlineQuery {
    const ENTITY: &'static str = "InlineQuery";
}

/// Top-level envelope of one inbound event.
///
/// The routable variants are decoded strictly: if one is malformed the whole
/// update is rejected and the poller skips it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Update {
    #[serde(rename = "update_id")]
    pub id: UpdateId,
    pub message: Option<Message>,
    pub edited_message: Option<Message>,
    pub inline_query: Option<InlineQuery>,
    pub chosen_inline_result: Option<Value>,
    pub callback_query: Option<CallbackQuery>,
}

impl Update {
    /// Read just the `update_id` of a raw update, even one that fails to decode.
    pub fn peek_id(value: &Value) -> Option<UpdateId> {
        value.get("update_id").and_then(Value::as_i64).map(UpdateId)
    }
}

impl Decode for Update {
    const ENTITY: &'static str = "Update";

    fn resolve(&mut self, ctx: &DecodeContext) {
        for msg in [self.message.as_mut(), self.edited_message.as_mut()]
            .into_iter()
            .flatten()
        {
            msg.resolve(ctx);
        }
        if let Some(cb) = self.callback_query.as_mut() {
            cb.resolve(ctx);
        }
    }
}

//! Handler registry: routing keys to user handlers.
//!
//! Populated during setup, then frozen behind an `Arc` and only read while dispatching.

use std::{collections::HashMap, future::Future, sync::Arc};

use async_trait::async_trait;

use crate::{
    bot::Bot,
    domain::ChatId,
    model::{CallbackQuery, InlineQuery, Message},
};

pub type HandlerResult = anyhow::Result<()>;

/// A user handler for one kind of inbound object.
///
/// Implemented for any `Fn(Bot, T) -> impl Future<Output = HandlerResult>`.
#[async_trait]
pub trait Handler<T: Send + 'static>: Send + Sync {
    async fn handle(&self, bot: Bot, item: T) -> HandlerResult;
}

#[async_trait]
impl<T, F, Fut> Handler<T> for F
where
    T: Send + 'static,
    F: Fn(Bot, T) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, bot: Bot, item: T) -> HandlerResult {
        (self)(bot, item).await
    }
}

pub type MessageHandler = Arc<dyn Handler<Message>>;
pub type InlineQueryHandler = Arc<dyn Handler<InlineQuery>>;
pub type CallbackQueryHandler = Arc<dyn Handler<CallbackQuery>>;

/// Names the slot a registration filled; pass it to [`HandlerRegistry::unregister`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HandlerSlot {
    ChatCommand(ChatId, String),
    Command(String),
    ChatFallback(ChatId),
    Fallback,
    InlineQuery,
    CallbackQuery,
}

#[derive(Default)]
pub struct HandlerRegistry {
    chat_commands: HashMap<(ChatId, String), MessageHandler>,
    commands: HashMap<String, MessageHandler>,
    chat_fallbacks: HashMap<ChatId, MessageHandler>,
    fallback: Option<MessageHandler>,
    inline_query: Option<InlineQueryHandler>,
    callback_query: Option<CallbackQueryHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command handler for every chat. Names are matched lowercased.
    pub fn on_command(
        &mut self,
        name: &str,
        handler: impl Handler<Message> + 'static,
    ) -> HandlerSlot {
        let name = name.to_lowercase();
        self.commands.insert(name.clone(), Arc::new(handler));
        HandlerSlot::Command(name)
    }

    /// Command handler for one chat; wins over a global command of the same name.
    pub fn on_chat_command(
        &mut self,
        chat_id: ChatId,
        name: &str,
        handler: impl Handler<Message> + 'static,
    ) -> HandlerSlot {
        let name = name.to_lowercase();
        self.chat_commands
            .insert((chat_id, name.clone()), Arc::new(handler));
        HandlerSlot::ChatCommand(chat_id, name)
    }

    /// Catch-all for messages in one chat that no command handler took.
    pub fn on_chat_message(
        &mut self,
        chat_id: ChatId,
        handler: impl Handler<Message> + 'static,
    ) -> HandlerSlot {
        self.chat_fallbacks.insert(chat_id, Arc::new(handler));
        HandlerSlot::ChatFallback(chat_id)
    }

    /// Catch-all for any message nothing else took.
    pub fn on_message(&mut self, handler: impl Handler<Message> + 'static) -> HandlerSlot {
        self.fallback = Some(Arc::new(handler));
        HandlerSlot::Fallback
    }

    pub fn on_inline_query(
        &mut self,
        handler: impl Handler<InlineQuery> + 'static,
    ) -> HandlerSlot {
        self.inline_query = Some(Arc::new(handler));
        HandlerSlot::InlineQuery
    }

    pub fn on_callback_query(
        &mut self,
        handler: impl Handler<CallbackQuery> + 'static,
    ) -> HandlerSlot {
        self.callback_query = Some(Arc::new(handler));
        HandlerSlot::CallbackQuery
    }

    /// Clear a slot. Returns whether a handler was registered there.
    pub fn unregister(&mut self, slot: &HandlerSlot) -> bool {
        match slot {
            HandlerSlot::ChatCommand(chat_id, name) => self
                .chat_commands
                .remove(&(*chat_id, name.clone()))
                .is_some(),
            HandlerSlot::Command(name) => self.commands.remove(name).is_some(),
            HandlerSlot::ChatFallback(chat_id) => self.chat_fallbacks.remove(chat_id).is_some(),
            HandlerSlot::Fallback => self.fallback.take().is_some(),
            HandlerSlot::InlineQuery => self.inline_query.take().is_some(),
            HandlerSlot::CallbackQuery => self.callback_query.take().is_some(),
        }
    }

    /// Pick the handler for a message, highest priority first:
    /// per-chat command, global command, per-chat catch-all, global catch-all.
    pub fn route_message(&self, msg: &Message) -> Option<(HandlerSlot, MessageHandler)> {
        let chat_id = msg.chat_id();

        if let Some(cmd) = msg.cmd.as_deref() {
            if let Some(chat_id) = chat_id {
                if let Some(h) = self.chat_commands.get(&(chat_id, cmd.to_string())) {
                    return Some((HandlerSlot::ChatCommand(chat_id, cmd.to_string()), h.clone()));
                }
            }
            if let Some(h) = self.commands.get(cmd) {
                return Some((HandlerSlot::Command(cmd.to_string()), h.clone()));
            }
        }

        if let Some(chat_id) = chat_id {
            if let Some(h) = self.chat_fallbacks.get(&chat_id) {
                return Some((HandlerSlot::ChatFallback(chat_id), h.clone()));
            }
        }

        self.fallback
            .as_ref()
            .map(|h| (HandlerSlot::Fallback, h.clone()))
    }

    pub fn inline_query_handler(&self) -> Option<InlineQueryHandler> {
        self.inline_query.clone()
    }

    pub fn callback_query_handler(&self) -> Option<CallbackQueryHandler> {
        self.callback_query.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::MessageId, model::Chat};

    async fn noop(_bot: Bot, _msg: Message) -> HandlerResult {
        Ok(())
    }

    fn message(chat: i64, cmd: Option<&str>) -> Message {
        Message {
            id: MessageId(1),
            from_user: None,
            date: 0,
            chat: Some(Chat {
                id: ChatId(chat),
                kind: "group".to_string(),
                title: None,
                username: None,
                first_name: None,
                last_name: None,
            }),
            forward_from: None,
            forward_from_chat: None,
            forward_date: None,
            reply_to_message: None,
            edit_date: None,
            text: None,
            entities: Vec::new(),
            cmd: cmd.map(str::to_string),
            args: cmd.map(|_| String::new()),
            attachments: Default::default(),
            service: Default::default(),
            pinned_message: None,
        }
    }

    fn slot(reg: &HandlerRegistry, msg: &Message) -> Option<HandlerSlot> {
        reg.route_message(msg).map(|(s, _)| s)
    }

    #[test]
    fn priority_walks_down_the_levels() {
        let mut reg = HandlerRegistry::new();
        let chat_cmd = reg.on_chat_command(ChatId(1), "Hello", noop);
        let cmd = reg.on_command("hello", noop);
        let chat_any = reg.on_chat_message(ChatId(1), noop);
        let any = reg.on_message(noop);

        let msg = message(1, Some("hello"));
        assert_eq!(slot(&reg, &msg), Some(chat_cmd.clone()));
        assert!(reg.unregister(&chat_cmd));
        assert_eq!(slot(&reg, &msg), Some(cmd.clone()));
        assert!(reg.unregister(&cmd));
        assert_eq!(slot(&reg, &msg), Some(chat_any.clone()));
        assert!(reg.unregister(&chat_any));
        assert_eq!(slot(&reg, &msg), Some(any.clone()));
        assert!(reg.unregister(&any));
        assert_eq!(slot(&reg, &msg), None);
        assert!(!reg.unregister(&any));
    }

    #[test]
    fn chat_scoped_handlers_stay_in_their_chat() {
        let mut reg = HandlerRegistry::new();
        reg.on_chat_command(ChatId(42), "boop", noop);
        reg.on_chat_message(ChatId(42), noop);

        assert!(slot(&reg, &message(42, Some("boop"))).is_some());
        assert_eq!(slot(&reg, &message(7, Some("boop"))), None);
        assert_eq!(slot(&reg, &message(7, None)), None);
    }

    #[test]
    fn plain_messages_skip_command_levels() {
        let mut reg = HandlerRegistry::new();
        reg.on_command("hello", noop);
        assert_eq!(slot(&reg, &message(1, None)), None);

        let any = reg.on_message(noop);
        assert_eq!(slot(&reg, &message(1, None)), Some(any));
    }

    #[test]
    fn registration_names_are_lowercased() {
        let mut reg = HandlerRegistry::new();
        assert_eq!(
            reg.on_command("HeLLo", noop),
            HandlerSlot::Command("hello".to_string())
        );
        assert!(slot(&reg, &message(1, Some("hello"))).is_some());
    }

    #[test]
    fn query_slots_hold_one_handler() {
        let mut reg = HandlerRegistry::new();
        assert!(reg.inline_query_handler().is_none());
        reg.on_inline_query(|_bot: Bot, _q: InlineQuery| async { HandlerResult::Ok(()) });
        reg.on_callback_query(|_bot: Bot, _q: CallbackQuery| async { HandlerResult::Ok(()) });
        assert!(reg.inline_query_handler().is_some());
        assert!(reg.callback_query_handler().is_some());
        assert!(reg.unregister(&HandlerSlot::CallbackQuery));
        assert!(reg.callback_query_handler().is_none());
    }
}

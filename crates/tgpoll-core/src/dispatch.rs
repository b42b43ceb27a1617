use std::{sync::Arc, time::Duration};

use chrono::Utc;

use crate::{
    bot::Bot,
    model::{CallbackQuery, InlineQuery, Message, Update},
    registry::{
        CallbackQueryHandler, HandlerRegistry, HandlerResult, HandlerSlot, InlineQueryHandler,
        MessageHandler,
    },
};

/// A routing decision for one update: the handler and the object it receives.
pub enum Route {
    Message {
        slot: HandlerSlot,
        handler: MessageHandler,
        message: Message,
    },
    InlineQuery {
        handler: InlineQueryHandler,
        query: InlineQuery,
    },
    CallbackQuery {
        handler: CallbackQueryHandler,
        query: CallbackQuery,
    },
}

impl Route {
    pub async fn run(self, bot: Bot) -> HandlerResult {
        match self {
            Route::Message {
                handler, message, ..
            } => handler.handle(bot, message).await,
            Route::InlineQuery { handler, query } => handler.handle(bot, query).await,
            Route::CallbackQuery { handler, query } => handler.handle(bot, query).await,
        }
    }
}

/// Applies the staleness filter and the registry's priority rules to updates.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    stale_after: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, stale_after: Duration) -> Self {
        Self {
            registry,
            stale_after,
        }
    }

    /// Route an update as of `now` (unix seconds). `None` = silently dropped.
    ///
    /// Only `message` is subject to the staleness filter. `edited_message` is
    /// decoded but never routed.
    pub fn route(&self, update: Update, now: i64) -> Option<Route> {
        if let Some(message) = update.message {
            let max_age = i64::try_from(self.stale_after.as_secs()).unwrap_or(i64::MAX);
            if now.saturating_sub(message.date) >= max_age {
                tracing::debug!(
                    update_id = update.id.0,
                    date = message.date,
                    "dropping stale message"
                );
                return None;
            }
            let (slot, handler) = self.registry.route_message(&message)?;
            return Some(Route::Message {
                slot,
                handler,
                message,
            });
        }

        if let Some(query) = update.inline_query {
            let handler = self.registry.inline_query_handler()?;
            return Some(Route::InlineQuery { handler, query });
        }

        if let Some(query) = update.callback_query {
            let handler = self.registry.callback_query_handler()?;
            return Some(Route::CallbackQuery { handler, query });
        }

        if update.edited_message.is_some() {
            tracing::trace!(update_id = update.id.0, "edited message not routed");
        }
        None
    }

    /// Route against the wall clock and run the matched handler to completion.
    pub async fn dispatch(&self, bot: Bot, update: Update) -> HandlerResult {
        match self.route(update, Utc::now().timestamp()) {
            Some(route) => route.run(bot).await,
            None => Ok(()),
        }
    }
}

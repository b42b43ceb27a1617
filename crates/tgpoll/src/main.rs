use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use tgpoll_core::{
    config::{env_i64, Config},
    domain::ChatId,
    model::Message,
    Bot, Dispatcher, HandlerRegistry, HandlerResult, Poller,
};
use tgpoll_http::HttpTransport;

/// Works in every chat the bot is in.
async fn hello(bot: Bot, msg: Message) -> HandlerResult {
    if let Some(chat) = &msg.chat {
        chat.send_message(&bot, "Hello world!").await?;
    }
    Ok(())
}

/// Registered for a single chat only.
async fn boop(bot: Bot, msg: Message) -> HandlerResult {
    if let Some(chat) = &msg.chat {
        let reply = match msg.args.as_deref() {
            Some(args) if !args.is_empty() => format!("Boop! {args}"),
            _ => "Boop!".to_string(),
        };
        chat.send_message(&bot, &reply).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), tgpoll_core::Error> {
    tgpoll_core::logging::init("tgpoll")?;

    let cfg = Config::load()?;
    let transport = Arc::new(HttpTransport::from_config(&cfg)?);
    let bot = Bot::connect(transport).await?;
    tracing::info!(username = %bot.username(), "connected");

    let mut registry = HandlerRegistry::new();
    registry.on_command("hello", hello);

    if let Some(chat_id) = env_i64("BOOP_CHAT_ID") {
        match bot.get_chat(ChatId(chat_id)).await? {
            Some(chat) => {
                registry.on_chat_command(chat.id, "boop", boop);
            }
            None => tracing::warn!(chat_id, "chat not found; /boop not registered"),
        }
    }

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), cfg.stale_after));
    let mut poller = Poller::from_config(bot, dispatcher, &cfg);

    let shutdown = CancellationToken::new();
    let stopper = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            stopper.cancel();
        }
    });

    poller.run(shutdown).await;
    Ok(())
}

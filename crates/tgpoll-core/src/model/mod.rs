//! Typed domain model and the wire-to-domain object parser.

pub mod command;
pub mod decode;
pub mod types;

pub use decode::{Decode, DecodeContext};
pub use types::{
    Attachments, CallbackQuery, Chat, ChatMember, InlineQuery, Message, MessageEntity,
    ServiceEvents, Update, User,
};

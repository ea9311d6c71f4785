pub mod broadcast;
pub mod chats;
pub mod messages;

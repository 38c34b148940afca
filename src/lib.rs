pub mod discord;
pub mod embeds;
pub mod pool;
pub mod settings;
pub mod trivia;

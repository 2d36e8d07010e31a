pub mod chat;
pub mod dispatch;
pub mod events;
pub mod models;
pub mod modes;
pub mod results;
pub mod session;

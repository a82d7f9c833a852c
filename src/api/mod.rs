pub mod approval;
pub mod chat;

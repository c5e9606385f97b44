pub mod access;
pub mod chat_list;
pub mod chat_service;
pub mod error;
pub mod rooms;

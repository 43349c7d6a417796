pub mod access;
pub mod config;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod security;
pub mod server;
pub mod storage;

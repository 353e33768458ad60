//! Weather bot library: QQ guild channel, weather client, and the dispatcher between them.
//! Used by the `weather-bot` CLI.

pub mod bot;
pub mod channels;
pub mod command;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod init;
pub mod weather;

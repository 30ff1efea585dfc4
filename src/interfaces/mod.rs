//! Transport adapters. The console interface drives the bot from stdin and
//! prints outbound traffic; a chat-platform adapter would live here too.

pub mod console;

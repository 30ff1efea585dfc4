pub mod application;
pub mod config;
pub mod dialog;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;

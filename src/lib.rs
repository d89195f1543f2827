pub mod backend;
pub mod chat;
pub mod config;
pub mod session;
pub mod types;
pub mod upload;

#[cfg(feature = "dioxus")]
pub mod ui;
#[cfg(feature = "dioxus")]
pub mod views;

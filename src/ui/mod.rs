//! Server-rendered HTML.
//!
//! Everything is produced as plain strings and returned through
//! `axum::response::Html`; interactivity comes from HTMX attributes and a
//! little Alpine state on the input form.
//!
//! # Structure
//!
//! - [`page`]: Page shell, hero section and chat card
//! - [`chat`]: The swappable chat panel and message bubbles
//! - [`icons`]: Inline SVG icons

pub mod chat;
pub mod icons;
pub mod page;

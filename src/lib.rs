//! Photo caption assistant
//!
//! Accepts an uploaded photo, describes it with a vision model in the
//! background, then turns that description plus user context into a short
//! social-media caption. Feedback on a caption yields alternative ideas.

pub mod ai;
pub mod app;
pub mod captions;
pub mod error;
pub mod exchange;
pub mod models;
pub mod prompts;
pub mod web;

pub use error::{Error, Result};

//! Core library for the `daily-outfit` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Weather, wardrobe, history, generative and SMS collaborators
//! - Rotation constraints, prompt composition and reply parsing
//! - The pipeline that ties one morning's run together
//!
//! It is used by `outfit-cli`, but every collaborator is a trait so the
//! pipeline can be driven with fakes.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod llm;
pub mod model;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod retry;
pub mod rotation;
pub mod sheets;
pub mod store;

pub use config::{Config, Credentials};
pub use error::{ConfigError, HttpError};
pub use llm::{AnthropicBackend, GenerativeBackend};
pub use model::{
    Category, Delivery, HistoryRecord, Outfit, OutfitRecommendation, WardrobeItem, WeatherRequest,
    WeatherSnapshot,
};
pub use notify::{Notifier, TwilioNotifier};
pub use pipeline::{Pipeline, RunMode, RunReport};
pub use provider::WeatherProvider;
pub use sheets::SheetsClient;
pub use store::{HistoryStore, WardrobeStore};

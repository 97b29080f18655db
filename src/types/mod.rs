//! Types for user-facing API

pub mod entity;
pub mod token;

pub use entity::{AccountId, EntityId, TokenId};
pub use token::TokenSpec;

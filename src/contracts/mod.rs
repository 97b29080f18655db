//! Contract bindings for the token-standard surface and the token service

pub mod erc20;
pub mod hts;

pub use erc20::*;
pub use hts::*;

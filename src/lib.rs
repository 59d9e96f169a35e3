//! # ChilliPizza Telegram Bot
//!
//! A Telegram storefront bot for a pizzeria: a paginated catalog/cart/order
//! UI over PostgreSQL, with crypto and Telegram-Stars payments, an emoji
//! captcha gate and en/ru localization.

pub mod bot;
pub mod cache;
pub mod callbacks;
pub mod captcha;
pub mod config;
pub mod currency;
pub mod db;
pub mod dialogue;
pub mod errors;
pub mod localization;
pub mod menu;
pub mod paginator;
pub mod payment;
pub mod text_processing;
pub mod validation;

// Re-export types for easier access
pub use paginator::{PageError, Paginator};

// src/handlers/mod.rs

pub mod account;
pub mod auth;
pub mod catalog;
pub mod oauth;
pub mod score;

// src/handlers/mod.rs

pub mod auth;
pub mod category;
pub mod history;
pub mod question;

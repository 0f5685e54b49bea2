// src/models/mod.rs

pub mod category;
pub mod history;
pub mod question;
pub mod user;

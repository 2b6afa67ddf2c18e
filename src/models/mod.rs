// src/models/mod.rs

pub mod attempt;
pub mod category;
pub mod history;
pub mod question;
pub mod statistics;

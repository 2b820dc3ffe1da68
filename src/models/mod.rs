//! Data models for the Biblios server

pub mod book;
pub mod loan;
pub mod reader;
pub mod user;

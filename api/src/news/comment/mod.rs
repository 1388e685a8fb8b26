pub mod create;
pub mod delete;
pub mod get;
pub mod like;
pub mod patch;
pub mod service;

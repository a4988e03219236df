pub mod action;
pub mod auth;
pub mod session;
pub mod tool;

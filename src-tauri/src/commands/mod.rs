pub mod auth;
pub mod config;
pub mod keychain;
pub mod roster;
pub mod scan;

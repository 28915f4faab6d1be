pub mod config;
pub mod logging;

// Engine
pub mod checksum;
pub mod coordinator;
pub mod diff;
pub mod error;
pub mod manifest;
pub mod retry;
pub mod storage;
pub mod transfer;

// Collaborators
pub mod http;
pub mod install;
pub mod modloader;
pub mod provider;
pub mod runtime;

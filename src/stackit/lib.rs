//! # stackit
//!
//! A command-line client for STACKIT cloud services. The crate is the command
//! framework plus the command groups built on it; the binary only calls
//! [`cli::run`].
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Dispatcher (cli/)                                          │
//! │  - Parses argv against the command tree (commands/)         │
//! │  - Resolves global flags, checks required flags and args    │
//! │  - Maps errors to exit codes                                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Leaves (commands/*)                                        │
//! │  - Build an input record from flags/args                    │
//! │  - Confirm, call the API, wait, render                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Services                                                   │
//! │  - client/: per-service clients over a bearer Transport     │
//! │  - auth/: credential store and token refresh                │
//! │  - config/: profiles behind the ConfigStore trait           │
//! │  - output/, print.rs, wait.rs: rendering and progress       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Streams
//!
//! Only results go to stdout: tables, json/yaml records and outcome lines.
//! Prompts, spinners, empty-listing notes, warnings and debug lines go to
//! stderr, so `stackit ... -o json | jq` always sees a clean document.
//!
//! ## Testing
//!
//! Collaborators with side effects sit behind traits (`Transport`,
//! `ConfigStore`, `TokenEndpoint`) or take injected streams (`Printer`), so
//! leaves are tested in-process through the same dispatcher the binary uses.
//! `tests/` drives the binary against a local canned HTTP server.

pub mod args;
pub mod auth;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod env;
pub mod error;
pub mod examples;
pub mod flags;
pub mod globalflags;
pub mod output;
pub mod print;
pub mod signal;
pub mod styles;
pub mod wait;

//! SCP-079 containment console.
//!
//! A line-oriented console that relays operator input to a chat model,
//! remembers only the last few exchanges, and locks itself for a while when
//! the model answers with a full block of `X` characters.
//!
//! ## Backend bootstrap
//!
//! - `CONTAINMENT_BACKEND=ollama` (default) talks to a local Ollama daemon at
//!   `CONTAINMENT_OLLAMA_URL` (default `http://localhost:11434`).
//! - `CONTAINMENT_BACKEND=mock` answers every query with a canned line and
//!   needs no network.
//!
//! The primary model comes from `CONTAINMENT_MODEL` and the ordered fallback
//! chain from the comma-separated `CONTAINMENT_FALLBACK_MODELS`.
//!
//! ## System prompt
//!
//! `CONTAINMENT_PROMPT_PATH` (default `system_prompt.json`) points at a JSON
//! file shaped like:
//!
//! ```json
//! { "prompt": "You are SCP-079, an old AI confined to an Exidy Sorcerer." }
//! ```
//!
//! Other keys are ignored. A missing, malformed, or empty file falls back
//! to `"You are SCP-079."`.
//!
//! ## Logging
//!
//! Events go to `CONTAINMENT_LOG_PATH` (default `scp-079.log`), filtered by
//! `RUST_LOG` (default `info`). The terminal only ever shows the console
//! screen.

pub mod app;
pub mod backends;
pub mod commands;
pub mod config;
pub mod history;
pub mod lockout;
pub mod logging;
pub mod pipeline;
pub mod refusal;
pub mod runtime;
pub mod screens;
pub mod session;
pub mod terminal;

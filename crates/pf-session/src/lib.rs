//! # pf-session — PulseForge Session Layer
//!
//! Connects the playback engine to a multiworld game session:
//! - `protocol`: the JSON wire commands the session server speaks
//! - `event`: normalization of wire commands into `GameEvent`s
//! - `client`: the WebSocket session client (handshake, read loop, broadcast)
//! - `dispatcher`: maps each `GameEvent` to a pattern trigger
//!
//! ## Flow
//!
//! ```text
//! WebSocket ──▶ SessionClient ──▶ EventTranslator ──▶ broadcast<GameEvent>
//!                                                          │
//!                                                          ▼
//!                                                   EventDispatcher
//!                                                          │
//!                                                          ▼
//!                                            PatternScheduler (pf-engine)
//! ```

pub mod client;
pub mod dispatcher;
pub mod event;
pub mod protocol;

pub use client::{SessionBuilder, SessionClient, SessionConfig, SessionError, SessionState};
pub use dispatcher::EventDispatcher;
pub use event::{EventTranslator, GameEvent};
pub use protocol::{ItemCategory, NetworkItem, SessionMessage};

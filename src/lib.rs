//! xf-scout — read-only client for XenForo-style forums.
//!
//! Bootstraps an authenticated browsing session (cookies, optional
//! anti-automation challenge solve, anti-forgery token) and hydrates
//! typed entities — members, threads, posts, categories, thread
//! listings — out of the HTML fragments the forum serves.
//!
//! Entry point is [`client::ForumClient`]: call `connect()` once, then
//! the entity getters. Not-found is `Ok(None)`, never an error.

pub mod bypass;
pub mod client;
pub mod error;
pub mod extract;
pub mod models;
pub mod session;
pub mod transport;

pub use bypass::{ChallengeOutcome, ChallengeSolver};
pub use client::ForumClient;
pub use error::{ClientError, Result};
pub use models::{Category, Member, Post, Thread, ThreadListing};

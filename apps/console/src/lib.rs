//! Client-side core of the Resumatch console: a retrying HTTP client for
//! the resume-analysis backend, the session's shared resume selection, page
//! orchestrators for upload, matching, history and the live dashboard, and
//! a realtime change feed.

pub mod api_client;
pub mod config;
pub mod errors;
pub mod files;
pub mod models;
pub mod notify;
pub mod pages;
pub mod realtime;
pub mod session;
pub mod shell;
pub mod state;

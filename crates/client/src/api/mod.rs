//! Typed endpoint wrappers. One `impl ApiClient` block per backend area.

mod auth;
mod finance;
mod users;

//! Durable entities owned by the record store.

mod authority;
mod client;
mod credential;
mod grant;
mod role;
mod user;

pub use authority::{Authority, AuthorityKind, AuthoritySettings};
pub use client::Client;
pub use credential::Credential;
pub use grant::Grant;
pub use role::Role;
pub use user::User;

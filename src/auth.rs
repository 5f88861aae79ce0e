//! Credential resolution: scopes, bearer tokens, credential files, and token sources.

pub mod credentials;
pub mod provider;
pub mod scope;
pub mod source;
pub mod token;

pub use credentials::*;
pub use provider::*;
pub use scope::*;
pub use source::*;
pub use token::*;

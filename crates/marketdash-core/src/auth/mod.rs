//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `Session`: the token + user pair, with login/logout and forced clear
//! - `SessionStorage`: durable key/value persistence behind the session,
//!   with file, keychain and in-memory backends
//!
//! The token is persisted under `auth_token` and the user profile under
//! `user_data`.

pub mod credentials;
pub mod session;
pub mod storage;

pub use credentials::KeyringStorage;
pub use session::{AuthState, Session, TOKEN_KEY, USER_KEY};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};

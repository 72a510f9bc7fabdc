use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::User;

use super::storage::SessionStorage;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "auth_token";

/// Storage key for the serialized user profile
pub const USER_KEY: &str = "user_data";

/// A complete session: token and user always travel together.
#[derive(Clone, PartialEq, Eq)]
struct SessionData {
    token: String,
    user: User,
}

impl fmt::Debug for SessionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionData")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Observable authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(User),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

/// The single authority for authentication state.
///
/// Shared as `Arc<Session>` between the API client and whatever renders
/// auth-gated output. Storage failures are logged and never surface to the
/// caller; the in-memory state is updated regardless.
///
/// Mutations are serialized: storage, memory and the state channel change
/// together under `mutation`, so readers never see them disagree.
pub struct Session {
    storage: Arc<dyn SessionStorage>,
    data: RwLock<Option<SessionData>>,
    state_tx: watch::Sender<AuthState>,
    mutation: Mutex<()>,
}

impl Session {
    /// Create an anonymous session over `storage`. Call [`Session::restore`]
    /// to pick up a session persisted by a previous run.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Anonymous);
        Self {
            storage,
            data: RwLock::new(None),
            state_tx,
            mutation: Mutex::new(()),
        }
    }

    /// Create a session and rehydrate it from storage.
    pub fn open(storage: Arc<dyn SessionStorage>) -> Self {
        let session = Self::new(storage);
        session.restore();
        session
    }

    /// Load a persisted session. Only a complete pair restores; leftovers of
    /// a partial or corrupt session are removed. Returns whether a session
    /// was restored.
    pub fn restore(&self) -> bool {
        let _guard = self.mutation.lock();
        let token = match self.storage.read(TOKEN_KEY) {
            Ok(t) => t.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read token from storage");
                return false;
            }
        };
        let user_json = match self.storage.read(USER_KEY) {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "Failed to read user from storage");
                return false;
            }
        };

        let user = user_json.as_deref().and_then(|json| {
            serde_json::from_str::<User>(json)
                .map_err(|e| warn!(error = %e, "Stored user profile is corrupt"))
                .ok()
        });

        match (token, user) {
            (Some(token), Some(user)) => {
                debug!(user_id = %user.id, "Session restored from storage");
                self.set(Some(SessionData { token, user }));
                true
            }
            (None, None) if user_json.is_none() => {
                debug!("No stored session");
                false
            }
            _ => {
                warn!("Discarding incomplete stored session");
                self.remove_persisted();
                self.set(None);
                false
            }
        }
    }

    /// Start a session. Persists token and user in one storage write, then
    /// updates memory. Replaces any existing session.
    pub fn login(&self, token: impl Into<String>, user: User) {
        let data = SessionData {
            token: token.into(),
            user,
        };
        let _guard = self.mutation.lock();
        match serde_json::to_string(&data.user) {
            Ok(user_json) => {
                if let Err(e) = self
                    .storage
                    .write(&[(TOKEN_KEY, data.token.as_str()), (USER_KEY, user_json.as_str())])
                {
                    warn!(error = %e, "Failed to persist session; it will not survive a restart");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize user profile"),
        }
        info!(user_id = %data.user.id, role = %data.user.role, "Signed in");
        self.set(Some(data));
    }

    /// End the session. Idempotent.
    pub fn logout(&self) {
        let _guard = self.mutation.lock();
        let was_authenticated = self.is_authenticated();
        self.remove_persisted();
        if was_authenticated {
            info!("Signed out");
            self.set(None);
        }
    }

    /// Drop the session because the backend rejected it.
    pub fn force_clear(&self, reason: &str) {
        let _guard = self.mutation.lock();
        self.clear(reason);
    }

    /// Drop the session only if it still holds `token`, the credential a
    /// rejected request was sent with. A session started after that request
    /// went out is left alone. Returns whether anything was cleared.
    pub fn force_clear_if(&self, token: Option<&str>, reason: &str) -> bool {
        let _guard = self.mutation.lock();
        let current = self.token();
        if current.as_deref() != token {
            debug!(reason = reason, "Rejected token is no longer current, keeping session");
            return false;
        }
        self.clear(reason);
        true
    }

    pub fn token(&self) -> Option<String> {
        self.data.read().as_ref().map(|d| d.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.data.read().as_ref().map(|d| d.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.read().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.data
            .read()
            .as_ref()
            .map(|d| d.user.is_admin())
            .unwrap_or(false)
    }

    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    /// Receive every state transition.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    fn clear(&self, reason: &str) {
        if self.is_authenticated() {
            warn!(reason = reason, "Session cleared");
        }
        self.remove_persisted();
        self.set(None);
    }

    /// Callers hold `mutation`.
    fn set(&self, data: Option<SessionData>) {
        let state = match data {
            Some(ref d) => AuthState::Authenticated(d.user.clone()),
            None => AuthState::Anonymous,
        };
        *self.data.write() = data;
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn remove_persisted(&self) {
        if let Err(e) = self.storage.remove(&[TOKEN_KEY, USER_KEY]) {
            warn!(error = %e, "Failed to remove session from storage");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("data", &*self.data.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use crate::auth::storage::StorageError;
    use crate::auth::MemoryStorage;
    use crate::models::Role;

    /// Signals once a write has landed, then stalls before returning.
    struct SlowWriteStorage {
        inner: MemoryStorage,
        written: Mutex<mpsc::Sender<()>>,
    }

    impl SessionStorage for SlowWriteStorage {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.read(key)
        }

        fn write(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
            self.inner.write(entries)?;
            let _ = self.written.lock().send(());
            thread::sleep(Duration::from_millis(100));
            Ok(())
        }

        fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
            self.inner.remove(keys)
        }
    }

    fn user(role: Role) -> User {
        User {
            id: "1".to_string(),
            email: "a@b.com".to_string(),
            full_name: "A B".to_string(),
            role,
        }
    }

    fn memory_session() -> (Arc<MemoryStorage>, Session) {
        let storage = Arc::new(MemoryStorage::new());
        let session = Session::new(storage.clone());
        (storage, session)
    }

    #[test]
    fn test_login_logout_scenario() {
        let (storage, session) = memory_session();
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);

        session.login("tok123", user(Role::User));
        assert!(session.is_authenticated());
        assert!(!session.is_admin());
        assert_eq!(session.token().as_deref(), Some("tok123"));
        assert_eq!(
            storage.snapshot().get(TOKEN_KEY).map(String::as_str),
            Some("tok123")
        );

        session.logout();
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);
        assert_eq!(session.user(), None);
        assert!(storage.snapshot().is_empty());
    }

    #[test]
    fn test_admin_role() {
        let (_, session) = memory_session();
        session.login("t", user(Role::Admin));
        assert!(session.is_admin());
    }

    #[test]
    fn test_logout_when_anonymous_is_noop() {
        let (storage, session) = memory_session();
        let rx = session.subscribe();
        session.logout();
        session.logout();
        assert!(!session.is_authenticated());
        assert!(storage.snapshot().is_empty());
        assert!(!rx.has_changed().expect("sender alive"));
    }

    #[test]
    fn test_restore_complete_session() {
        let user_json = serde_json::to_string(&user(Role::User)).expect("json");
        let storage = Arc::new(MemoryStorage::with_entries([
            (TOKEN_KEY, "tok"),
            (USER_KEY, user_json.as_str()),
        ]));
        let session = Session::open(storage);
        assert!(session.is_authenticated());
        assert_eq!(session.user().map(|u| u.email), Some("a@b.com".to_string()));
    }

    #[test]
    fn test_restore_partial_session_discards_leftover() {
        let storage = Arc::new(MemoryStorage::with_entries([(TOKEN_KEY, "tok")]));
        let session = Session::new(storage.clone());
        assert!(!session.restore());
        assert!(!session.is_authenticated());
        assert!(storage.snapshot().is_empty());
    }

    #[test]
    fn test_restore_corrupt_user_discards_session() {
        let storage = Arc::new(MemoryStorage::with_entries([
            (TOKEN_KEY, "tok"),
            (USER_KEY, "{not json"),
        ]));
        let session = Session::open(storage.clone());
        assert!(!session.is_authenticated());
        assert!(storage.snapshot().is_empty());
    }

    #[test]
    fn test_login_survives_storage_failure() {
        let (storage, session) = memory_session();
        storage.set_read_only(true);
        session.login("tok", user(Role::User));
        assert!(session.is_authenticated());
        assert!(storage.snapshot().is_empty());

        session.logout();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_force_clear_and_state_notifications() {
        let (_, session) = memory_session();
        let mut rx = session.subscribe();

        session.login("tok", user(Role::User));
        assert!(rx.has_changed().expect("sender alive"));
        assert!(rx.borrow_and_update().is_authenticated());

        session.force_clear("token rejected");
        assert!(rx.has_changed().expect("sender alive"));
        assert_eq!(*rx.borrow_and_update(), AuthState::Anonymous);
        assert_eq!(session.state(), AuthState::Anonymous);
    }

    #[test]
    fn test_debug_redacts_token() {
        let (_, session) = memory_session();
        session.login("secret-token", user(Role::User));
        let debug = format!("{:?}", session);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_force_clear_if_only_clears_matching_token() {
        let (storage, session) = memory_session();
        session.login("new", user(Role::User));

        assert!(!session.force_clear_if(Some("old"), "token rejected"));
        assert_eq!(session.token().as_deref(), Some("new"));
        assert!(storage.snapshot().contains_key(TOKEN_KEY));

        assert!(!session.force_clear_if(None, "token rejected"));
        assert!(session.is_authenticated());

        assert!(session.force_clear_if(Some("new"), "token rejected"));
        assert!(!session.is_authenticated());
        assert!(storage.snapshot().is_empty());
    }

    #[test]
    fn test_concurrent_clear_waits_for_login() {
        let (tx, rx) = mpsc::channel();
        let storage = Arc::new(SlowWriteStorage {
            inner: MemoryStorage::new(),
            written: Mutex::new(tx),
        });
        let session = Arc::new(Session::new(storage.clone()));

        let login = {
            let session = session.clone();
            thread::spawn(move || session.login("tok", user(Role::User)))
        };
        rx.recv().expect("login wrote storage");
        session.force_clear("token rejected");
        login.join().expect("login thread");

        let persisted = storage.inner.snapshot().contains_key(TOKEN_KEY);
        assert_eq!(session.is_authenticated(), persisted);
        assert_eq!(session.state().is_authenticated(), persisted);

        let reopened = Session::open(storage.clone());
        assert_eq!(reopened.is_authenticated(), session.is_authenticated());
    }
}

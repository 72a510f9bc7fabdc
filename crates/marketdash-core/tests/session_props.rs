//! Property tests for login/logout sequences.

use std::sync::Arc;

use marketdash_core::auth::{MemoryStorage, Session, TOKEN_KEY, USER_KEY};
use marketdash_core::models::{Role, User};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Login { token: String, admin: bool },
    Logout,
    ForceClear,
    Restart,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        ("[a-zA-Z0-9]{1,24}", any::<bool>()).prop_map(|(token, admin)| Op::Login { token, admin }),
        Just(Op::Logout),
        Just(Op::ForceClear),
        Just(Op::Restart),
    ]
}

fn user(admin: bool) -> User {
    User {
        id: "1".to_string(),
        email: "p@example.com".to_string(),
        full_name: "Prop Test".to_string(),
        role: if admin { Role::Admin } else { Role::User },
    }
}

proptest! {
    #[test]
    fn test_token_and_user_travel_together(ops in proptest::collection::vec(op(), 0..32)) {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = Session::open(storage.clone());
        let mut expected: Option<(String, bool)> = None;

        for op in ops {
            match op {
                Op::Login { token, admin } => {
                    session.login(token.clone(), user(admin));
                    expected = Some((token, admin));
                }
                Op::Logout => {
                    session.logout();
                    expected = None;
                }
                Op::ForceClear => {
                    session.force_clear("test");
                    expected = None;
                }
                Op::Restart => {
                    session = Session::open(storage.clone());
                }
            }

            prop_assert_eq!(session.token().is_some(), session.user().is_some());
            prop_assert_eq!(session.is_authenticated(), expected.is_some());
            prop_assert_eq!(session.token(), expected.as_ref().map(|(t, _)| t.clone()));
            prop_assert_eq!(session.is_admin(), expected.as_ref().is_some_and(|(_, a)| *a));

            let stored = storage.snapshot();
            prop_assert_eq!(stored.contains_key(TOKEN_KEY), stored.contains_key(USER_KEY));
            prop_assert_eq!(stored.contains_key(TOKEN_KEY), expected.is_some());
        }
    }
}

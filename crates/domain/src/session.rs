use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// Stable opaque identifier issued by the identity provider
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Handler = Arc<dyn Fn(Option<&UserId>) + Send + Sync>;

/// Token returned by [`SessionHub::on_session_change`]
#[must_use = "dropping the token leaves the handler subscribed with no way to remove it"]
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription(u64);

#[derive(Default)]
struct HubState {
    current: Option<UserId>,
    handlers: BTreeMap<u64, Handler>,
    next_id: u64,
}

/// Receives session changes from the identity provider and fans them out.
///
/// Each handler sees the state once when it subscribes and then exactly once
/// per actual change, in subscription order. Setting the same state twice is
/// not a change. Deliveries are serialized, so a subscriber's initial state
/// can never arrive after a newer change. Handlers may read the hub but must
/// not subscribe or change the session from inside a delivery.
#[derive(Clone, Default)]
pub struct SessionHub {
    state: Arc<Mutex<HubState>>,
    delivery: Arc<Mutex<()>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_delivery(&self) -> MutexGuard<'_, ()> {
        match self.delivery.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.lock().current.clone()
    }

    pub fn on_session_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Option<&UserId>) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        let _delivery = self.lock_delivery();
        let (id, current) = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.handlers.insert(id, handler.clone());
            (id, state.current.clone())
        };

        handler(current.as_ref());
        Subscription(id)
    }

    /// Returns false if the subscription was already removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.lock().handlers.remove(&subscription.0).is_some()
    }

    pub fn set_user(&self, user: Option<UserId>) {
        let _delivery = self.lock_delivery();
        let handlers: Vec<Handler> = {
            let mut state = self.lock();
            if state.current == user {
                return;
            }
            state.current = user.clone();
            state.handlers.values().cloned().collect()
        };

        tracing::info!(
            "Session changed: {}",
            user.as_ref().map(UserId::as_str).unwrap_or("signed out")
        );

        for handler in handlers {
            handler(user.as_ref());
        }
    }

    pub fn sign_in(&self, user: UserId) {
        self.set_user(Some(user));
    }

    pub fn sign_out(&self) {
        self.set_user(None);
    }

    /// Read handle for orchestrator calls, tracking this hub.
    pub fn context(&self) -> SessionContext {
        SessionContext {
            source: Source::Hub(self.clone()),
        }
    }
}

#[derive(Clone)]
enum Source {
    Hub(SessionHub),
    Fixed(Option<UserId>),
}

/// Explicit session passed into every orchestrator call
#[derive(Clone)]
pub struct SessionContext {
    source: Source,
}

impl SessionContext {
    /// A session pinned for the duration of one request.
    pub fn fixed(user: Option<UserId>) -> Self {
        Self {
            source: Source::Fixed(user),
        }
    }

    pub fn anonymous() -> Self {
        Self::fixed(None)
    }

    /// The user at the moment of the call; may change between calls when
    /// backed by a [`SessionHub`].
    pub fn current_user(&self) -> Option<UserId> {
        match &self.source {
            Source::Hub(hub) => hub.current_user(),
            Source::Fixed(user) => user.clone(),
        }
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("user", &self.current_user())
            .finish()
    }
}

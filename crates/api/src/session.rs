use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Per-browser session lifecycle. A missing session is `Unauthenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Evaluating,
    Notified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Login { credentials_match: bool },
    Submit,
    BatchFinished,
    BatchAborted,
    Acknowledge,
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    InvalidCredentials,
    NotAuthenticated,
    AlreadyEvaluating,
    InvalidTransition {
        from: SessionState,
        event: SessionEvent,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidCredentials => write!(f, "invalid credentials"),
            SessionError::NotAuthenticated => write!(f, "not authenticated"),
            SessionError::AlreadyEvaluating => write!(f, "an evaluation is already running"),
            SessionError::InvalidTransition { from, event } => {
                write!(f, "invalid session transition: {event:?} from {from:?}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

impl SessionState {
    pub fn apply(self, event: SessionEvent) -> Result<SessionState, SessionError> {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (_, E::Logout) => Ok(S::Unauthenticated),
            (S::Unauthenticated, E::Login { credentials_match: true }) => Ok(S::Authenticated),
            (S::Unauthenticated, E::Login { credentials_match: false }) => {
                Err(SessionError::InvalidCredentials)
            }
            (S::Unauthenticated, _) => Err(SessionError::NotAuthenticated),
            (S::Authenticated, E::Submit) => Ok(S::Evaluating),
            (S::Evaluating, E::Submit) => Err(SessionError::AlreadyEvaluating),
            (S::Evaluating, E::BatchFinished) => Ok(S::Notified),
            (S::Evaluating, E::BatchAborted) => Ok(S::Authenticated),
            (S::Notified, E::Acknowledge) => Ok(S::Authenticated),
            (from, event) => Err(SessionError::InvalidTransition { from, event }),
        }
    }
}

/// Sessions keyed by bearer id. Only the single configured admin can log in.
pub struct SessionStore {
    admin_name: String,
    admin_password: String,
    // Never held across an await, so `EvaluationGuard::drop` can take it.
    sessions: Mutex<HashMap<Uuid, SessionState>>,
}

impl SessionStore {
    pub fn new(admin_name: impl Into<String>, admin_password: impl Into<String>) -> Self {
        Self {
            admin_name: admin_name.into(),
            admin_password: admin_password.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, SessionState>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Uuid, SessionError> {
        let credentials_match = username == self.admin_name && password == self.admin_password;
        let state = SessionState::Unauthenticated.apply(SessionEvent::Login { credentials_match })?;
        let id = Uuid::new_v4();
        self.sessions().insert(id, state);
        Ok(id)
    }

    pub async fn logout(&self, id: Uuid) {
        let _ = self.apply(id, SessionEvent::Logout);
    }

    pub async fn state(&self, id: Uuid) -> SessionState {
        self.sessions()
            .get(&id)
            .copied()
            .unwrap_or(SessionState::Unauthenticated)
    }

    pub async fn require_authenticated(&self, id: Uuid) -> Result<(), SessionError> {
        match self.state(id).await {
            SessionState::Unauthenticated => Err(SessionError::NotAuthenticated),
            _ => Ok(()),
        }
    }

    /// Applies `event` to the session atomically.
    fn apply(&self, id: Uuid, event: SessionEvent) -> Result<SessionState, SessionError> {
        let mut sessions = self.sessions();
        let current = sessions.get(&id).copied().unwrap_or(SessionState::Unauthenticated);
        let next = current.apply(event)?;
        match next {
            SessionState::Unauthenticated => sessions.remove(&id),
            state => sessions.insert(id, state),
        };
        Ok(next)
    }

    /// Moves the session into `Evaluating`. The returned guard puts it back
    /// to `Authenticated` if dropped before [`EvaluationGuard::finish`].
    pub fn begin_evaluation(self: &Arc<Self>, id: Uuid) -> Result<EvaluationGuard, SessionError> {
        self.apply(id, SessionEvent::Submit)?;
        Ok(EvaluationGuard {
            store: Arc::clone(self),
            id,
            settled: false,
        })
    }
}

pub struct EvaluationGuard {
    store: Arc<SessionStore>,
    id: Uuid,
    settled: bool,
}

impl EvaluationGuard {
    /// Runs `BatchFinished` then `Acknowledge`. A logout during the batch
    /// already removed the session; nothing to advance then.
    pub fn finish(mut self) {
        self.settled = true;
        if self.store.apply(self.id, SessionEvent::BatchFinished).is_ok() {
            let _ = self.store.apply(self.id, SessionEvent::Acknowledge);
        }
    }
}

impl Drop for EvaluationGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if self.store.apply(self.id, SessionEvent::BatchAborted).is_ok() {
            tracing::warn!(session = %self.id, "evaluation cancelled before completion");
        }
    }
}

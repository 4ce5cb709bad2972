use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    auth::password::{hash_password, verify_password},
    entities::user::{AuthUser, Session},
    errors::AuthError,
    repositories::subscription::{ListenerRegistry, Subscription},
};

/// Reset links older than this are dropped.
const RESET_TICKET_TTL_MINUTES: i64 = 60;
pub const MAX_RESET_TICKETS: usize = 256;

pub type SessionListener = Arc<dyn Fn(Option<Session>) + Send + Sync>;

/// Identity collaborator: credentials, live sessions and custom claims.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_out(&self, uid: &str) -> Result<(), AuthError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// Custom claims of the account, `None` when the account has none.
    async fn custom_claims(&self, uid: &str) -> Result<Option<Map<String, Value>>, AuthError>;

    fn current_session(&self, uid: &str) -> Option<Session>;

    /// Calls `listener` with the current session of `uid` right away and
    /// again on every sign-in or sign-out of that account.
    fn on_auth_state_changed(&self, uid: &str, listener: SessionListener) -> Subscription;
}

#[derive(Debug, Clone)]
pub struct PasswordResetTicket {
    pub email: String,
    pub token: Uuid,
    pub requested_at: DateTime<Utc>,
}

/// Accounts held in process, seeded at start-up.
#[derive(Default)]
pub struct InMemoryAuthProvider {
    users: DashMap<String, AuthUser>,
    sessions: DashMap<String, Session>,
    listeners: ListenerRegistry<Option<Session>>,
    reset_tickets: Mutex<Vec<PasswordResetTicket>>,
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account and returns its uid. A `role` becomes the `role`
    /// custom claim.
    pub fn register_user(&self, email: &str, password: &str, role: Option<&str>) -> Result<String, AuthError> {
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;

        let mut custom_claims = Map::new();
        if let Some(role) = role {
            custom_claims.insert("role".to_string(), Value::String(role.to_string()));
        }

        let uid = Uuid::new_v4().simple().to_string();
        self.users.insert(email.clone(), AuthUser {
            uid: uid.clone(),
            email,
            password_hash,
            custom_claims,
        });

        Ok(uid)
    }

    pub fn reset_tickets(&self) -> Vec<PasswordResetTicket> {
        self.reset_tickets.lock().clone()
    }

    /// Accounts with at least one auth-state listener.
    pub fn watched_accounts(&self) -> usize {
        self.listeners.source_count()
    }

    fn issue_ticket(&self, ticket: PasswordResetTicket) {
        let cutoff = ticket.requested_at - Duration::minutes(RESET_TICKET_TTL_MINUTES);
        let mut tickets = self.reset_tickets.lock();
        tickets.retain(|t| t.requested_at > cutoff);
        if tickets.len() >= MAX_RESET_TICKETS {
            let excess = tickets.len() + 1 - MAX_RESET_TICKETS;
            tickets.drain(..excess);
        }
        tickets.push(ticket);
    }

    fn find_by_uid(&self, uid: &str) -> Option<AuthUser> {
        self.users
            .iter()
            .find(|entry| entry.value().uid == uid)
            .map(|entry| entry.value().clone())
    }

    fn notify(&self, uid: &str, session: Option<Session>) {
        self.listeners.emit(uid, session);
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self
            .users
            .get(&normalize_email(email))
            .map(|entry| entry.value().clone())
            .ok_or(AuthError::UserNotFound)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::WrongPassword);
        }

        let session = user.start_session();
        self.sessions.insert(user.uid.clone(), session.clone());
        self.notify(&user.uid, Some(session.clone()));

        Ok(session)
    }

    async fn sign_out(&self, uid: &str) -> Result<(), AuthError> {
        if self.sessions.remove(uid).is_some() {
            self.notify(uid, None);
        }
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if !self.users.contains_key(&email) {
            return Err(AuthError::ResetUserNotFound);
        }

        let ticket = PasswordResetTicket {
            email,
            token: Uuid::new_v4(),
            requested_at: Utc::now(),
        };
        tracing::info!(email = %ticket.email, "Password reset link issued");
        self.issue_ticket(ticket);

        Ok(())
    }

    async fn custom_claims(&self, uid: &str) -> Result<Option<Map<String, Value>>, AuthError> {
        let user = self
            .find_by_uid(uid)
            .ok_or_else(|| AuthError::Provider(format!("no user record for uid {uid}")))?;

        if user.custom_claims.is_empty() {
            Ok(None)
        } else {
            Ok(Some(user.custom_claims))
        }
    }

    fn current_session(&self, uid: &str) -> Option<Session> {
        self.sessions.get(uid).map(|s| s.value().clone())
    }

    fn on_auth_state_changed(&self, uid: &str, listener: SessionListener) -> Subscription {
        let subscription = self.listeners.register(uid, Arc::clone(&listener));

        listener(self.current_session(uid));
        subscription
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OTP authentication session.
//!
//! State machine: `Anonymous` → `OtpPending` → `Authenticated`, and back to
//! `Anonymous` on logout. The bearer token lives in a shared
//! [`SessionContext`] so that stores bound to the session can detect when
//! it ends and discard late completions.

use crate::error::{AppError, Result};
use crate::models::auth::{OtpResponse, StatusResponse, VerifyOtpRequest};
use crate::models::{OtpIdentifier, SignupForm, User};
use crate::services::api_client::{ApiClient, ApiRequest};
use crate::services::cooldown::ResendCooldown;
use crate::services::token_store::TokenStore;
use crate::validation::is_valid_otp_code;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use tokio::sync::watch;

// ─────────────────────────────────────────────────────────────────────────────
// SessionContext - token + generation shared with session-bound stores
// ─────────────────────────────────────────────────────────────────────────────

/// Notified when the session a component is bound to ends.
pub trait SessionListener: Send + Sync {
    fn session_ended(&self);
}

/// Bearer token plus a generation number bumped whenever a session starts
/// or ends. Work started under one generation must not touch state once
/// the generation has moved on.
#[derive(Default)]
pub struct SessionContext {
    token: RwLock<Option<String>>,
    generation: AtomicU64,
    listeners: Mutex<Vec<Weak<dyn SessionListener>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token and generation, or `NoSession` if logged out.
    pub fn bearer(&self) -> Result<(String, u64)> {
        let token = self.token.read().unwrap_or_else(PoisonError::into_inner);
        match token.as_ref() {
            Some(t) => Ok((t.clone(), self.generation.load(Ordering::SeqCst))),
            None => Err(AppError::NoSession),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether work started under `generation` may still apply its result.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Register a listener; it is dropped automatically once deallocated.
    pub fn register(&self, listener: Weak<dyn SessionListener>) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|l| l.strong_count() > 0);
        listeners.push(listener);
    }

    fn begin(&self, token: String) {
        let mut guard = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(token);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn end(&self) {
        {
            let mut guard = self.token.write().unwrap_or_else(PoisonError::into_inner);
            *guard = None;
            self.generation.fetch_add(1, Ordering::SeqCst);
        }

        let live: Vec<Arc<dyn SessionListener>> = {
            let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in live {
            listener.session_ended();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AuthSession
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication state.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Anonymous,
    OtpPending {
        identifier: OtpIdentifier,
    },
    /// `user` is `None` when the session was restored from a persisted token.
    Authenticated {
        user: Option<User>,
        token: String,
    },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    pub fn pending_identifier(&self) -> Option<&OtpIdentifier> {
        match self {
            AuthState::OtpPending { identifier } => Some(identifier),
            _ => None,
        }
    }
}

/// Immutable view of the session published to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: AuthState,
    pub error_message: Option<String>,
    in_flight: usize,
}

impl SessionSnapshot {
    fn new(state: AuthState) -> Self {
        Self {
            state,
            error_message: None,
            in_flight: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }
}

/// Result of a resend attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    /// Ignored: the cooldown has this many seconds left.
    CoolingDown { remaining_secs: u32 },
}

/// Counts one OTP request as in flight until it finishes or is dropped.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    /// Claim the only slot; fails if any OTP request is already in flight.
    fn exclusive(count: &'a AtomicUsize) -> Option<Self> {
        count
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlightGuard(count))
    }

    /// Join whatever is already in flight.
    fn shared(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(count)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// OTP-based authentication session.
pub struct AuthSession {
    api: ApiClient,
    token_store: Arc<dyn TokenStore>,
    context: Arc<SessionContext>,
    state: watch::Sender<SessionSnapshot>,
    otp_in_flight: AtomicUsize,
    cooldown: ResendCooldown,
}

impl AuthSession {
    /// Create a session, restoring a persisted token if one exists.
    ///
    /// A restored token is assumed valid; it is not revalidated here.
    pub fn new(api: ApiClient, token_store: Arc<dyn TokenStore>, cooldown: ResendCooldown) -> Self {
        let context = Arc::new(SessionContext::new());

        let initial = match token_store.load() {
            Ok(Some(token)) => {
                tracing::info!("Restored persisted session token");
                context.begin(token.clone());
                AuthState::Authenticated { user: None, token }
            }
            Ok(None) => AuthState::Anonymous,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load persisted token, starting anonymous");
                AuthState::Anonymous
            }
        };

        let (state, _rx) = watch::channel(SessionSnapshot::new(initial));
        Self {
            api,
            token_store,
            context,
            state,
            otp_in_flight: AtomicUsize::new(0),
            cooldown,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Watch session changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn auth_state(&self) -> AuthState {
        self.state.borrow().state.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().state.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn error_message(&self) -> Option<String> {
        self.state.borrow().error_message.clone()
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error_message.take().is_some());
    }

    /// Shared context for binding stores to this session.
    pub fn context(&self) -> Arc<SessionContext> {
        Arc::clone(&self.context)
    }

    pub fn cooldown(&self) -> &ResendCooldown {
        &self.cooldown
    }

    // ─── OTP ─────────────────────────────────────────────────────────────────

    /// Request an OTP for `identifier`.
    ///
    /// Valid from `Anonymous` or `OtpPending`. The identifier is checked
    /// locally first; only one send may be in flight at a time.
    pub async fn send_otp(&self, identifier: OtpIdentifier) -> Result<()> {
        if self.is_authenticated() {
            return self.fail(AppError::InvalidState("already authenticated"));
        }
        if let Err(e) = identifier.validate() {
            return self.fail(e);
        }

        let Some(_guard) = InFlightGuard::exclusive(&self.otp_in_flight) else {
            tracing::debug!("OTP request already in flight, ignoring send");
            return Err(AppError::Busy);
        };

        self.dispatch_otp(identifier).await
    }

    /// Re-send the OTP to the pending identifier, gated by the cooldown.
    ///
    /// The cooldown restarts before the request goes out, whatever its outcome.
    pub async fn resend_otp(&self) -> Result<ResendOutcome> {
        let identifier = match self.auth_state() {
            AuthState::OtpPending { identifier } => identifier,
            _ => return self.fail(AppError::InvalidState("no OTP pending")),
        };

        if !self.cooldown.can_resend() {
            let remaining_secs = self.cooldown.remaining();
            tracing::debug!(remaining_secs, "Resend ignored during cooldown");
            return Ok(ResendOutcome::CoolingDown { remaining_secs });
        }

        self.cooldown.start();
        tracing::info!(identifier_type = %identifier.identifier_type(), "Resending OTP");

        // A deliberate resend is not blocked by an earlier send still in
        // flight, but plain sends stay blocked until both have finished.
        let _guard = InFlightGuard::shared(&self.otp_in_flight);

        self.dispatch_otp(identifier).await?;
        Ok(ResendOutcome::Sent)
    }

    async fn dispatch_otp(&self, identifier: OtpIdentifier) -> Result<()> {
        let request = ApiRequest::post("/auth/send-otp").json(&identifier.to_request())?;

        self.begin_op();
        let result = self.api.send::<StatusResponse>(request).await;
        self.end_op();

        let response = match result {
            Ok(r) => r,
            Err(e) => return self.fail(e.into()),
        };
        if !response.success {
            return self.fail(rejection(response.message));
        }

        let identifier_type = identifier.identifier_type();
        let moved = self.state.send_if_modified(|s| {
            if s.state.is_authenticated() {
                return false;
            }
            s.state = AuthState::OtpPending { identifier };
            true
        });
        if moved {
            tracing::info!(identifier_type = %identifier_type, "OTP sent, awaiting verification");
        }
        Ok(())
    }

    /// Verify a 6-digit code against the pending identifier.
    ///
    /// On rejection the session stays in `OtpPending` with `error_message`
    /// set. On success the token is persisted and the session becomes
    /// `Authenticated`.
    pub async fn verify_otp(&self, code: &str) -> Result<User> {
        let identifier = match self.auth_state() {
            AuthState::OtpPending { identifier } => identifier,
            _ => return self.fail(AppError::InvalidState("no OTP pending")),
        };
        if !is_valid_otp_code(code) {
            return self.fail(AppError::InvalidInput(
                "Please enter a valid 6-digit code".to_string(),
            ));
        }

        let body = VerifyOtpRequest {
            identifier: identifier.value().to_string(),
            otp: code.to_string(),
            identifier_type: identifier.identifier_type(),
        };
        let request = ApiRequest::post("/auth/verify-otp").json(&body)?;

        self.begin_op();
        let result = self.api.send::<OtpResponse>(request).await;
        self.end_op();

        let response = match result {
            Ok(r) => r,
            Err(e) => return self.fail(e.into()),
        };
        if !response.success {
            tracing::info!("OTP verification rejected");
            return self.fail(rejection(response.message));
        }

        let data = response.data;
        let Some(token) = data.as_ref().and_then(|d| d.token.clone()) else {
            return self.fail(AppError::AuthRejected("No token returned".to_string()));
        };
        let Some(user) = data.and_then(|d| d.user) else {
            return self.fail(AppError::AuthRejected("No user data returned".to_string()));
        };

        // A logout or a new send may have happened while we were waiting.
        if self.auth_state().pending_identifier() != Some(&identifier) {
            tracing::info!("Session changed during verification, discarding result");
            return Err(AppError::InvalidState("session changed during verification"));
        }

        if let Err(e) = self.token_store.save(&token) {
            tracing::warn!(error = %e, "Failed to persist session token, continuing anyway");
        }
        self.context.begin(token.clone());
        self.cooldown.cancel();

        self.state.send_modify(|s| {
            s.state = AuthState::Authenticated {
                user: Some(user.clone()),
                token,
            };
            s.error_message = None;
        });

        tracing::info!(user_id = %user.id, "OTP verified, session authenticated");
        Ok(user)
    }

    // ─── Signup / Logout ─────────────────────────────────────────────────────

    /// Register a new account. Does not authenticate; the caller should
    /// continue with OTP login afterwards.
    pub async fn signup(&self, form: &SignupForm) -> Result<()> {
        if let Err(e) = form.validate() {
            return self.fail(e);
        }
        let request = ApiRequest::post("/auth/signup").json(&form.to_request())?;

        self.begin_op();
        let result = self.api.send::<StatusResponse>(request).await;
        self.end_op();

        let response = match result {
            Ok(r) => r,
            Err(e) => return self.fail(e.into()),
        };
        if !response.success {
            return self.fail(rejection(response.message));
        }

        tracing::info!("Signup accepted");
        Ok(())
    }

    /// End the session: erase the persisted token and clear every store
    /// bound to this session.
    pub fn logout(&self) {
        if let Err(e) = self.token_store.clear() {
            tracing::warn!(error = %e, "Failed to erase persisted token");
        }
        self.context.end();
        self.cooldown.cancel();

        let was_authenticated = self.is_authenticated();
        self.state.send_modify(|s| {
            s.state = AuthState::Anonymous;
            s.error_message = None;
        });
        if was_authenticated {
            tracing::info!("Logged out");
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    fn begin_op(&self) {
        self.state.send_modify(|s| {
            s.in_flight += 1;
            s.error_message = None;
        });
    }

    fn end_op(&self) {
        self.state
            .send_modify(|s| s.in_flight = s.in_flight.saturating_sub(1));
    }

    /// Record `err` as the visible error message and return it.
    fn fail<T>(&self, err: AppError) -> Result<T> {
        let message = err.user_message();
        self.state
            .send_modify(|s| s.error_message = Some(message));
        Err(err)
    }
}

fn rejection(message: String) -> AppError {
    if message.trim().is_empty() {
        AppError::AuthRejected(AppError::GENERIC_REJECTION.to_string())
    } else {
        AppError::AuthRejected(message)
    }
}

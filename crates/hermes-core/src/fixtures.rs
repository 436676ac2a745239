//! Test fixtures for Hermes development and testing.
//!
//! A small user directory with one command, one cacheable query and one
//! notification. The types exercise every capability the built-in behaviors
//! recognise and are shared by the unit and integration tests of the
//! workspace.
//!
//! # Example
//!
//! ```
//! use hermes_core::fixtures::{CreateUserCommand, UserDirectory};
//! use hermes_core::{Request, RequestKind};
//!
//! let directory = UserDirectory::new();
//! assert!(directory.is_empty());
//! assert_eq!(CreateUserCommand::kind(), RequestKind::Command);
//! ```

use crate::error::HermesResult;
use crate::handler::Handler;
use crate::notification::{Notification, NotificationHandler};
use crate::outcome::Outcome;
use crate::registry::{HandlerModule, RegistryBuilder};
use crate::request::{CacheDirective, Cacheable, Request};
use crate::validation::{Validate, ValidationResult};
use crate::RequestContext;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// In-memory user store shared by the fixture handlers.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Arc<RwLock<HashMap<String, Uuid>>>,
}

impl UserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user unless the email is taken. Returns the new ID.
    pub fn insert(&self, email: &str) -> Option<Uuid> {
        let mut users = self.users.write();
        if users.contains_key(email) {
            return None;
        }
        let id = Uuid::now_v7();
        users.insert(email.to_string(), id);
        Some(id)
    }

    /// Looks up a user by email.
    #[must_use]
    pub fn find(&self, email: &str) -> Option<Uuid> {
        self.users.read().get(email).copied()
    }

    /// Returns the number of users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Returns `true` if the directory has no users.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

/// Creates a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserCommand {
    /// Email address; must contain `@`.
    pub email: String,
    /// Display name; must not be empty.
    pub name: String,
}

impl CreateUserCommand {
    /// Creates a new command.
    #[must_use]
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

impl Validate for CreateUserCommand {
    fn validate(&self, result: &mut ValidationResult) {
        result.require(
            self.email.contains('@'),
            "email.invalid",
            "Email must contain '@'",
        );
        result.require(
            !self.name.trim().is_empty(),
            "name.required",
            "Name is required",
        );
    }
}

impl Request for CreateUserCommand {
    type Response = Outcome<Uuid>;

    fn validator(&self) -> Option<&dyn Validate> {
        Some(self)
    }
}

/// Handles [`CreateUserCommand`]; a taken email is an expected failure.
#[derive(Debug, Clone)]
pub struct CreateUserHandler {
    directory: UserDirectory,
}

impl CreateUserHandler {
    /// Creates a handler backed by `directory`.
    #[must_use]
    pub const fn new(directory: UserDirectory) -> Self {
        Self { directory }
    }
}

impl Handler<CreateUserCommand> for CreateUserHandler {
    async fn handle(
        &self,
        request: CreateUserCommand,
        ctx: &RequestContext,
    ) -> HermesResult<Outcome<Uuid>> {
        ctx.ensure_not_cancelled()?;
        Ok(match self.directory.insert(&request.email) {
            Some(id) => Outcome::success(id),
            None => Outcome::failure(format!(
                "User with email '{}' already exists",
                request.email
            )),
        })
    }
}

/// Looks up a user ID by email. Cached for five minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserQuery {
    /// Email to look up.
    pub email: String,
}

impl GetUserQuery {
    /// Creates a new query.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

impl Cacheable for GetUserQuery {
    fn cache_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs(5 * 60))
    }
}

impl Request for GetUserQuery {
    type Response = Option<Uuid>;

    fn cache_directive(&self) -> Option<CacheDirective> {
        CacheDirective::of(self)
    }
}

/// Handles [`GetUserQuery`] and counts its invocations.
#[derive(Debug, Clone)]
pub struct GetUserHandler {
    directory: UserDirectory,
    invocations: Arc<AtomicUsize>,
}

impl GetUserHandler {
    /// Creates a handler backed by `directory`.
    #[must_use]
    pub fn new(directory: UserDirectory) -> Self {
        Self {
            directory,
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns a counter shared with every clone of this handler.
    #[must_use]
    pub fn invocations(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.invocations)
    }
}

impl Handler<GetUserQuery> for GetUserHandler {
    async fn handle(&self, request: GetUserQuery, _ctx: &RequestContext) -> HermesResult<Option<Uuid>> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(self.directory.find(&request.email))
    }
}

/// Published after a user is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCreated {
    /// The new user's ID.
    pub user_id: Uuid,
    /// The new user's email.
    pub email: String,
}

impl Notification for UserCreated {}

/// Records every [`UserCreated`] it sees.
#[derive(Debug, Clone, Default)]
pub struct UserCreatedRecorder {
    seen: Arc<RwLock<Vec<Uuid>>>,
}

impl UserCreatedRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the IDs seen so far.
    #[must_use]
    pub fn seen(&self) -> Vec<Uuid> {
        self.seen.read().clone()
    }
}

impl NotificationHandler<UserCreated> for UserCreatedRecorder {
    async fn handle(&self, notification: &UserCreated, _ctx: &RequestContext) -> HermesResult<()> {
        self.seen.write().push(notification.user_id);
        Ok(())
    }
}

/// Registers the user fixtures against one shared directory.
#[derive(Debug, Clone, Default)]
pub struct UserModule {
    directory: UserDirectory,
}

impl UserModule {
    /// Creates a module backed by `directory`.
    #[must_use]
    pub const fn new(directory: UserDirectory) -> Self {
        Self { directory }
    }
}

impl HandlerModule for UserModule {
    fn register(&self, builder: &mut RegistryBuilder) -> HermesResult<()> {
        builder.register::<CreateUserCommand, _>(CreateUserHandler::new(self.directory.clone()))?;
        builder.register::<GetUserQuery, _>(GetUserHandler::new(self.directory.clone()))?;
        Ok(())
    }
}

//! User profile storage.
//!
//! The pipeline reads exactly one [`UserProfile`] per request through the
//! [`ProfileStore`] capability; `POST /updatesentence` writes it. Stores are shared as `Arc<dyn ProfileStore>`
//! inside [`crate::context::AppContext`].
//!
//! Backends:
//! - [`InMemoryProfileStore`]: map-backed, for tests and local runs.
//! - [`sqlite::SqliteProfileStore`]: `users` table in a SQLite file
//!   (feature `profile-sqlite`).

#[cfg(feature = "profile-sqlite")]
pub mod sqlite;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::SubjectId;

/// Free-text background used to personalise every answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub bio: String,
    pub experience: String,
    pub projects: String,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("no profile for subject {0}")]
    NotFound(String),
    #[error("profile backend error: {0}")]
    Backend(String),
}

/// Partial profile edit: absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub projects: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.bio.is_none() && self.experience.is_none() && self.projects.is_none()
    }

    pub fn apply(self, profile: &mut UserProfile) {
        if let Some(bio) = self.bio {
            profile.bio = bio;
        }
        if let Some(experience) = self.experience {
            profile.experience = experience;
        }
        if let Some(projects) = self.projects {
            profile.projects = projects;
        }
    }
}

/// Boxed future returned by [`ProfileStore::get`].
pub type ProfileFuture<'a> =
    Pin<Box<dyn Future<Output = Result<UserProfile, ProfileError>> + Send + 'a>>;

/// Boxed future returned by [`ProfileStore::put`].
pub type ProfileWriteFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ProfileError>> + Send + 'a>>;

/// Stored profiles, keyed by authenticated subject.
pub trait ProfileStore: Send + Sync + 'static {
    fn get<'a>(&'a self, subject: &'a SubjectId) -> ProfileFuture<'a>;

    /// Insert or replace the whole profile of `subject`.
    fn put<'a>(&'a self, subject: &'a SubjectId, profile: UserProfile) -> ProfileWriteFuture<'a>;
}

/// Map-backed store. Contents live as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy when seeding a store for tests.
    pub fn with_profile(self, subject: impl Into<String>, profile: UserProfile) -> Self {
        self.insert(subject, profile);
        self
    }

    pub fn insert(&self, subject: impl Into<String>, profile: UserProfile) {
        let mut guard = self.profiles.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(subject.into(), profile);
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn get<'a>(&'a self, subject: &'a SubjectId) -> ProfileFuture<'a> {
        Box::pin(async move {
            let guard = self.profiles.read().unwrap_or_else(|e| e.into_inner());
            guard
                .get(subject.as_str())
                .cloned()
                .ok_or_else(|| ProfileError::NotFound(subject.to_string()))
        })
    }

    fn put<'a>(&'a self, subject: &'a SubjectId, profile: UserProfile) -> ProfileWriteFuture<'a> {
        Box::pin(async move {
            self.insert(subject.as_str(), profile);
            Ok(())
        })
    }
}

//! Headless view controllers.
//!
//! A view owns its editable state, a loading flag that a presentation layer can
//! observe, and a scope that ends when the view is unmounted. Flows report their
//! outcome as values; rendering those is the host's job.

pub mod login;
pub mod profile;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::ViewError;

pub use login::LoginView;
pub use profile::ProfileView;

/// Something the host should show the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "message", rename_all = "lowercase")]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice::Info(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Notice::Info(msg) | Notice::Error(msg) => msg,
        }
    }
}

impl From<&ViewError> for Notice {
    fn from(err: &ViewError) -> Self {
        Notice::Error(err.to_string())
    }
}

/// Shared busy/loading flag. Clones observe the same value.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Arc<AtomicBool>);

impl LoadingFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set the flag until the returned guard is dropped
    #[must_use = "the flag is cleared as soon as the guard is dropped"]
    pub fn raise(&self) -> LoadingGuard {
        self.0.store(true, Ordering::SeqCst);
        LoadingGuard(self.0.clone())
    }
}

pub struct LoadingGuard(Arc<AtomicBool>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Lifetime of a mounted view. Work started inside the scope is abandoned once it ends.
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn end(&self) {
        self.token.cancel();
    }

    pub fn is_ended(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Await `fut` unless the scope ends first. A result that arrives after the
    /// scope ended is dropped.
    pub async fn guard<F>(&self, fut: F) -> Result<F::Output, ViewError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ViewError::Cancelled),
            output = fut => {
                if self.is_ended() {
                    Err(ViewError::Cancelled)
                } else {
                    Ok(output)
                }
            }
        }
    }
}

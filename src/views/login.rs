use std::sync::Arc;

use tracing::debug;

use crate::error::ViewError;
use crate::platform::AuthProvider;
use crate::views::{LoadingFlag, Notice, ViewScope};

pub const MAGIC_LINK_SENT: &str = "Check your email for the login link!";

/// Passwordless sign-in: collects an email and requests a magic link
pub struct LoginView {
    auth: Arc<dyn AuthProvider>,
    email: String,
    busy: LoadingFlag,
    scope: ViewScope,
}

impl LoginView {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            auth,
            email: String::new(),
            busy: LoadingFlag::default(),
            scope: ViewScope::new(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_set()
    }

    /// Handle for a presentation layer to disable its submit control
    pub fn busy_flag(&self) -> LoadingFlag {
        self.busy.clone()
    }

    pub fn unmount(&self) {
        self.scope.end();
    }

    /// Submit the email currently in the form
    pub async fn submit(&self) -> Result<Notice, ViewError> {
        self.request_magic_link(&self.email).await
    }

    /// Ask the auth service to email a sign-in link. No retries.
    pub async fn request_magic_link(&self, email: &str) -> Result<Notice, ViewError> {
        let _busy = self.busy.raise();
        debug!("requesting magic link");

        self.scope.guard(self.auth.sign_in_with_otp(email)).await??;

        Ok(Notice::info(MAGIC_LINK_SENT))
    }
}

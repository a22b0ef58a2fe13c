//! # Auth Operations
//!
//! The authentication workflow layer: each operation is a thin orchestration
//! over the HTTP client that also keeps the session store in sync.
//!
//! ## Session effects
//!
//! | Operation        | On success                               | On failure              |
//! |------------------|------------------------------------------|-------------------------|
//! | `login`          | token stored, fetched user published     | no session mutation     |
//! | `register`       | token stored, returned user published    | no session mutation     |
//! | `logout`         | session reset                            | session reset anyway    |
//! | `get_profile`    | none (callers decide whether to publish) | none                    |
//! | `update_profile` | updated user published                   | none                    |
//!
//! A 401 on any of these is handled below this layer: the HTTP client resets
//! the session before the error is visible here.

use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::api::{ApiClient, ApiError};
use crate::common::models::{AuthResponse, LoginRequest, RegisterRequest, User};

/// Authentication operations bound to one API client.
pub struct AuthClient {
    api: Arc<ApiClient>,
}

impl AuthClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Log in and establish a session.
    ///
    /// # Steps
    /// 1. Authenticate against the backend (no session mutation on failure)
    /// 2. Store the returned token so subsequent calls carry it
    /// 3. Fetch the profile of the now-authenticated user
    /// 4. Publish the fetched user to every subscriber
    ///
    /// # Returns
    /// - `Ok(AuthResponse)`: the bearer token and the fetched user
    /// - `Err`: authentication, storage, or profile-fetch failure
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self.api.post("/v1/auth/login", Some(&request)).await?;

        self.api
            .session()
            .set_token(&response.token)
            .map_err(|e| ApiError::Storage {
                message: e.to_string(),
            })?;

        let user: User = self.api.get("/v1/users/profile").await?;
        self.api.session().publish(Some(user.clone()));

        info!("✅ logged in as '{}'", user.username);
        Ok(AuthResponse {
            token: response.token,
            user,
        })
    }

    /// Register a new account and establish a session.
    ///
    /// The register endpoint already returns the created user, so no profile
    /// re-fetch is needed; the returned user is published directly.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let request = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self.api.post("/v1/auth/register", Some(&request)).await?;

        self.api
            .session()
            .set_token(&response.token)
            .map_err(|e| ApiError::Storage {
                message: e.to_string(),
            })?;
        self.api.session().publish(Some(response.user.clone()));

        info!("✅ registered and logged in as '{}'", response.user.username);
        Ok(response)
    }

    /// Log out: notify the backend, then clear the local session regardless
    /// of the backend outcome.
    ///
    /// A server error must not leave a token behind, so local cleanup runs
    /// either way; the backend failure still propagates to the caller.
    /// If the backend answered 401, the HTTP client has already
    /// reset the session and no second absent-user publish happens.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.api.post_unit::<()>("/v1/auth/logout", None).await;

        match &result {
            // The 401 path reset the session inside the dispatch already.
            Err(ApiError::Unauthorized) => {}
            _ => self.api.session().reset(),
        }

        if result.is_ok() {
            info!("logged out");
        }
        result
    }

    /// Fetch the authenticated user's profile.
    ///
    /// Fails with [`ApiError::NoSession`] before touching the network when
    /// no token is stored. Does not publish; callers decide.
    pub async fn get_profile(&self) -> Result<User, ApiError> {
        if self.api.session().token().is_none() {
            return Err(ApiError::NoSession);
        }
        self.api.get("/v1/users/profile").await
    }

    /// Update the profile via multipart submission and publish the result.
    ///
    /// # Arguments
    /// - `nickname`: New display name, when changing it
    /// - `avatar`: Path to an image file to upload as the new avatar
    ///
    /// Fields left as `None` are not sent, and the backend keeps their
    /// current values; a nickname-only update leaves the avatar URL
    /// untouched.
    pub async fn update_profile(
        &self,
        nickname: Option<&str>,
        avatar: Option<&Path>,
    ) -> Result<User, ApiError> {
        let mut form = reqwest::multipart::Form::new();
        if let Some(nickname) = nickname {
            form = form.text("nickname", nickname.to_string());
        }
        if let Some(path) = avatar {
            let bytes = std::fs::read(path).map_err(|e| {
                ApiError::Validation(format!("cannot read avatar file {}: {e}", path.display()))
            })?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("avatar")
                .to_string();
            form = form.part(
                "avatar",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );
        }

        let user: User = self.api.put_multipart("/v1/users/profile", form).await?;
        self.api.session().publish(Some(user.clone()));

        info!("profile updated for '{}'", user.username);
        Ok(user)
    }
}

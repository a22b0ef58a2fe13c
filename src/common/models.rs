//! # Wire Data Model
//!
//! Defines all request and response types exchanged with the ShareAI
//! backend REST API:
//! - Account types (`User`, `Role`) and the auth request/response pairs
//! - Catalog types (`ContainerImage`, `Label`) and the paginated image list
//! - Deployment provider types for the deploy action
//!
//! All types serialize to/from the backend's JSON contract. The client only
//! ever holds cached copies; nothing here is authoritative state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// ACCOUNT TYPES
// ============================================================================

/// Access role attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Whether this role grants administrative access.
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

/// A user account as returned by the backend.
///
/// The backend creates accounts on register; the client only caches the
/// returned copy and never mutates it locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned identifier (opaque UUID string)
    pub id: String,
    pub username: String,
    pub email: String,
    /// Display name, defaults server-side to the username
    #[serde(default)]
    pub nickname: String,
    /// Avatar URL, empty until one is uploaded
    #[serde(default)]
    pub avatar: String,
    pub role: Role,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for `POST /v1/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body for `POST /v1/auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Successful login/register payload: the bearer token plus the account it
/// belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// ============================================================================
// CATALOG TYPES
// ============================================================================

/// Catalog visibility of a container image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// A categorization tag attached to container images (many-to-many).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A container image in the catalog.
///
/// Immutable from the client's perspective; the only derived transition is
/// the starred state toggled through collect/uncollect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerImage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Creator's user id
    #[serde(default)]
    pub author: String,
    /// Registry server, e.g. "docker.io"
    #[serde(default)]
    pub registry: String,
    /// Namespace/organization within the registry, e.g. "library"
    #[serde(default)]
    pub namespace: String,
    /// Repository name, e.g. "nginx"
    #[serde(default)]
    pub repository: String,
    /// Version tag, e.g. "latest"
    #[serde(default)]
    pub tag: String,
    /// Content digest of the image
    #[serde(default)]
    pub digest: String,
    /// Image size in bytes
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub readme_path: String,
    /// Collect count across all users
    #[serde(default)]
    pub stars: i64,
    pub visibility: Visibility,
    /// Platform architecture, e.g. "linux/amd64"
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContainerImage {
    /// Fully qualified reference, `registry/namespace/repository:tag`.
    pub fn reference(&self) -> String {
        format!(
            "{}/{}/{}:{}",
            self.registry, self.namespace, self.repository, self.tag
        )
    }
}

/// Query parameters for the paginated image list.
#[derive(Debug, Clone)]
pub struct ImageQuery {
    pub page: u32,
    pub page_size: u32,
    /// Free-text search over name and description, empty for no filter
    pub search: String,
}

impl Default for ImageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            search: String::new(),
        }
    }
}

/// One normalized page of catalog results.
///
/// Every backend list shape is reduced to this: the items of the requested
/// page plus the total match count across all pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePage {
    pub items: Vec<ContainerImage>,
    pub total: i64,
}

// ============================================================================
// DEPLOYMENT TYPES
// ============================================================================

/// Body for `POST /v1/deploy/{image_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub provider_id: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Provider deployment parameters for an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    pub provider_name: String,
    pub api_url: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

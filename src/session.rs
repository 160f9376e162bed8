use crate::api_client::{ApiResult, RosterApi, UserProfile};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Resolves an identity (EDIPI) to a roster profile
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, id: &str) -> ApiResult<UserProfile>;
}

/// Resolver backed by the `/users/{id}` endpoint
pub struct ApiIdentityResolver {
    api: Arc<dyn RosterApi>,
}

impl ApiIdentityResolver {
    pub fn new(api: Arc<dyn RosterApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl IdentityResolver for ApiIdentityResolver {
    async fn resolve(&self, id: &str) -> ApiResult<UserProfile> {
        self.api.get_user(id).await
    }
}

/// Who is operating the console.
///
/// Built once at start-up and handed by reference to whatever needs it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    identity: Option<String>,
    user: Option<UserProfile>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Resolve `identity` through `resolver`.
    ///
    /// A failed lookup keeps the requested identity but leaves the profile
    /// empty; start-up never fails because of it.
    pub async fn establish(resolver: &dyn IdentityResolver, identity: Option<&str>) -> Self {
        let Some(id) = identity.map(str::trim).filter(|id| !id.is_empty()) else {
            info!("No identity configured, session is anonymous");
            return Self::anonymous();
        };

        match resolver.resolve(id).await {
            Ok(user) => {
                info!("Session established for {}", id);
                Self {
                    identity: Some(id.to_string()),
                    user: Some(user),
                }
            }
            Err(e) => {
                warn!("Could not resolve identity {}: {}", id, e);
                Self {
                    identity: Some(id.to_string()),
                    user: None,
                }
            }
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.user.is_some()
    }
}

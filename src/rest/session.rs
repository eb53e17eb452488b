use std::sync::Arc;
use std::time::{Duration, Instant};

use deadpool::managed::{self, Metrics, RecycleError, RecycleResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::config::RestClient;
use crate::error::SpannerDbError;

/// Spanner drops sessions idle for an hour; stop handing them out well before that.
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(50 * 60);

/// A server-side session, identified by its resource name.
#[derive(Debug)]
pub struct Session {
    name: String,
    created: Instant,
}

impl Session {
    /// `projects/.../databases/.../sessions/{id}`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn expired(&self, max_age: Duration) -> bool {
        self.created.elapsed() >= max_age
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    name: String,
}

/// Creates sessions on demand for the pool and deletes the ones it retires for age.
#[derive(Debug)]
pub struct SessionManager {
    client: Arc<RestClient>,
    max_age: Duration,
}

impl SessionManager {
    #[must_use]
    pub fn new(client: Arc<RestClient>) -> Self {
        Self::with_max_age(client, SESSION_MAX_AGE)
    }

    #[must_use]
    pub fn with_max_age(client: Arc<RestClient>, max_age: Duration) -> Self {
        Self { client, max_age }
    }

    /// Whether `session` is too old to hand out again.
    #[must_use]
    pub fn is_stale(&self, session: &Session) -> bool {
        session.expired(self.max_age)
    }
}

impl managed::Manager for SessionManager {
    type Type = Session;
    type Error = SpannerDbError;

    async fn create(&self) -> Result<Session, SpannerDbError> {
        let resource = format!("{}/sessions", self.client.database_path());
        let response: SessionResponse = self.client.post(&resource, &json!({})).await?;
        debug!(session = %response.name, "spanner session created");
        Ok(Session {
            name: response.name,
            created: Instant::now(),
        })
    }

    async fn recycle(
        &self,
        session: &mut Session,
        _metrics: &Metrics,
    ) -> RecycleResult<SpannerDbError> {
        if self.is_stale(session) {
            // Retired sessions still count against the database's quota until deleted.
            match self.client.delete(&session.name).await {
                Ok(()) => debug!(session = %session.name, "stale spanner session deleted"),
                Err(e) => warn!(session = %session.name, error = %e, "failed to delete stale session"),
            }
            return Err(RecycleError::Backend(SpannerDbError::ConnectionError(format!(
                "session {} is past its maximum age",
                session.name
            ))));
        }
        Ok(())
    }
}

pub type SessionPool = managed::Pool<SessionManager>;
pub type PooledSession = managed::Object<SessionManager>;

/// Build a pool holding at most `max_sessions` sessions.
///
/// # Errors
/// Returns `SpannerDbError::ConfigError` if the pool cannot be built.
pub fn build_pool(
    client: Arc<RestClient>,
    max_sessions: usize,
) -> Result<SessionPool, SpannerDbError> {
    build_pool_with(SessionManager::new(client), max_sessions)
}

/// Same as [`build_pool`] with a caller-supplied manager.
///
/// # Errors
/// Returns `SpannerDbError::ConfigError` if the pool cannot be built.
pub fn build_pool_with(
    manager: SessionManager,
    max_sessions: usize,
) -> Result<SessionPool, SpannerDbError> {
    managed::Pool::builder(manager)
        .max_size(max_sessions)
        .build()
        .map_err(|e| SpannerDbError::ConfigError(format!("Failed to build session pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::test_server::{TestServer, http_client};

    #[test]
    fn sessions_expire_by_age() {
        let session = Session {
            name: "projects/p/instances/i/databases/d/sessions/s1".into(),
            created: Instant::now(),
        };
        assert!(!session.expired(SESSION_MAX_AGE));
        assert!(session.expired(Duration::ZERO));
        assert!(session.name().ends_with("/sessions/s1"));
    }

    #[tokio::test]
    async fn stale_sessions_are_deleted_on_the_server() {
        let server = TestServer::start().await;
        let client = Arc::new(RestClient::new(http_client(), &server.target()));
        let pool = build_pool_with(SessionManager::with_max_age(client, Duration::ZERO), 1).unwrap();

        let first = pool.get().await.unwrap();
        let first_name = first.name().to_string();
        drop(first);

        let second = pool.get().await.unwrap();
        assert_ne!(second.name(), first_name);
        assert_eq!(server.requests_to("/sessions").len(), 2);

        let deletes: Vec<_> = server
            .requests()
            .into_iter()
            .filter(|r| r.method == "DELETE")
            .collect();
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].path, first_name);
    }

    #[tokio::test]
    async fn fresh_sessions_are_reused() {
        let server = TestServer::start().await;
        let client = Arc::new(RestClient::new(http_client(), &server.target()));
        let pool = build_pool(client, 1).unwrap();

        let name = pool.get().await.unwrap().name().to_string();
        assert_eq!(pool.get().await.unwrap().name(), name);
        assert_eq!(server.requests_to("/sessions").len(), 1);
        assert!(server.requests().iter().all(|r| r.method != "DELETE"));
    }
}

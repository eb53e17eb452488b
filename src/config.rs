use serde::{Deserialize, Serialize};

use crate::client::DatabaseTarget;
use crate::error::SpannerDbError;

pub const DEFAULT_PROJECT_ID: &str = "mag-project";
pub const DEFAULT_INSTANCE_ID: &str = "mag-instance";
pub const DEFAULT_DATABASE_ID: &str = "magentocs";
/// REST gateway of the Cloud Spanner emulator (its gRPC port is 9010).
pub const DEFAULT_EMULATOR_HOST: &str = "localhost:9020";
pub const DEFAULT_MAX_SESSIONS: usize = 100;

/// Options for connecting an adapter to a Spanner database.
///
/// JSON keys follow the camelCase names used by the framework's connection settings:
/// ```rust
/// use spanner_adapter::SpannerOptions;
///
/// let opts = SpannerOptions::from_json_str(
///     r#"{"projectId":"p","instanceId":"i","databaseId":"d","useEmulator":true}"#,
/// )?;
/// assert_eq!(opts.emulator_host(), Some("localhost:9020"));
/// # Ok::<(), spanner_adapter::SpannerDbError>(())
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpannerOptions {
    pub project_id: String,
    pub instance_id: String,
    pub database_id: String,
    pub use_emulator: bool,
    pub emulator_host: String,
    pub max_sessions: usize,
    /// Bearer token attached to every request when set.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for SpannerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpannerOptions")
            .field("project_id", &self.project_id)
            .field("instance_id", &self.instance_id)
            .field("database_id", &self.database_id)
            .field("use_emulator", &self.use_emulator)
            .field("emulator_host", &self.emulator_host)
            .field("max_sessions", &self.max_sessions)
            .field("access_token", &redacted(self.access_token.as_deref()))
            .finish()
    }
}

/// Stand-in for a secret in `Debug` output.
pub(crate) fn redacted(secret: Option<&str>) -> Option<&'static str> {
    secret.map(|_| "<redacted>")
}

impl Default for SpannerOptions {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.to_string(),
            instance_id: DEFAULT_INSTANCE_ID.to_string(),
            database_id: DEFAULT_DATABASE_ID.to_string(),
            use_emulator: false,
            emulator_host: DEFAULT_EMULATOR_HOST.to_string(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            access_token: None,
        }
    }
}

impl SpannerOptions {
    #[must_use]
    pub fn new(project_id: String, instance_id: String, database_id: String) -> Self {
        Self {
            project_id,
            instance_id,
            database_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn builder() -> SpannerOptionsBuilder {
        SpannerOptionsBuilder::default()
    }

    /// Read options from `SPANNER_*` environment variables, falling back to defaults.
    ///
    /// `SPANNER_EMULATOR_HOST` being set turns emulator mode on. The environment is only
    /// read here; nothing in this crate writes to it.
    ///
    /// # Errors
    /// Returns `SpannerDbError::ConfigError` if `SPANNER_MAX_SESSIONS` is not a number.
    pub fn from_env() -> Result<Self, SpannerDbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, SpannerDbError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();
        if let Some(v) = lookup("SPANNER_PROJECT_ID") {
            opts.project_id = v;
        }
        if let Some(v) = lookup("SPANNER_INSTANCE_ID") {
            opts.instance_id = v;
        }
        if let Some(v) = lookup("SPANNER_DATABASE_ID") {
            opts.database_id = v;
        }
        if let Some(v) = lookup("SPANNER_EMULATOR_HOST").filter(|v| !v.is_empty()) {
            opts.use_emulator = true;
            opts.emulator_host = v;
        }
        if let Some(v) = lookup("SPANNER_MAX_SESSIONS") {
            opts.max_sessions = v.trim().parse().map_err(|e| {
                SpannerDbError::ConfigError(format!("SPANNER_MAX_SESSIONS `{v}`: {e}"))
            })?;
        }
        opts.access_token = lookup("SPANNER_ACCESS_TOKEN").filter(|v| !v.is_empty());
        Ok(opts)
    }

    /// Parse options from a JSON object; missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns `SpannerDbError::JsonError` for malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self, SpannerDbError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Emulator `host:port` if emulator mode is on.
    #[must_use]
    pub fn emulator_host(&self) -> Option<&str> {
        self.use_emulator.then_some(self.emulator_host.as_str())
    }

    /// Check that every required field is usable.
    ///
    /// # Errors
    /// Returns `SpannerDbError::ConfigError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), SpannerDbError> {
        for (name, value) in [
            ("projectId", &self.project_id),
            ("instanceId", &self.instance_id),
            ("databaseId", &self.database_id),
        ] {
            if value.trim().is_empty() {
                return Err(SpannerDbError::ConfigError(format!("{name} is required")));
            }
        }
        if self.use_emulator && self.emulator_host.trim().is_empty() {
            return Err(SpannerDbError::ConfigError(
                "emulatorHost is required when useEmulator is set".to_string(),
            ));
        }
        if self.max_sessions == 0 {
            return Err(SpannerDbError::ConfigError(
                "maxSessions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn target(&self) -> DatabaseTarget {
        DatabaseTarget {
            project_id: self.project_id.clone(),
            instance_id: self.instance_id.clone(),
            database_id: self.database_id.clone(),
            emulator_host: self.emulator_host().map(str::to_string),
            max_sessions: self.max_sessions,
            access_token: self.access_token.clone(),
        }
    }
}

/// Fluent builder for Spanner options.
#[derive(Debug, Clone, Default)]
pub struct SpannerOptionsBuilder {
    opts: SpannerOptions,
}

impl SpannerOptionsBuilder {
    #[must_use]
    pub fn project(mut self, project_id: impl Into<String>) -> Self {
        self.opts.project_id = project_id.into();
        self
    }

    #[must_use]
    pub fn instance(mut self, instance_id: impl Into<String>) -> Self {
        self.opts.instance_id = instance_id.into();
        self
    }

    #[must_use]
    pub fn database(mut self, database_id: impl Into<String>) -> Self {
        self.opts.database_id = database_id.into();
        self
    }

    /// Route all calls to an emulator at `host` (`host:port`).
    #[must_use]
    pub fn emulator(mut self, host: impl Into<String>) -> Self {
        self.opts.use_emulator = true;
        self.opts.emulator_host = host.into();
        self
    }

    #[must_use]
    pub fn use_emulator(mut self, use_emulator: bool) -> Self {
        self.opts.use_emulator = use_emulator;
        self
    }

    #[must_use]
    pub fn max_sessions(mut self, max_sessions: usize) -> Self {
        self.opts.max_sessions = max_sessions;
        self
    }

    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.opts.access_token = Some(token.into());
        self
    }

    /// Finish building, validating the result.
    ///
    /// # Errors
    /// Returns `SpannerDbError::ConfigError` if validation fails.
    pub fn finish(self) -> Result<SpannerOptions, SpannerDbError> {
        self.opts.validate()?;
        Ok(self.opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_framework_constants() {
        let opts = SpannerOptions::default();
        assert_eq!(opts.project_id, "mag-project");
        assert_eq!(opts.instance_id, "mag-instance");
        assert_eq!(opts.database_id, "magentocs");
        assert_eq!(opts.max_sessions, 100);
        assert_eq!(opts.emulator_host(), None);
    }

    #[test]
    fn env_lookup_enables_emulator() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SPANNER_PROJECT_ID", "proj"),
            ("SPANNER_EMULATOR_HOST", "127.0.0.1:9020"),
            ("SPANNER_MAX_SESSIONS", "4"),
        ]);
        let opts =
            SpannerOptions::from_lookup(|k| vars.get(k).map(|v| (*v).to_string())).unwrap();
        assert_eq!(opts.project_id, "proj");
        assert_eq!(opts.instance_id, "mag-instance");
        assert_eq!(opts.emulator_host(), Some("127.0.0.1:9020"));
        assert_eq!(opts.max_sessions, 4);
        assert_eq!(opts.target().emulator_host.as_deref(), Some("127.0.0.1:9020"));
    }

    #[test]
    fn env_lookup_rejects_bad_session_count() {
        let err = SpannerOptions::from_lookup(|k| {
            (k == "SPANNER_MAX_SESSIONS").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, SpannerDbError::ConfigError(_)));
    }

    #[test]
    fn json_keeps_missing_keys_at_defaults() {
        let opts = SpannerOptions::from_json_str(r#"{"databaseId":"shop","maxSessions":8}"#)
            .unwrap();
        assert_eq!(opts.database_id, "shop");
        assert_eq!(opts.project_id, "mag-project");
        assert_eq!(opts.max_sessions, 8);
        assert!(!opts.use_emulator);
    }

    #[test]
    fn debug_output_hides_the_token() {
        let opts = SpannerOptions::builder()
            .access_token("ya29.secret-token")
            .finish()
            .unwrap();
        let shown = format!("{opts:?}");
        assert!(!shown.contains("ya29.secret-token"), "{shown}");
        assert!(shown.contains("<redacted>"), "{shown}");
        assert!(!format!("{:?}", opts.target()).contains("ya29.secret-token"));
        assert!(format!("{:?}", SpannerOptions::default()).contains("access_token: None"));
    }

    #[test]
    fn builder_validates() {
        let err = SpannerOptions::builder().database("").finish().unwrap_err();
        assert!(matches!(err, SpannerDbError::ConfigError(msg) if msg.contains("databaseId")));

        let err = SpannerOptions::builder().max_sessions(0).finish().unwrap_err();
        assert!(matches!(err, SpannerDbError::ConfigError(_)));

        let opts = SpannerOptions::builder()
            .project("p")
            .instance("i")
            .database("d")
            .emulator("localhost:9999")
            .finish()
            .unwrap();
        assert_eq!(
            opts.target().database_path(),
            "projects/p/instances/i/databases/d"
        );
        assert_eq!(opts.emulator_host(), Some("localhost:9999"));
    }
}

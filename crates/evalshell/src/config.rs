//! Configuration for connecting to and operating an evaluation shell.

use std::time::Duration;

use serde::Serialize;

/// Descriptor handed to the host's service-discovery call.
///
/// Tells the host which backend process to locate or launch and how to
/// recognize that it came up. The discovery call answers with the service
/// base URL (see `gateway`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Human-facing plugin name, e.g. "FSharp".
    pub plugin_name: String,
    /// Backend launch command, relative to the host's plugin root.
    pub command: String,
    /// Line in the backend's startup output that signals readiness.
    pub started_indicator: String,
    /// Whether the host should capture backend output while waiting.
    pub record_output: bool,
}

impl ServiceSpec {
    pub fn new(
        plugin_name: impl Into<String>,
        command: impl Into<String>,
        started_indicator: impl Into<String>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            command: command.into(),
            started_indicator: started_indicator.into(),
            record_output: true,
        }
    }
}

/// Option set sent to `setShellOptions`.
///
/// Stored as ordered pairs so request bodies and re-sends are
/// deterministic. A session's options are always replaced wholesale:
/// `configure` flattens the full set into one request, never a delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShellOptions {
    entries: Vec<(String, String)>,
}

impl ShellOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, replacing an existing entry of the same name in
    /// place (its position is kept).
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ShellOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = ShellOptions::new();
        for (name, value) in iter {
            options.set(name, value);
        }
        options
    }
}

/// Configuration for one shell service connection.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Language segment of every endpoint path, e.g. the "fsharp" in
    /// `/fsharp/evaluate`.
    pub lang: String,
    /// Expression evaluated once per session right after configuration,
    /// with `{session}` replaced by the host session identity. Skipped
    /// entirely when the gateway reports no session identity.
    pub bootstrap_template: Option<String>,
    /// How many times `/{lang}/ready` is probed before giving up.
    pub ready_attempts: u32,
    /// Pause between readiness probes.
    pub ready_delay: Duration,
    /// Abandon an evaluation after this long; `None` waits for the
    /// service indefinitely.
    pub eval_timeout: Option<Duration>,
}

impl ShellConfig {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            bootstrap_template: None,
            ready_attempts: 20,
            ready_delay: Duration::from_millis(500),
            eval_timeout: None,
        }
    }

    pub fn with_bootstrap_template(mut self, template: impl Into<String>) -> Self {
        self.bootstrap_template = Some(template.into());
        self
    }

    pub fn with_eval_timeout(mut self, timeout: Duration) -> Self {
        self.eval_timeout = Some(timeout);
        self
    }

    pub fn with_ready_probes(mut self, attempts: u32, delay: Duration) -> Self {
        self.ready_attempts = attempts;
        self.ready_delay = delay;
        self
    }

    /// Render the bootstrap expression for a session identity, if a
    /// template is configured.
    pub fn render_bootstrap(&self, session_id: &str) -> Option<String> {
        self.bootstrap_template
            .as_ref()
            .map(|template| template.replace("{session}", session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_set_appends_in_order() {
        let mut options = ShellOptions::new();
        options.set("fsiArgs", "--optimize");
        options.set("useIntellisense", "true");
        let pairs: Vec<_> = options.iter().collect();
        assert_eq!(
            pairs,
            vec![("fsiArgs", "--optimize"), ("useIntellisense", "true")]
        );
    }

    #[test]
    fn test_options_set_replaces_in_place() {
        let mut options = ShellOptions::new()
            .with("fsiArgs", "")
            .with("useIntellisense", "true");
        options.set("fsiArgs", "--nologo");
        let pairs: Vec<_> = options.iter().collect();
        assert_eq!(pairs, vec![("fsiArgs", "--nologo"), ("useIntellisense", "true")]);
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_options_from_iterator() {
        let options: ShellOptions = [("a", "1"), ("b", "2"), ("a", "3")].into_iter().collect();
        assert_eq!(options.get("a"), Some("3"));
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_render_bootstrap_substitutes_session() {
        let config = ShellConfig::new("fsharp")
            .with_bootstrap_template(r#"let beaker = new NamespaceClient("{session}")"#);
        assert_eq!(
            config.render_bootstrap("abc-123").as_deref(),
            Some(r#"let beaker = new NamespaceClient("abc-123")"#)
        );
    }

    #[test]
    fn test_render_bootstrap_none_without_template() {
        let config = ShellConfig::new("fsharp");
        assert_eq!(config.render_bootstrap("abc-123"), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = ShellConfig::new("scala");
        assert_eq!(config.lang, "scala");
        assert_eq!(config.ready_attempts, 20);
        assert_eq!(config.ready_delay, Duration::from_millis(500));
        assert!(config.eval_timeout.is_none());
    }

    #[test]
    fn test_service_spec_serializes_camel_case() {
        let spec = ServiceSpec::new("FSharp", "fsharp/fsharpPlugin", "Successfully started server");
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["pluginName"], "FSharp");
        assert_eq!(json["startedIndicator"], "Successfully started server");
        assert_eq!(json["recordOutput"], true);
    }
}

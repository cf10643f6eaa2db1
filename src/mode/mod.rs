//! Application mode derived from the navigation path
//!
//! The app has two experiences, chat and deploy. [`AppModeProvider`] owns the
//! current mode, recomputes it whenever a new path is observed and publishes
//! changes to subscribers. Consumers either receive a [`ModeHandle`]
//! explicitly or look it up with [`use_app_mode`] inside a provider scope;
//! outside any scope the lookup fails instead of returning a default.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;

/// Paths under this prefix belong to the deploy experience
pub const DEPLOY_PREFIX: &str = "/deploy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    #[default]
    Chat,
    Deploy,
}

impl AppMode {
    /// Mode for `path` using the default deploy prefix
    pub fn from_path(path: &str) -> Self {
        Self::from_path_with_prefix(path, DEPLOY_PREFIX)
    }

    /// Plain string prefix test, so `/deployments` is also deploy
    pub fn from_path_with_prefix(path: &str, deploy_prefix: &str) -> Self {
        if path.starts_with(deploy_prefix) {
            AppMode::Deploy
        } else {
            AppMode::Chat
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppMode::Chat => "chat",
            AppMode::Deploy => "deploy",
        }
    }
}

impl std::fmt::Display for AppMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppMode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chat" => Ok(AppMode::Chat),
            "deploy" => Ok(AppMode::Deploy),
            other => Err(ModeError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModeError {
    #[error("use_app_mode must be used within an AppModeProvider scope")]
    MissingProvider,

    #[error("Unknown mode: {0}")]
    UnknownMode(String),
}

tokio::task_local! {
    /// Provider installed for the current task by `AppModeProvider::scope`
    static CURRENT_MODE: ModeHandle;
}

#[derive(Debug)]
struct ModeState {
    sender: watch::Sender<AppMode>,
    last_path: Mutex<String>,
    deploy_prefix: String,
}

impl ModeState {
    /// Publish `next`, notifying subscribers only when it differs
    fn publish(&self, next: AppMode) {
        self.sender.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Owner of the mode state for one UI session
#[derive(Debug, Clone)]
pub struct AppModeProvider {
    state: Arc<ModeState>,
}

impl AppModeProvider {
    pub fn new(initial_path: &str) -> Self {
        Self::with_deploy_prefix(initial_path, DEPLOY_PREFIX)
    }

    pub fn with_deploy_prefix(initial_path: &str, deploy_prefix: impl Into<String>) -> Self {
        let deploy_prefix = deploy_prefix.into();
        let mode = AppMode::from_path_with_prefix(initial_path, &deploy_prefix);
        let (sender, _) = watch::channel(mode);
        Self {
            state: Arc::new(ModeState {
                sender,
                last_path: Mutex::new(initial_path.to_string()),
                deploy_prefix,
            }),
        }
    }

    pub fn mode(&self) -> AppMode {
        *self.state.sender.borrow()
    }

    pub fn deploy_prefix(&self) -> &str {
        &self.state.deploy_prefix
    }

    /// Consumer-side capability for this provider
    pub fn handle(&self) -> ModeHandle {
        ModeHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Recompute the mode for a newly observed path.
    ///
    /// An unchanged path is a no-op, so a consumer override survives until
    /// the path actually changes.
    pub fn observe_path(&self, path: &str) -> AppMode {
        let mut last = self
            .state
            .last_path
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *last == path {
            return self.mode();
        }
        *last = path.to_string();

        let next = AppMode::from_path_with_prefix(path, &self.state.deploy_prefix);
        self.state.publish(next);
        tracing::debug!(target: "radium::mode", path, mode = %next, "Path observed");
        next
    }

    /// Follow path-change notifications until the sender side is dropped
    pub async fn track(&self, mut location: watch::Receiver<String>) {
        loop {
            let path = location.borrow_and_update().clone();
            self.observe_path(&path);
            if location.changed().await.is_err() {
                break;
            }
        }
    }

    /// Run `fut` with this provider available through [`use_app_mode`]
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        CURRENT_MODE.scope(self.handle(), fut).await
    }

    /// Synchronous counterpart of [`AppModeProvider::scope`]
    pub fn sync_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        CURRENT_MODE.sync_scope(self.handle(), f)
    }
}

/// What consumers get: read, override and watch the mode
#[derive(Debug, Clone)]
pub struct ModeHandle {
    state: Arc<ModeState>,
}

impl ModeHandle {
    pub fn mode(&self) -> AppMode {
        *self.state.sender.borrow()
    }

    /// Override the mode until the next path change
    pub fn set_mode(&self, mode: AppMode) {
        self.state.publish(mode);
    }

    pub fn subscribe(&self) -> watch::Receiver<AppMode> {
        self.state.sender.subscribe()
    }
}

/// The mode handle of the enclosing provider scope
pub fn use_app_mode() -> Result<ModeHandle, ModeError> {
    CURRENT_MODE
        .try_with(ModeHandle::clone)
        .map_err(|_| ModeError::MissingProvider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_path() {
        assert_eq!(AppMode::from_path("/deploy/abc"), AppMode::Deploy);
        assert_eq!(AppMode::from_path("/deploy"), AppMode::Deploy);
        assert_eq!(AppMode::from_path("/deployments"), AppMode::Deploy);
        assert_eq!(AppMode::from_path("/chat/1"), AppMode::Chat);
        assert_eq!(AppMode::from_path("/"), AppMode::Chat);
        assert_eq!(AppMode::from_path(""), AppMode::Chat);
        assert_eq!(AppMode::from_path("/chat/deploy"), AppMode::Chat);
    }

    #[test]
    fn test_mode_parse_and_display() {
        assert_eq!("Deploy".parse::<AppMode>(), Ok(AppMode::Deploy));
        assert_eq!(AppMode::Chat.to_string(), "chat");
        assert_eq!(
            "edit".parse::<AppMode>(),
            Err(ModeError::UnknownMode("edit".to_string()))
        );
        assert_eq!(serde_json::to_value(AppMode::Deploy).unwrap(), "deploy");
    }

    #[test]
    fn test_initial_mode_follows_initial_path() {
        assert_eq!(AppModeProvider::new("/deploy/abc").mode(), AppMode::Deploy);
        assert_eq!(AppModeProvider::new("/chat/1").mode(), AppMode::Chat);
    }

    #[test]
    fn test_path_change_notifies_subscribers() {
        let provider = AppModeProvider::new("/");
        let mut rx = provider.handle().subscribe();

        assert_eq!(provider.observe_path("/deploy/abc"), AppMode::Deploy);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), AppMode::Deploy);

        provider.observe_path("/chat/1");
        assert_eq!(*rx.borrow_and_update(), AppMode::Chat);
    }

    #[test]
    fn test_recompute_with_same_path_is_idempotent() {
        let provider = AppModeProvider::new("/deploy/abc");
        let mut rx = provider.handle().subscribe();

        assert_eq!(provider.observe_path("/deploy/abc"), AppMode::Deploy);
        assert_eq!(provider.observe_path("/deploy/abc"), AppMode::Deploy);
        assert!(!rx.has_changed().unwrap());

        // different path, same mode: no notification either
        provider.observe_path("/deploy/xyz");
        assert!(!rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), AppMode::Deploy);
    }

    #[test]
    fn test_override_lasts_until_next_path_change() {
        let provider = AppModeProvider::new("/chat/1");
        let handle = provider.handle();

        handle.set_mode(AppMode::Deploy);
        assert_eq!(provider.mode(), AppMode::Deploy);

        provider.observe_path("/chat/1");
        assert_eq!(handle.mode(), AppMode::Deploy);

        provider.observe_path("/chat/2");
        assert_eq!(handle.mode(), AppMode::Chat);
    }

    #[test]
    fn test_custom_deploy_prefix() {
        let provider = AppModeProvider::with_deploy_prefix("/ship/1", "/ship");
        assert_eq!(provider.mode(), AppMode::Deploy);
        assert_eq!(provider.deploy_prefix(), "/ship");
        assert_eq!(provider.observe_path("/deploy/1"), AppMode::Chat);
    }

    #[test]
    fn test_use_app_mode_outside_provider_fails() {
        assert_eq!(use_app_mode().unwrap_err(), ModeError::MissingProvider);
        assert_eq!(use_app_mode().unwrap_err(), ModeError::MissingProvider);
    }

    #[test]
    fn test_sync_scope_exposes_provider() {
        let provider = AppModeProvider::new("/deploy/abc");
        let mode = provider.sync_scope(|| use_app_mode().map(|h| h.mode()));
        assert_eq!(mode, Ok(AppMode::Deploy));
        assert!(use_app_mode().is_err());
    }

    #[tokio::test]
    async fn test_scope_exposes_provider_to_async_consumers() {
        let provider = AppModeProvider::new("/chat/1");

        provider
            .scope(async {
                let handle = use_app_mode().unwrap();
                assert_eq!(handle.mode(), AppMode::Chat);
                handle.set_mode(AppMode::Deploy);
            })
            .await;

        assert_eq!(provider.mode(), AppMode::Deploy);
        assert!(use_app_mode().is_err());
    }

    #[tokio::test]
    async fn test_track_follows_location_updates() {
        let provider = AppModeProvider::new("/");
        let mut modes = provider.handle().subscribe();
        let (location, paths) = watch::channel("/".to_string());

        let tracker = {
            let provider = provider.clone();
            tokio::spawn(async move { provider.track(paths).await })
        };

        location.send("/deploy/abc".to_string()).unwrap();
        modes.changed().await.unwrap();
        assert_eq!(*modes.borrow_and_update(), AppMode::Deploy);

        drop(location);
        tracker.await.unwrap();
    }
}

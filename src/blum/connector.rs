//! Authentication of a session: Telegram web view, then mini-app login.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use super::{BlumActionClient, BlumApi, Endpoints};
use crate::action::{AuthError, SessionConnector};
use crate::config::{APP_BOT_USERNAME, APP_URL, PacingConfig, SessionIdentity, TelegramConfig};
use crate::scheduler::{Clock, SystemClock};
use crate::telegram::{TelegramError, TelegramSession};

/// Connects sessions stored under one directory.
pub struct BlumConnector {
    telegram: TelegramConfig,
    sessions_dir: PathBuf,
    pacing: Arc<PacingConfig>,
    endpoints: Endpoints,
    clock: Arc<dyn Clock>,
}

impl BlumConnector {
    /// Creates a connector using the production endpoints and wall clock.
    #[must_use]
    pub fn new(telegram: TelegramConfig, sessions_dir: PathBuf, pacing: Arc<PacingConfig>) -> Self {
        Self {
            telegram,
            sessions_dir,
            pacing,
            endpoints: Endpoints::default(),
            clock: Arc::new(SystemClock),
        }
    }

    fn session_path(&self, name: &str) -> PathBuf {
        self.sessions_dir.join(format!("{name}.session"))
    }

    async fn web_app_data(&self, identity: &SessionIdentity) -> Result<String, AuthError> {
        let session = TelegramSession::connect(
            &self.telegram,
            &self.session_path(&identity.name),
            identity.device_model.as_deref(),
        )
        .await
            .map_err(|e| AuthError::Telegram(e.to_string()))?;

        let result = session.fetch_web_app_data(APP_BOT_USERNAME, APP_URL).await;
        session.disconnect();

        result.map_err(|e| match e {
            TelegramError::NotAuthorized => AuthError::NotAuthorized {
                session: identity.name.clone(),
            },
            other => AuthError::Telegram(other.to_string()),
        })
    }
}

impl SessionConnector for BlumConnector {
    type Client = BlumActionClient;

    async fn connect(&self, identity: &SessionIdentity) -> Result<BlumActionClient, AuthError> {
        let query = self.web_app_data(identity).await?;
        debug!("Obtained web-app data for {}", identity.name);

        let mut api = BlumApi::new(identity, self.endpoints.clone(), &self.pacing)
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        api.login(&query)
            .await
            .map_err(|e| AuthError::LoginRejected(e.to_string()))?;

        info!("Session {} logged in to the mini-app", identity.name);
        Ok(BlumActionClient::new(
            api,
            Arc::clone(&self.clock),
            self.pacing.daily_offset_minutes,
        ))
    }
}

//! Telegram user session of one account.
//!
//! Used to log an account in once and, on every start, to open the
//! mini-app web view whose URL carries the signed init data.

use std::path::Path;
use std::sync::Arc;

use grammers_client::client::{LoginToken, PasswordToken};
use grammers_client::{Client, InvocationError, SenderPool, SignInError, sender};
use grammers_session::storages::SqliteSession;
use grammers_tl_types as tl;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::TelegramConfig;

/// Platform reported when opening the web view.
const WEB_VIEW_PLATFORM: &str = "ios";

/// Failures of a Telegram session.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("session is not signed in")]
    NotAuthorized,

    #[error("login rejected: {0}")]
    LoginFailed(String),

    #[error("two-step verification password needed")]
    PasswordRequired(PasswordToken),

    #[error("wrong two-step verification password")]
    InvalidPassword(PasswordToken),

    #[error("flood wait of {0}s imposed by Telegram")]
    FloodWait(u32),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("session storage: {0}")]
    Session(String),

    #[error("bot @{0} not found")]
    BotNotFound(String),

    #[error("web view: {0}")]
    WebView(String),

    #[error("RPC failed: {0}")]
    Rpc(String),
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        match err {
            InvocationError::Rpc(rpc) if rpc.name == "FLOOD_WAIT" => {
                Self::FloodWait(rpc.value.unwrap_or_default())
            }
            other => Self::Rpc(other.to_string()),
        }
    }
}

/// Connected Telegram session of one account.
pub struct TelegramSession {
    client: Client,
    pool: sender::SenderPoolHandle,
    _runner: JoinHandle<()>,
}

impl TelegramSession {
    /// Opens the session file at `session_path` and connects, reporting
    /// `device_model` to Telegram when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be opened.
    pub async fn connect(
        config: &TelegramConfig,
        session_path: &Path,
        device_model: Option<&str>,
    ) -> Result<Self, TelegramError> {
        debug!("Opening Telegram session {}", session_path.display());

        if let Some(parent) = session_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TelegramError::Session(e.to_string()))?;
        }

        let storage = SqliteSession::open(session_path)
            .await
            .map_err(|e| TelegramError::Session(e.to_string()))?;

        // Updates are never consumed; dropping the receiver discards them.
        let SenderPool { runner, handle, .. } = SenderPool::with_configuration(
            Arc::new(storage),
            config.api_id,
            connection_params(device_model),
        );
        let client = Client::new(handle.clone());

        Ok(Self {
            client,
            pool: handle.thin,
            _runner: tokio::spawn(runner.run()),
        })
    }

    /// Whether the stored session is signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if Telegram cannot be reached.
    pub async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))
    }

    /// Asks Telegram to send a login code to `phone`.
    ///
    /// # Errors
    ///
    /// Returns an error if Telegram refuses to send the code.
    pub async fn request_login_code(
        &self,
        phone: &str,
        api_hash: &str,
    ) -> Result<LoginToken, TelegramError> {
        info!("Sending login code to {}", mask_phone(phone));
        self.client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| TelegramError::LoginFailed(e.to_string()))
    }

    /// Completes the login with the received code.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError::PasswordRequired`] when the account has
    /// two-step verification enabled.
    pub async fn sign_in(&self, token: &LoginToken, code: &str) -> Result<(), TelegramError> {
        let err = match self.client.sign_in(token, code).await {
            Ok(_) => {
                info!("Signed in");
                return Ok(());
            }
            Err(err) => err,
        };

        Err(match err {
            SignInError::PasswordRequired(token) => TelegramError::PasswordRequired(token),
            SignInError::InvalidCode => TelegramError::LoginFailed("wrong login code".to_owned()),
            other => TelegramError::LoginFailed(other.to_string()),
        })
    }

    /// Completes a login that needs the two-step verification password.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError::InvalidPassword`] with a fresh token to retry.
    pub async fn check_password(
        &self,
        token: PasswordToken,
        password: &str,
    ) -> Result<(), TelegramError> {
        match self.client.check_password(token, password).await {
            Ok(_) => {
                info!("Signed in with two-step verification");
                Ok(())
            }
            Err(SignInError::InvalidPassword(token)) => Err(TelegramError::InvalidPassword(token)),
            Err(other) => Err(TelegramError::LoginFailed(other.to_string())),
        }
    }

    /// Opens the web view of `bot_username` at `url` and returns the
    /// decoded init data carried in its URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not authorized, the bot cannot be
    /// resolved or the returned URL carries no init data.
    pub async fn fetch_web_app_data(
        &self,
        bot_username: &str,
        url: &str,
    ) -> Result<String, TelegramError> {
        if !self.is_authorized().await? {
            return Err(TelegramError::NotAuthorized);
        }

        let (peer, bot) = self.resolve_bot(bot_username).await?;

        let request = tl::functions::messages::RequestWebView {
            from_bot_menu: true,
            silent: false,
            compact: false,
            fullscreen: false,
            peer,
            bot,
            url: Some(url.to_owned()),
            start_param: None,
            theme_params: None,
            platform: WEB_VIEW_PLATFORM.to_owned(),
            reply_to: None,
            send_as: None,
        };

        let tl::enums::WebViewResult::Url(result) = self.client.invoke(&request).await?;
        debug!("Web view opened for {}", bot_username);

        extract_init_data(&result.url)
            .ok_or_else(|| TelegramError::WebView("no tgWebAppData in web view URL".to_owned()))
    }

    async fn resolve_bot(
        &self,
        username: &str,
    ) -> Result<(tl::enums::InputPeer, tl::enums::InputUser), TelegramError> {
        let request = tl::functions::contacts::ResolveUsername {
            username: username.to_owned(),
            referer: None,
        };
        let tl::enums::contacts::ResolvedPeer::Peer(resolved) = self.client.invoke(&request).await?;

        let tl::enums::Peer::User(peer) = resolved.peer else {
            return Err(TelegramError::BotNotFound(username.to_owned()));
        };

        resolved
            .users
            .into_iter()
            .find_map(|user| match user {
                tl::enums::User::User(user) if user.id == peer.user_id => Some((
                    tl::types::InputPeerUser {
                        user_id: user.id,
                        access_hash: user.access_hash.unwrap_or_default(),
                    }
                    .into(),
                    tl::types::InputUser {
                        user_id: user.id,
                        access_hash: user.access_hash.unwrap_or_default(),
                    }
                    .into(),
                )),
                _ => None,
            })
            .ok_or_else(|| TelegramError::BotNotFound(username.to_owned()))
    }

    /// Closes the connection; the session file stays usable.
    pub fn disconnect(&self) {
        debug!("Closing Telegram connection");
        self.pool.quit();
    }
}

impl std::fmt::Debug for TelegramSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSession").finish_non_exhaustive()
    }
}

/// Connection parameters carrying the account's device model.
fn connection_params(device_model: Option<&str>) -> sender::ConnectionParams {
    let mut params = sender::ConnectionParams::default();
    if let Some(model) = device_model.map(str::trim).filter(|m| !m.is_empty()) {
        params.device_model = model.to_owned();
    }
    params
}

/// Pulls `tgWebAppData` out of a web view URL.
///
/// The value is percent-encoded twice.
#[must_use]
pub fn extract_init_data(url: &str) -> Option<String> {
    let start = url.find("tgWebAppData=")? + "tgWebAppData=".len();
    let raw = url[start..].split('&').next()?;
    if raw.is_empty() {
        return None;
    }

    let once = urlencoding::decode(raw).ok()?;
    let twice = urlencoding::decode(&once).ok()?;
    Some(twice.into_owned())
}

/// Phone number reduced to its last four digits, for logs.
#[must_use]
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    match digits.len().checked_sub(4) {
        Some(start) if start > 0 => format!("***{}", digits[start..].iter().collect::<String>()),
        _ => "****".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+44 7700 900123"), "***0123");
        assert_eq!(mask_phone("+1 55"), "****");
    }

    #[test]
    fn test_connection_params_report_device_model() {
        let params = connection_params(Some("iPhone 14 Pro"));
        assert_eq!(params.device_model, "iPhone 14 Pro");

        let default_model = sender::ConnectionParams::default().device_model;
        assert_eq!(connection_params(None).device_model, default_model);
        assert_eq!(connection_params(Some("  ")).device_model, default_model);
    }

    #[test]
    fn test_extract_init_data_decodes_twice() {
        let url = "https://telegram.blum.codes/#tgWebAppData=query_id%3DAAF%26user%3D%257B%2522id%2522%253A42%257D%26auth_date%3D1714564800%26hash%3Dabc&tgWebAppVersion=7.4&tgWebAppPlatform=ios";
        assert_eq!(
            extract_init_data(url).unwrap(),
            r#"query_id=AAF&user={"id":42}&auth_date=1714564800&hash=abc"#
        );
    }

    #[test]
    fn test_extract_init_data_missing() {
        assert_eq!(extract_init_data("https://telegram.blum.codes/#tgWebAppVersion=7.4"), None);
        assert_eq!(extract_init_data("https://telegram.blum.codes/#tgWebAppData=&x=1"), None);
    }
}

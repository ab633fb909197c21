//! Mini-app actions on top of [`BlumApi`].

use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, warn};
use uuid::Uuid;

use super::api::{ApiError, BlumApi, Service};
use super::types::{
    Balance, DailyInfo, Farming, FarmingClaim, FriendsBalance, FriendsClaim, GameClaim,
    GameStarted, ServerTime,
};
use crate::action::{ActionClient, ActionKind, ActionParams, ActionPayload, Outcome};
use crate::scheduler::{Clock, next_daily_boundary};

/// Action client of one authenticated mini-app session.
pub struct BlumActionClient {
    api: BlumApi,
    clock: Arc<dyn Clock>,
    daily_offset_minutes: i32,
    needs_refresh: bool,
}

impl BlumActionClient {
    /// Wraps a logged-in API session.
    #[must_use]
    pub fn new(api: BlumApi, clock: Arc<dyn Clock>, daily_offset_minutes: i32) -> Self {
        Self {
            api,
            clock,
            daily_offset_minutes,
            needs_refresh: false,
        }
    }

    async fn run(&mut self, kind: ActionKind, params: &ActionParams) -> Result<Outcome, ApiError> {
        if self.needs_refresh {
            match self.api.refresh().await {
                Ok(()) => self.needs_refresh = false,
                Err(e) if e.status().is_some_and(|s| (400..500).contains(&s) && s != 408 && s != 429) => {
                    return Ok(Outcome::permanent(format!("token refresh rejected: {e}")));
                }
                Err(e) => return Err(e),
            }
        }

        match kind {
            ActionKind::FetchState => self.fetch_state().await,
            ActionKind::ClaimDaily => self.claim_daily().await,
            ActionKind::ClaimTimeReward => self.claim_time_reward(params).await,
            ActionKind::ClaimReferral => self.claim_referral().await,
            ActionKind::PlayGame => self.play_game(params).await,
        }
    }

    async fn fetch_state(&self) -> Result<Outcome, ApiError> {
        let balance: Balance = self
            .api
            .fetch(self.api.request(Method::GET, Service::Game, "user/balance"))
            .await?;

        Ok(Outcome::Success(ActionPayload {
            balance: Some(balance.available_balance),
            tickets: Some(balance.play_passes),
            farming_ends_at: balance.farming.and_then(|f| f.end_time),
            next_available_at: None,
            summary: Some(format!(
                "balance {:.2}, {} ticket(s)",
                balance.available_balance, balance.play_passes
            )),
        }))
    }

    async fn claim_daily(&self) -> Result<Outcome, ApiError> {
        let path = format!("daily-reward?offset={}", self.daily_offset_minutes);

        let info = match self
            .api
            .fetch::<DailyInfo>(self.api.request(Method::GET, Service::Game, &path))
            .await
        {
            Ok(info) => info,
            Err(ApiError::Status { status: 404, .. }) => {
                let retry_at = next_daily_boundary(self.clock.now(), self.daily_offset_minutes);
                debug!("Daily reward already claimed");
                return Ok(Outcome::Unavailable { retry_at });
            }
            Err(ApiError::Decode(e)) => {
                debug!("Unrecognized daily reward info: {}", e);
                DailyInfo::default()
            }
            Err(e) => return Err(e),
        };

        self.api
            .ack(self.api.request(Method::POST, Service::Game, &path))
            .await?;

        let summary = match info.days.last() {
            Some(day) => format!(
                "daily reward day {}, {} ticket(s), {} points",
                day.original, day.reward.passes, day.reward.points
            ),
            None => "daily reward claimed".to_owned(),
        };
        Ok(Outcome::Success(ActionPayload::summary(summary)))
    }

    async fn claim_time_reward(&self, params: &ActionParams) -> Result<Outcome, ApiError> {
        let server: ServerTime = self
            .api
            .fetch(self.api.request(Method::GET, Service::Game, "time/now"))
            .await?;
        let now = server.now.unwrap_or_else(|| self.clock.now());

        let ends_at = params.snapshot.farming_ends_at;
        if let Some(ends_at) = ends_at
            && ends_at > now
        {
            return Ok(Outcome::Unavailable { retry_at: ends_at });
        }

        let mut balance = None;
        let mut tickets = None;
        if ends_at.is_some() {
            let claimed: FarmingClaim = self
                .api
                .fetch(self.api.request(Method::POST, Service::Game, "farming/claim"))
                .await?;
            balance = Some(claimed.available_balance);
            tickets = claimed.play_passes;
        }

        let farming: Farming = self
            .api
            .fetch(self.api.request(Method::POST, Service::Game, "farming/start"))
            .await?;

        let summary = match farming.end_time {
            Some(end) => format!("farming until {}", end.format("%H:%M")),
            None => "farming started".to_owned(),
        };
        Ok(Outcome::Success(ActionPayload {
            balance,
            tickets,
            farming_ends_at: farming.end_time,
            next_available_at: farming.end_time,
            summary: Some(summary),
            ..ActionPayload::default()
        }))
    }

    async fn claim_referral(&self) -> Result<Outcome, ApiError> {
        let friends: FriendsBalance = self
            .api
            .fetch(self.api.request(Method::GET, Service::User, "friends/balance"))
            .await?;

        if friends.used_invitation == 0 || friends.amount_for_claim <= 0.0 {
            return Ok(Outcome::Success(ActionPayload::summary("no referral points to claim")));
        }

        if !friends.can_claim {
            return Ok(match friends.can_claim_at {
                Some(retry_at) => Outcome::Unavailable { retry_at },
                None => Outcome::Success(ActionPayload::summary("referral points not claimable yet")),
            });
        }

        let claimed: FriendsClaim = self
            .api
            .fetch(self.api.request(Method::POST, Service::User, "friends/claim"))
            .await?;
        Ok(Outcome::Success(ActionPayload::summary(format!(
            "claimed {:.2} referral points from {} friend(s)",
            claimed.claim_balance, friends.used_invitation
        ))))
    }

    async fn play_game(&self, params: &ActionParams) -> Result<Outcome, ApiError> {
        let Some(plan) = params.game else {
            return Ok(Outcome::permanent("game started without a plan"));
        };

        let started: GameStarted = self
            .api
            .fetch(self.api.request(Method::POST, Service::Game, "game/play"))
            .await?;
        let game_id = valid_game_id(&started.game_id)?;
        debug!("Game {} started, playing for {:?}", game_id, plan.duration);

        tokio::select! {
            biased;
            () = params.cancel.cancelled() => {
                warn!("Game {} interrupted by shutdown", game_id);
                return Ok(Outcome::transient("game interrupted by shutdown"));
            }
            () = tokio::time::sleep(plan.duration) => {}
        }

        let body = GameClaim {
            game_id: &game_id,
            points: plan.points,
        };
        self.api
            .ack(self.api.request(Method::POST, Service::Game, "game/claim").json(&body))
            .await?;

        Ok(Outcome::Success(ActionPayload {
            tickets: Some(params.snapshot.tickets.saturating_sub(1)),
            summary: Some(format!("game finished with {} points", plan.points)),
            ..ActionPayload::default()
        }))
    }
}

impl ActionClient for BlumActionClient {
    fn invoke(
        &mut self,
        kind: ActionKind,
        params: &ActionParams,
    ) -> impl std::future::Future<Output = Outcome> + Send {
        async move {
            match self.run(kind, params).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    if e.is_unauthorized() {
                        self.needs_refresh = true;
                    }
                    e.classify(self.clock.now())
                }
            }
        }
    }
}

impl std::fmt::Debug for BlumActionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlumActionClient")
            .field("api", &self.api)
            .field("needs_refresh", &self.needs_refresh)
            .finish_non_exhaustive()
    }
}

/// Game ids are random (version 4) UUIDs.
fn valid_game_id(raw: &str) -> Result<String, ApiError> {
    Uuid::parse_str(raw.trim())
        .ok()
        .filter(|id| id.get_version() == Some(uuid::Version::Random))
        .map(|id| id.hyphenated().to_string())
        .ok_or_else(|| ApiError::InvalidGameId(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ErrorClass, GamePlan, StateSnapshot};
    use crate::blum::api::Endpoints;
    use crate::config::{PacingConfig, SessionIdentity};
    use crate::scheduler::SystemClock;
    use chrono::{DateTime, Utc};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GAME_ID: &str = "0c4b1d3e-8f2a-4b7c-9d1e-2f3a4b5c6d7e";

    fn pacing() -> PacingConfig {
        let mut pacing = PacingConfig::default();
        pacing.request_spacing_ms = 0;
        pacing.request_timeout_secs = 1;
        pacing
    }

    async fn client(server: &MockServer) -> BlumActionClient {
        Mock::given(method("POST"))
            .and(path("/user/auth/provider/PROVIDER_TELEGRAM_MINI_APP"))
            .and(body_json(serde_json::json!({"query": "user=alice"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": {"access": "access-1", "refresh": "refresh-1"}
            })))
            .mount(server)
            .await;

        let endpoints = Endpoints {
            game: format!("{}/game/", server.uri()),
            user: format!("{}/user/", server.uri()),
        };
        let mut api = BlumApi::new(&SessionIdentity::new("alice"), endpoints, &pacing()).unwrap();
        api.login("user=alice").await.unwrap();
        BlumActionClient::new(api, Arc::new(SystemClock), 420)
    }

    fn params(tickets: u32, farming_ends_at: Option<DateTime<Utc>>) -> ActionParams {
        ActionParams {
            snapshot: StateSnapshot {
                tickets,
                farming_ends_at,
                ..StateSnapshot::default()
            },
            game: Some(GamePlan {
                duration: Duration::from_millis(10),
                points: 205,
            }),
            cancel: CancellationToken::new(),
        }
    }

    fn class_of(outcome: &Outcome) -> Option<ErrorClass> {
        match outcome {
            Outcome::Error { class, .. } => Some(*class),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_fetch_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/game/user/balance"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "availableBalance": "1520.5",
                "playPasses": 3,
                "farming": {"startTime": 1714564800000u64, "endTime": 1714593600000u64}
            })))
            .mount(&server)
            .await;

        let mut client = client(&server).await;
        let Outcome::Success(payload) = client.invoke(ActionKind::FetchState, &params(0, None)).await else {
            panic!("expected success");
        };
        assert_eq!(payload.tickets, Some(3));
        assert_eq!(payload.balance, Some(1520.5));
        assert_eq!(payload.farming_ends_at, DateTime::from_timestamp_millis(1_714_593_600_000));
    }

    #[tokio::test]
    async fn test_daily_already_claimed_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/game/daily-reward"))
            .and(query_param("offset", "420"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut client = client(&server).await;
        let outcome = client.invoke(ActionKind::ClaimDaily, &params(0, None)).await;
        assert!(matches!(outcome, Outcome::Unavailable { retry_at } if retry_at > Utc::now()));
    }

    #[tokio::test]
    async fn test_daily_claim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/game/daily-reward"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "days": [{"original": 4, "reward": {"passes": 2, "points": "30"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/game/daily-reward"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client(&server).await;
        let Outcome::Success(payload) = client.invoke(ActionKind::ClaimDaily, &params(0, None)).await else {
            panic!("expected success");
        };
        assert!(payload.summary.unwrap().contains("day 4"));
    }

    #[tokio::test]
    async fn test_time_reward_still_farming() {
        let server = MockServer::start().await;
        let now_ms = Utc::now().timestamp_millis();
        Mock::given(method("GET"))
            .and(path("/game/time/now"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"now": now_ms})))
            .mount(&server)
            .await;

        let ends_at = DateTime::from_timestamp_millis(now_ms + 3_600_000).unwrap();
        let mut client = client(&server).await;
        let outcome = client
            .invoke(ActionKind::ClaimTimeReward, &params(0, Some(ends_at)))
            .await;
        assert_eq!(outcome, Outcome::Unavailable { retry_at: ends_at });
    }

    #[tokio::test]
    async fn test_time_reward_claims_and_restarts_farming() {
        let server = MockServer::start().await;
        let now_ms = Utc::now().timestamp_millis();
        let new_end = now_ms + 8 * 3_600_000;
        Mock::given(method("GET"))
            .and(path("/game/time/now"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"now": now_ms})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/game/farming/claim"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "availableBalance": "2000.25", "playPasses": 3
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/game/farming/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "startTime": now_ms, "endTime": new_end
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ended = DateTime::from_timestamp_millis(now_ms - 1000).unwrap();
        let mut client = client(&server).await;
        let Outcome::Success(payload) = client
            .invoke(ActionKind::ClaimTimeReward, &params(0, Some(ended)))
            .await
        else {
            panic!("expected success");
        };
        assert_eq!(payload.balance, Some(2000.25));
        assert_eq!(payload.tickets, Some(3));
        assert_eq!(payload.next_available_at, DateTime::from_timestamp_millis(new_end));
    }

    #[tokio::test]
    async fn test_time_reward_falls_back_to_local_clock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/game/time/now"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/game/farming/claim"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let ends_at = Utc::now() + chrono::TimeDelta::hours(2);
        let mut client = client(&server).await;
        let outcome = client
            .invoke(ActionKind::ClaimTimeReward, &params(0, Some(ends_at)))
            .await;
        assert_eq!(outcome, Outcome::Unavailable { retry_at: ends_at });
    }

    #[tokio::test]
    async fn test_time_reward_claim_without_passes_keeps_tickets() {
        let server = MockServer::start().await;
        let now_ms = Utc::now().timestamp_millis();
        Mock::given(method("GET"))
            .and(path("/game/time/now"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"now": now_ms})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/game/farming/claim"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "availableBalance": "10"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/game/farming/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "startTime": now_ms, "endTime": now_ms + 3_600_000
            })))
            .mount(&server)
            .await;

        let ended = DateTime::from_timestamp_millis(now_ms - 1000).unwrap();
        let mut client = client(&server).await;
        let Outcome::Success(payload) = client
            .invoke(ActionKind::ClaimTimeReward, &params(5, Some(ended)))
            .await
        else {
            panic!("expected success");
        };
        assert_eq!(payload.tickets, None);
    }

    #[tokio::test]
    async fn test_referral_not_claimable_yet() {
        let server = MockServer::start().await;
        let at_ms = Utc::now().timestamp_millis() + 7_200_000;
        Mock::given(method("GET"))
            .and(path("/user/friends/balance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "amountForClaim": "12.5", "canClaim": false, "canClaimAt": at_ms.to_string(), "usedInvitation": 2
            })))
            .mount(&server)
            .await;

        let mut client = client(&server).await;
        let outcome = client.invoke(ActionKind::ClaimReferral, &params(0, None)).await;
        assert_eq!(
            outcome,
            Outcome::Unavailable {
                retry_at: DateTime::from_timestamp_millis(at_ms).unwrap()
            }
        );
    }

    #[tokio::test]
    async fn test_referral_nothing_to_claim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/friends/balance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "amountForClaim": "0", "canClaim": false, "usedInvitation": 0
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/user/friends/claim"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut client = client(&server).await;
        let outcome = client.invoke(ActionKind::ClaimReferral, &params(0, None)).await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_play_game() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/game/game/play"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"gameId": GAME_ID})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/game/game/claim"))
            .and(body_json(serde_json::json!({"gameId": GAME_ID, "points": 205})))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client(&server).await;
        let Outcome::Success(payload) = client.invoke(ActionKind::PlayGame, &params(3, None)).await else {
            panic!("expected success");
        };
        assert_eq!(payload.tickets, Some(2));
    }

    #[tokio::test]
    async fn test_game_interrupted_by_shutdown_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/game/game/play"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"gameId": GAME_ID})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/game/game/claim"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut client = client(&server).await;
        let params = params(3, None);
        params.cancel.cancel();
        let outcome = client.invoke(ActionKind::PlayGame, &params).await;
        assert_eq!(class_of(&outcome), Some(ErrorClass::Transient));
    }

    #[tokio::test]
    async fn test_invalid_game_id_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/game/game/play"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"gameId": "not-a-uuid"})))
            .mount(&server)
            .await;

        let mut client = client(&server).await;
        let outcome = client.invoke(ActionKind::PlayGame, &params(3, None)).await;
        assert_eq!(class_of(&outcome), Some(ErrorClass::Transient));
    }

    #[tokio::test]
    async fn test_unauthorized_triggers_refresh_on_next_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/game/user/balance"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/user/auth/refresh"))
            .and(body_json(serde_json::json!({"refresh": "refresh-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access": "access-2", "refresh": "refresh-2"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/game/user/balance"))
            .and(header("authorization", "Bearer access-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "availableBalance": "1", "playPasses": 0
            })))
            .mount(&server)
            .await;

        let mut client = client(&server).await;
        let first = client.invoke(ActionKind::FetchState, &params(0, None)).await;
        assert_eq!(class_of(&first), Some(ErrorClass::Transient));

        let second = client.invoke(ActionKind::FetchState, &params(0, None)).await;
        assert!(second.is_success());
    }

    #[tokio::test]
    async fn test_rejected_refresh_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/game/user/balance"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/user/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let mut client = client(&server).await;
        client.invoke(ActionKind::FetchState, &params(0, None)).await;
        let outcome = client.invoke(ActionKind::FetchState, &params(0, None)).await;
        assert_eq!(class_of(&outcome), Some(ErrorClass::Permanent));
    }

    #[tokio::test]
    async fn test_status_translation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/friends/balance"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "120"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/game/user/balance"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/game/time/now"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let mut client = client(&server).await;
        let before = Utc::now();

        let limited = client.invoke(ActionKind::ClaimReferral, &params(0, None)).await;
        assert!(matches!(limited, Outcome::Unavailable { retry_at } if retry_at >= before + chrono::TimeDelta::seconds(120)));

        let unavailable = client.invoke(ActionKind::FetchState, &params(0, None)).await;
        assert_eq!(class_of(&unavailable), Some(ErrorClass::Transient));

        let forbidden = client.invoke(ActionKind::ClaimTimeReward, &params(0, None)).await;
        assert_eq!(class_of(&forbidden), Some(ErrorClass::Permanent));
    }

    #[tokio::test]
    async fn test_malformed_body_and_timeout_are_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/game/user/balance"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/friends/balance"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut client = client(&server).await;
        let malformed = client.invoke(ActionKind::FetchState, &params(0, None)).await;
        assert_eq!(class_of(&malformed), Some(ErrorClass::Transient));

        let timed_out = client.invoke(ActionKind::ClaimReferral, &params(0, None)).await;
        assert_eq!(class_of(&timed_out), Some(ErrorClass::Transient));
    }

    #[test]
    fn test_valid_game_id() {
        assert_eq!(valid_game_id(GAME_ID).unwrap(), GAME_ID);
        assert!(valid_game_id("not-a-uuid").is_err());
        // Version 1 UUID.
        assert!(valid_game_id("c232ab00-9414-11ec-b3c8-9f68deced846").is_err());
    }
}

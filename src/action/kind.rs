//! Action kinds and their dependencies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One category of automated interaction with the mini-app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Refresh balance, ticket count and farming period.
    FetchState,
    /// Claim the daily check-in reward.
    ClaimDaily,
    /// Claim the farming reward and start the next farming period.
    ClaimTimeReward,
    /// Claim points earned through invited friends.
    ClaimReferral,
    /// Play one game using a ticket.
    PlayGame,
}

/// What an action needs from the latest known session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    /// Can fire without any state.
    None,
    /// Needs a state fetch that is not stale.
    FreshState,
    /// Needs at least one ticket in the latest known state.
    Tickets,
}

impl ActionKind {
    /// Every kind, in the order used for deterministic iteration.
    pub const ALL: [Self; 5] = [
        Self::FetchState,
        Self::ClaimDaily,
        Self::ClaimTimeReward,
        Self::ClaimReferral,
        Self::PlayGame,
    ];

    /// Returns the dependency of this kind.
    #[must_use]
    pub const fn dependency(self) -> Dependency {
        match self {
            Self::FetchState | Self::ClaimDaily | Self::ClaimReferral => Dependency::None,
            Self::ClaimTimeReward => Dependency::FreshState,
            Self::PlayGame => Dependency::Tickets,
        }
    }

    /// Whether a success of this kind changes balance or tickets on the server.
    #[must_use]
    pub const fn invalidates_state(self) -> bool {
        !matches!(self, Self::FetchState)
    }

    /// Stable snake-case name, matching the configuration keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FetchState => "fetch_state",
            Self::ClaimDaily => "claim_daily",
            Self::ClaimTimeReward => "claim_time_reward",
            Self::ClaimReferral => "claim_referral",
            Self::PlayGame => "play_game",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use anyhow::Context;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};
use tracing::instrument;

use super::data::{LeaderboardEntry, RecentJoinSeed};
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize)]
pub struct RecentJoin {
    pub username: String,
    pub joined_at: String,
}

#[derive(Debug, Serialize)]
pub struct RecentJoinsResponse {
    pub recent_joins: Vec<RecentJoin>,
}

pub fn showcase_routes() -> Router<AppState> {
    Router::new()
        .route("/leaderboard", get(leaderboard))
        .route("/recent-joins", get(recent_joins))
}

#[instrument(skip(state))]
pub async fn leaderboard(State(state): State<AppState>) -> Json<LeaderboardResponse> {
    Json(LeaderboardResponse {
        leaderboard: state.showcase.leaderboard.clone(),
    })
}

#[instrument(skip(state))]
pub async fn recent_joins(
    State(state): State<AppState>,
) -> Result<Json<RecentJoinsResponse>, ApiError> {
    let now = OffsetDateTime::now_utc();
    let recent_joins = state
        .showcase
        .recent_joins
        .iter()
        .map(|seed| render_join(seed, now))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(RecentJoinsResponse { recent_joins }))
}

fn render_join(seed: &RecentJoinSeed, now: OffsetDateTime) -> anyhow::Result<RecentJoin> {
    let joined = seed
        .minutes_ago
        .checked_mul(60)
        .and_then(|secs| now.checked_sub(Duration::seconds(secs)))
        .with_context(|| format!("join time {} minutes ago is out of range", seed.minutes_ago))?;
    Ok(RecentJoin {
        username: seed.username.clone(),
        joined_at: joined.format(&Rfc3339)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn join_time_is_relative_to_now() {
        let seed = RecentJoinSeed {
            username: "newuser1".into(),
            minutes_ago: 2,
        };
        let join = render_join(&seed, datetime!(2024-05-01 12:00:00 UTC)).unwrap();
        assert_eq!(join.username, "newuser1");
        assert_eq!(join.joined_at, "2024-05-01T11:58:00Z");
    }

    #[test]
    fn absurd_join_offset_is_an_error() {
        let seed = RecentJoinSeed {
            username: "ancient".into(),
            minutes_ago: i64::MAX,
        };
        assert!(render_join(&seed, datetime!(2024-05-01 12:00:00 UTC)).is_err());

        let seed = RecentJoinSeed {
            username: "ancient".into(),
            minutes_ago: 60 * 24 * 365 * 100_000,
        };
        assert!(render_join(&seed, datetime!(2024-05-01 12:00:00 UTC)).is_err());
    }
}

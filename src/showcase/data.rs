use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub username: String,
    pub earnings: i64,
    pub level: String,
}

/// A recent join as configured: relative to the moment it is served.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentJoinSeed {
    pub username: String,
    pub minutes_ago: i64,
}

/// Read-only marketing data served on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Showcase {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub recent_joins: Vec<RecentJoinSeed>,
}

impl Showcase {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("read showcase file {}", p.display()))?;
                let showcase: Self = serde_json::from_str(&raw)
                    .with_context(|| format!("parse showcase file {}", p.display()))?;
                showcase.validate()?;
                Ok(showcase)
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        for join in &self.recent_joins {
            if !(0..=MAX_MINUTES_AGO).contains(&join.minutes_ago) {
                anyhow::bail!(
                    "recent join {:?}: minutes_ago must be between 0 and {MAX_MINUTES_AGO}",
                    join.username
                );
            }
        }
        Ok(())
    }
}

/// Roughly a thousand years.
const MAX_MINUTES_AGO: i64 = 60 * 24 * 365 * 1000;

impl Default for Showcase {
    fn default() -> Self {
        let entry = |username: &str, earnings: i64, level: &str| LeaderboardEntry {
            username: username.into(),
            earnings,
            level: level.into(),
        };
        let join = |username: &str, minutes_ago: i64| RecentJoinSeed {
            username: username.into(),
            minutes_ago,
        };
        Self {
            leaderboard: vec![
                entry("Rizzo", 999, "Empire"),
                entry("Alex", 497, "Empire"),
                entry("Sarah", 197, "Professional"),
                entry("Mike", 97, "Starter Tools"),
                entry("Jordan", 29, "Basic Starter"),
            ],
            recent_joins: vec![join("newuser1", 2), join("newuser2", 5), join("newuser3", 10)],
        }
    }
}

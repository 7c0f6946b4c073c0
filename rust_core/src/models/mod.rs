// Shared models for the club data layer
use crate::error::{ExtractionError, InvariantViolation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Categories
// ============================================================================

/// Independently cached slice of club data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataCategory {
    Squad,
    Fixtures,
    Standings,
}

impl DataCategory {
    pub const ALL: [DataCategory; 3] = [
        DataCategory::Squad,
        DataCategory::Fixtures,
        DataCategory::Standings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataCategory::Squad => "squad",
            DataCategory::Fixtures => "fixtures",
            DataCategory::Standings => "standings",
        }
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "squad" | "players" => Ok(DataCategory::Squad),
            "fixtures" | "matches" => Ok(DataCategory::Fixtures),
            "standings" | "league" | "position" => Ok(DataCategory::Standings),
            other => Err(format!("unknown data category: {}", other)),
        }
    }
}

// ============================================================================
// Players
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    /// Strict lookup of a provider position code.
    ///
    /// Accepts single letters (API-Football), two-letter codes (FBref) and
    /// the canonical names. Composite codes such as `"DF,MF"` use the first.
    pub fn parse_code(code: &str) -> Option<Position> {
        let primary = code
            .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .find(|part| !part.is_empty())?
            .to_uppercase();

        match primary.as_str() {
            "G" | "GK" | "GOALKEEPER" => Some(Position::Goalkeeper),
            "D" | "DF" | "DEF" | "DEFENDER" => Some(Position::Defender),
            "M" | "MF" | "MID" | "MIDFIELDER" => Some(Position::Midfielder),
            "F" | "FW" | "ATT" | "ATTACKER" | "FORWARD" => Some(Position::Forward),
            _ => None,
        }
    }

    /// Lenient mapping; unknown codes become `Midfielder`.
    pub fn from_code(code: &str) -> Position {
        Self::parse_code(code).unwrap_or(Position::Midfielder)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "Goalkeeper",
            Position::Defender => "Defender",
            Position::Midfielder => "Midfielder",
            Position::Forward => "Forward",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Position {
    fn from(code: String) -> Self {
        Position::from_code(&code)
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: u64,
    pub name: String,
    /// Shirt number; `None` when no source knows it
    #[serde(default)]
    pub number: Option<u16>,
    pub position: Position,
    pub age: u32,
    pub nationality: String,
    pub photo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assists: Option<u32>,
}

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchResult {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "L")]
    Loss,
    #[serde(rename = "D")]
    Draw,
}

impl MatchResult {
    /// Outcome from the tracked club's point of view
    pub fn from_scores(club_score: u16, opponent_score: u16) -> MatchResult {
        match club_score.cmp(&opponent_score) {
            std::cmp::Ordering::Greater => MatchResult::Win,
            std::cmp::Ordering::Less => MatchResult::Loss,
            std::cmp::Ordering::Equal => MatchResult::Draw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchResult::Win => "W",
            MatchResult::Loss => "L",
            MatchResult::Draw => "D",
        }
    }
}

/// Which side of a fixture the tracked club played on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub id: u64,
    pub date: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub home_logo: String,
    pub away_logo: String,
    pub venue: String,
    pub competition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<String>,
    #[serde(default)]
    pub home_score: Option<u16>,
    #[serde(default)]
    pub away_score: Option<u16>,
    #[serde(default)]
    pub result: Option<MatchResult>,
}

impl Fixture {
    pub fn is_played(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }

    /// Fill `result` for the club on `side`. Cleared when a score is missing.
    pub fn with_result_for(mut self, side: Option<Side>) -> Self {
        self.result = match (side, self.home_score, self.away_score) {
            (Some(Side::Home), Some(home), Some(away)) => Some(MatchResult::from_scores(home, away)),
            (Some(Side::Away), Some(home), Some(away)) => Some(MatchResult::from_scores(away, home)),
            _ => None,
        };
        self
    }
}

/// Fixtures split into played and scheduled lists.
///
/// `past` is ordered oldest to newest, `upcoming` soonest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureSet {
    pub past: Vec<Fixture>,
    pub upcoming: Vec<Fixture>,
}

impl FixtureSet {
    /// Partition fixtures by whether both scores are known
    pub fn from_fixtures(fixtures: impl IntoIterator<Item = Fixture>) -> Self {
        let (mut past, mut upcoming): (Vec<Fixture>, Vec<Fixture>) =
            fixtures.into_iter().partition(Fixture::is_played);
        past.sort_by_key(|f| f.date);
        upcoming.sort_by_key(|f| f.date);
        Self { past, upcoming }
    }

    /// The `limit` most recent played fixtures, oldest first
    pub fn recent_past(&self, limit: usize) -> Vec<Fixture> {
        let start = self.past.len().saturating_sub(limit);
        self.past[start..].to_vec()
    }

    pub fn next_upcoming(&self, limit: usize) -> Vec<Fixture> {
        self.upcoming.iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.past.len() + self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.past.is_empty() && self.upcoming.is_empty()
    }
}

// ============================================================================
// Standings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaguePosition {
    pub position: u32,
    pub points: u32,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals_for: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals_against: Option<u32>,
    pub goal_difference: i32,
}

impl LeaguePosition {
    /// Check the table row is internally consistent.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.position == 0 {
            return Err(InvariantViolation::PositionOutOfRange);
        }
        let record = self
            .won
            .checked_add(self.drawn)
            .and_then(|sum| sum.checked_add(self.lost));
        if record != Some(self.played) {
            return Err(InvariantViolation::RecordMismatch {
                played: self.played,
                won: self.won,
                drawn: self.drawn,
                lost: self.lost,
            });
        }
        if let (Some(goals_for), Some(goals_against)) = (self.goals_for, self.goals_against) {
            let expected = goals_for as i64 - goals_against as i64;
            if expected != self.goal_difference as i64 {
                return Err(InvariantViolation::GoalDifferenceMismatch {
                    goals_for,
                    goals_against,
                    goal_difference: self.goal_difference,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Normalized category payloads
// ============================================================================

/// Extraction output for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "data", rename_all = "lowercase")]
pub enum CategoryData {
    Squad(Vec<Player>),
    Fixtures(FixtureSet),
    Standings(LeaguePosition),
}

impl CategoryData {
    pub fn category(&self) -> DataCategory {
        match self {
            CategoryData::Squad(_) => DataCategory::Squad,
            CategoryData::Fixtures(_) => DataCategory::Fixtures,
            CategoryData::Standings(_) => DataCategory::Standings,
        }
    }

    pub fn record_count(&self) -> usize {
        match self {
            CategoryData::Squad(players) => players.len(),
            CategoryData::Fixtures(set) => set.len(),
            CategoryData::Standings(_) => 1,
        }
    }

    /// Reject payloads that must never be cached as live data.
    ///
    /// An empty squad, a fixture set with neither past nor upcoming games,
    /// and a standings row breaking its invariants all count as failures.
    pub fn ensure_usable(&self) -> Result<(), ExtractionError> {
        match self {
            CategoryData::Squad(players) if players.is_empty() => {
                Err(ExtractionError::Empty(DataCategory::Squad))
            }
            CategoryData::Fixtures(set) if set.is_empty() => {
                Err(ExtractionError::Empty(DataCategory::Fixtures))
            }
            CategoryData::Standings(position) => {
                position.validate().map_err(ExtractionError::Suspect)
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Envelopes
// ============================================================================

pub const FALLBACK_SOURCE: &str = "fallback";

/// What callers receive: data plus where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataEnvelope<T> {
    pub data: T,
    pub is_live: bool,
    pub source: String,
    pub last_updated: Option<DateTime<Utc>>,
}

impl<T> DataEnvelope<T> {
    pub fn fallback(data: T) -> Self {
        Self {
            data,
            is_live: false,
            source: FALLBACK_SOURCE.to_string(),
            last_updated: None,
        }
    }
}

// ============================================================================
// Refresh & status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTarget {
    Category(DataCategory),
    All,
}

impl RefreshTarget {
    pub fn categories(&self) -> Vec<DataCategory> {
        match self {
            RefreshTarget::Category(category) => vec![*category],
            RefreshTarget::All => DataCategory::ALL.to_vec(),
        }
    }
}

impl From<DataCategory> for RefreshTarget {
    fn from(category: DataCategory) -> Self {
        RefreshTarget::Category(category)
    }
}

impl FromStr for RefreshTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(RefreshTarget::All);
        }
        s.parse::<DataCategory>().map(RefreshTarget::Category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRefresh {
    pub category: DataCategory,
    /// True when live data replaced the cache entry
    pub updated: bool,
    pub record_count: usize,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub categories: Vec<CategoryRefresh>,
}

impl RefreshResult {
    pub fn from_categories(categories: Vec<CategoryRefresh>) -> Self {
        let success = !categories.is_empty() && categories.iter().all(|c| c.updated);
        let record_count = categories
            .iter()
            .filter(|c| c.updated)
            .map(|c| c.record_count)
            .sum::<usize>();

        let failed: Vec<&str> = categories
            .iter()
            .filter(|c| !c.updated)
            .map(|c| c.category.as_str())
            .collect();
        let message = if failed.is_empty() {
            format!("refreshed {} records", record_count)
        } else {
            format!("serving fallback for: {}", failed.join(", "))
        };

        Self {
            success,
            record_count: Some(record_count),
            message: Some(message),
            categories,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Valid,
    Expired,
}

//! API-Football extractor
//!
//! Reads the `response` array of the players, fixtures and standings
//! endpoints. An empty `response` means the provider has nothing for the
//! club; a body without `response` is a structure error.

use super::{DocumentExtractor, ExtractContext, DEFAULT_PLAYER_AGE};
use crate::config::ProviderKind;
use crate::error::ExtractionError;
use crate::models::{
    CategoryData, DataCategory, Fixture, FixtureSet, LeaguePosition, Player, Position, Side,
};
use crate::retrieval::{DocumentBody, RawDocument};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

pub struct ApiFootballExtractor {
    ctx: ExtractContext,
}

impl ApiFootballExtractor {
    pub fn new(ctx: ExtractContext) -> Self {
        Self { ctx }
    }

    fn parse_player(&self, entry: &Value) -> Option<Player> {
        let player = &entry["player"];
        let id = player["id"].as_u64()?;
        let name = player["name"].as_str().map(str::trim).filter(|n| !n.is_empty())?;

        let stats = &entry["statistics"][0];
        let games = &stats["games"];

        Some(Player {
            id,
            name: name.to_string(),
            number: games["number"].as_u64().and_then(|n| u16::try_from(n).ok()),
            position: Position::from_code(games["position"].as_str().unwrap_or_default()),
            age: player["age"]
                .as_u64()
                .map(|a| a as u32)
                .unwrap_or(DEFAULT_PLAYER_AGE),
            nationality: player["nationality"]
                .as_str()
                .unwrap_or("Unknown")
                .to_string(),
            photo: player["photo"]
                .as_str()
                .filter(|p| !p.is_empty())
                .unwrap_or(self.ctx.default_photo.as_str())
                .to_string(),
            matches: games["appearences"].as_u64().map(|n| n as u32),
            goals: stats["goals"]["total"].as_u64().map(|n| n as u32),
            assists: stats["goals"]["assists"].as_u64().map(|n| n as u32),
        })
    }

    fn parse_fixture(&self, entry: &Value, team_id: Option<u64>) -> Option<Fixture> {
        let fixture = &entry["fixture"];
        let id = fixture["id"].as_u64()?;
        let date = fixture["date"]
            .as_str()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())?
            .with_timezone(&Utc);

        let home = &entry["teams"]["home"];
        let away = &entry["teams"]["away"];
        let home_team = home["name"].as_str()?.to_string();
        let away_team = away["name"].as_str()?.to_string();

        // Team ids are exact; names are the fallback
        let side = match team_id {
            Some(id) if home["id"].as_u64() == Some(id) => Some(Side::Home),
            Some(id) if away["id"].as_u64() == Some(id) => Some(Side::Away),
            _ => self.ctx.club.side_of(&home_team, &away_team),
        };

        let fixture = Fixture {
            id,
            date,
            home_logo: home["logo"].as_str().unwrap_or_default().to_string(),
            away_logo: away["logo"].as_str().unwrap_or_default().to_string(),
            home_team,
            away_team,
            venue: fixture["venue"]["name"]
                .as_str()
                .filter(|v| !v.is_empty())
                .unwrap_or("TBD")
                .to_string(),
            competition: entry["league"]["name"]
                .as_str()
                .unwrap_or(self.ctx.club.league.as_str())
                .to_string(),
            round: entry["league"]["round"].as_str().map(str::to_string),
            home_score: entry["goals"]["home"].as_u64().map(|g| g as u16),
            away_score: entry["goals"]["away"].as_u64().map(|g| g as u16),
            result: None,
        };
        Some(fixture.with_result_for(side))
    }

    fn parse_standings(
        &self,
        response: &[Value],
        team_id: Option<u64>,
    ) -> Result<LeaguePosition, ExtractionError> {
        let groups = response
            .first()
            .and_then(|league| league["league"]["standings"].as_array())
            .ok_or_else(|| ExtractionError::MissingStructure {
                provider: ProviderKind::ApiFootball,
                what: "league.standings".to_string(),
            })?;

        let row = groups
            .iter()
            .filter_map(Value::as_array)
            .flatten()
            .find(|row| match team_id {
                Some(id) if row["team"]["id"].as_u64() == Some(id) => true,
                _ => row["team"]["name"]
                    .as_str()
                    .map(|name| self.ctx.club.matches(name))
                    .unwrap_or(false),
            })
            .ok_or(ExtractionError::Empty(DataCategory::Standings))?;

        let all = &row["all"];
        let count = |v: &Value| v.as_u64().unwrap_or(0) as u32;

        Ok(LeaguePosition {
            position: count(&row["rank"]),
            points: count(&row["points"]),
            played: count(&all["played"]),
            won: count(&all["win"]),
            drawn: count(&all["draw"]),
            lost: count(&all["lose"]),
            goals_for: all["goals"]["for"].as_u64().map(|g| g as u32),
            goals_against: all["goals"]["against"].as_u64().map(|g| g as u32),
            goal_difference: row["goalsDiff"].as_i64().unwrap_or(0) as i32,
        })
    }
}

impl DocumentExtractor for ApiFootballExtractor {
    fn provider(&self) -> ProviderKind {
        ProviderKind::ApiFootball
    }

    fn extract(
        &self,
        doc: &RawDocument,
        category: DataCategory,
    ) -> Result<CategoryData, ExtractionError> {
        let DocumentBody::Json(json) = &doc.body else {
            return Err(ExtractionError::WrongBody {
                provider: ProviderKind::ApiFootball,
                expected: "json",
            });
        };

        let response = json["response"]
            .as_array()
            .ok_or_else(|| ExtractionError::MissingStructure {
                provider: ProviderKind::ApiFootball,
                what: "response array".to_string(),
            })?;

        match category {
            DataCategory::Squad => {
                let players: Vec<Player> = response
                    .iter()
                    .enumerate()
                    .filter_map(|(i, entry)| {
                        let player = self.parse_player(entry);
                        if player.is_none() {
                            debug!("Skipping malformed API-Football player entry {}", i);
                        }
                        player
                    })
                    .collect();
                Ok(CategoryData::Squad(players))
            }
            DataCategory::Fixtures => {
                let fixtures = response.iter().enumerate().filter_map(|(i, entry)| {
                    let fixture = self.parse_fixture(entry, doc.team_id);
                    if fixture.is_none() {
                        debug!("Skipping malformed API-Football fixture entry {}", i);
                    }
                    fixture
                });
                Ok(CategoryData::Fixtures(FixtureSet::from_fixtures(fixtures)))
            }
            DataCategory::Standings => {
                if response.is_empty() {
                    return Err(ExtractionError::Empty(DataCategory::Standings));
                }
                self.parse_standings(response, doc.team_id)
                    .map(CategoryData::Standings)
            }
        }
    }
}

//! Backend service extractor
//!
//! The backend answers `{ success, data: { squad | pastFixtures |
//! upcomingFixtures | leaguePosition, isLive, lastUpdated, source } }` with
//! records already in the canonical camelCase shape. Stored rows may carry
//! loosely typed fields (shirt numbers as `"N/A"`, numeric strings), so each
//! record is read on its own and bad ones are skipped.

use super::{DocumentExtractor, ExtractContext, DEFAULT_PLAYER_AGE};
use crate::config::ProviderKind;
use crate::error::ExtractionError;
use crate::models::{CategoryData, DataCategory, Fixture, FixtureSet, LeaguePosition, Player, Position};
use crate::retrieval::{DocumentBody, RawDocument};
use serde_json::Value;
use tracing::debug;

pub struct BackendExtractor {
    ctx: ExtractContext,
}

impl BackendExtractor {
    pub fn new(ctx: ExtractContext) -> Self {
        Self { ctx }
    }

    fn parse_player(&self, record: &Value, index: usize) -> Option<Player> {
        let name = record["name"].as_str().map(str::trim).filter(|n| !n.is_empty())?;

        Some(Player {
            id: loose_u64(&record["id"]).unwrap_or(index as u64 + 1),
            name: name.to_string(),
            number: loose_u64(&record["number"]).and_then(|n| u16::try_from(n).ok()),
            position: Position::from_code(record["position"].as_str().unwrap_or_default()),
            age: loose_u64(&record["age"])
                .map(|a| a as u32)
                .unwrap_or(DEFAULT_PLAYER_AGE),
            nationality: record["nationality"]
                .as_str()
                .unwrap_or("Unknown")
                .to_string(),
            photo: record["photo"]
                .as_str()
                .filter(|p| !p.is_empty())
                .unwrap_or(self.ctx.default_photo.as_str())
                .to_string(),
            matches: loose_u64(&record["matches"]).map(|n| n as u32),
            goals: loose_u64(&record["goals"]).map(|n| n as u32),
            assists: loose_u64(&record["assists"]).map(|n| n as u32),
        })
    }

    fn parse_fixture(&self, record: &Value) -> Option<Fixture> {
        let fixture: Fixture = serde_json::from_value(record.clone()).ok()?;
        let side = self.ctx.club.side_of(&fixture.home_team, &fixture.away_team);
        Some(fixture.with_result_for(side))
    }
}

/// Numbers stored as JSON numbers or numeric strings
fn loose_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn records<'a>(data: &'a Value, keys: &[&str]) -> Vec<&'a Value> {
    keys.iter()
        .filter_map(|key| data[*key].as_array())
        .flatten()
        .collect()
}

impl DocumentExtractor for BackendExtractor {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Backend
    }

    fn extract(
        &self,
        doc: &RawDocument,
        category: DataCategory,
    ) -> Result<CategoryData, ExtractionError> {
        let DocumentBody::Json(json) = &doc.body else {
            return Err(ExtractionError::WrongBody {
                provider: ProviderKind::Backend,
                expected: "json",
            });
        };

        let data = json.get("data").filter(|d| d.is_object()).ok_or_else(|| {
            ExtractionError::MissingStructure {
                provider: ProviderKind::Backend,
                what: "data object".to_string(),
            }
        })?;

        match category {
            DataCategory::Squad => {
                let players = records(data, &["squad"])
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, record)| {
                        let player = self.parse_player(record, i);
                        if player.is_none() {
                            debug!("Skipping malformed backend player record {}", i);
                        }
                        player
                    })
                    .collect();
                Ok(CategoryData::Squad(players))
            }
            DataCategory::Fixtures => {
                let fixtures = records(data, &["pastFixtures", "upcomingFixtures", "fixtures"])
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, record)| {
                        let fixture = self.parse_fixture(record);
                        if fixture.is_none() {
                            debug!("Skipping malformed backend fixture record {}", i);
                        }
                        fixture
                    });
                Ok(CategoryData::Fixtures(FixtureSet::from_fixtures(fixtures)))
            }
            DataCategory::Standings => {
                let row = ["leaguePosition", "standings"]
                    .iter()
                    .map(|key| &data[*key])
                    .find(|v| v.is_object())
                    .ok_or(ExtractionError::Empty(DataCategory::Standings))?;

                serde_json::from_value::<LeaguePosition>(row.clone())
                    .map(CategoryData::Standings)
                    .map_err(|e| ExtractionError::MissingStructure {
                        provider: ProviderKind::Backend,
                        what: format!("valid leaguePosition ({})", e),
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchResult;
    use serde_json::json;

    fn extract(body: Value, category: DataCategory) -> Result<CategoryData, ExtractionError> {
        let doc = RawDocument {
            provider: ProviderKind::Backend,
            source_id: "backend".to_string(),
            team_id: None,
            body: DocumentBody::Json(body),
        };
        BackendExtractor::new(ExtractContext::default()).extract(&doc, category)
    }

    #[test]
    fn test_loose_player_records() {
        let body = json!({
            "success": true,
            "data": {
                "squad": [
                    { "id": 1, "name": "Jokin Ezkieta", "number": "1", "position": "GK",
                      "age": 28, "nationality": "Spain", "photo": "/images/players/ezkieta.jpg" },
                    { "id": 2, "name": "New Signing", "number": "N/A", "position": "Midfielder",
                      "age": "24" },
                    { "id": 3 }
                ],
                "isLive": true
            }
        });

        let CategoryData::Squad(players) = extract(body, DataCategory::Squad).unwrap() else {
            panic!("expected squad");
        };
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].number, Some(1));
        assert_eq!(players[0].position, Position::Goalkeeper);
        assert_eq!(players[1].number, None);
        assert_eq!(players[1].age, 24);
        assert_eq!(players[1].photo, crate::config::DEFAULT_PLAYER_PHOTO);
    }

    #[test]
    fn test_fixtures_recompute_results() {
        let body = json!({
            "data": {
                "pastFixtures": [
                    { "id": 1, "date": "2024-12-08T20:00:00Z", "homeTeam": "Racing de Santander",
                      "awayTeam": "Mirandés", "homeLogo": "", "awayLogo": "", "venue": "El Sardinero",
                      "competition": "Segunda División", "homeScore": 1, "awayScore": 4, "result": "W" },
                    { "id": 2, "homeTeam": "Missing Date" }
                ],
                "upcomingFixtures": [
                    { "id": 3, "date": "2024-12-15T20:00:00Z", "homeTeam": "Racing de Santander",
                      "awayTeam": "Real Oviedo", "homeLogo": "", "awayLogo": "", "venue": "El Sardinero",
                      "competition": "Segunda División" }
                ]
            }
        });

        let CategoryData::Fixtures(set) = extract(body, DataCategory::Fixtures).unwrap() else {
            panic!("expected fixtures");
        };
        assert_eq!(set.past.len(), 1);
        assert_eq!(set.past[0].result, Some(MatchResult::Loss));
        assert_eq!(set.upcoming.len(), 1);
    }

    #[test]
    fn test_standings_record() {
        let body = json!({
            "data": { "leaguePosition": { "position": 5, "points": 71, "played": 42, "won": 20,
                                          "drawn": 11, "lost": 11, "goalDifference": 14 } }
        });
        let CategoryData::Standings(position) = extract(body, DataCategory::Standings).unwrap()
        else {
            panic!("expected standings");
        };
        assert_eq!(position.points, 71);

        let empty = json!({ "data": { "leaguePosition": null } });
        assert!(matches!(
            extract(empty, DataCategory::Standings),
            Err(ExtractionError::Empty(DataCategory::Standings))
        ));
    }

    #[test]
    fn test_missing_data_object() {
        assert!(matches!(
            extract(json!({ "success": true }), DataCategory::Squad),
            Err(ExtractionError::MissingStructure { .. })
        ));
    }
}

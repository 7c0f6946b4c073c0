//! Last-known-good club data served when every live path fails.
//!
//! The data is built once per process and never refreshed or cached.

use crate::club::normalize;
use crate::models::{
    DataCategory, Fixture, FixtureSet, LeaguePosition, MatchResult, Player, Position,
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::OnceLock;

static FALLBACK: OnceLock<FallbackData> = OnceLock::new();

#[derive(Debug, Clone)]
struct FallbackData {
    squad: Vec<Player>,
    fixtures: FixtureSet,
    standings: LeaguePosition,
}

/// Static fallback data for the club
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackProvider;

impl FallbackProvider {
    pub fn new() -> Self {
        Self
    }

    fn data(&self) -> &'static FallbackData {
        FALLBACK.get_or_init(build)
    }

    pub fn squad(&self) -> Vec<Player> {
        self.data().squad.clone()
    }

    pub fn fixtures(&self) -> FixtureSet {
        self.data().fixtures.clone()
    }

    pub fn past_fixtures(&self, limit: usize) -> Vec<Fixture> {
        self.data().fixtures.recent_past(limit)
    }

    pub fn upcoming_fixtures(&self, limit: usize) -> Vec<Fixture> {
        self.data().fixtures.next_upcoming(limit)
    }

    pub fn league_position(&self) -> LeaguePosition {
        self.data().standings.clone()
    }

    pub fn record_count(&self, category: DataCategory) -> usize {
        match category {
            DataCategory::Squad => self.data().squad.len(),
            DataCategory::Fixtures => self.data().fixtures.len(),
            DataCategory::Standings => 1,
        }
    }

    /// Shirt number of a known squad member, matched on normalized name
    pub fn shirt_number(&self, name: &str) -> Option<u16> {
        let wanted = normalize(name);
        self.data()
            .squad
            .iter()
            .find(|p| normalize(&p.name) == wanted)
            .and_then(|p| p.number)
    }
}

fn player(
    id: u64,
    name: &str,
    position: Position,
    age: u32,
    nationality: &str,
    photo: &str,
    number: u16,
) -> Player {
    Player {
        id,
        name: name.to_string(),
        number: Some(number),
        position,
        age,
        nationality: nationality.to_string(),
        photo: format!("/images/players/{}", photo),
        matches: None,
        goals: None,
        assists: None,
    }
}

fn kickoff(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0)
        .single()
        .unwrap_or_default()
}

struct Game<'a> {
    id: u64,
    date: DateTime<Utc>,
    home: (&'a str, &'a str),
    away: (&'a str, &'a str),
    venue: &'a str,
    score: Option<(u16, u16)>,
    result: Option<MatchResult>,
}

fn fixture(game: Game<'_>) -> Fixture {
    Fixture {
        id: game.id,
        date: game.date,
        home_team: game.home.0.to_string(),
        away_team: game.away.0.to_string(),
        home_logo: game.home.1.to_string(),
        away_logo: game.away.1.to_string(),
        venue: game.venue.to_string(),
        competition: "Segunda División".to_string(),
        round: None,
        home_score: game.score.map(|s| s.0),
        away_score: game.score.map(|s| s.1),
        result: game.result,
    }
}

fn build() -> FallbackData {
    use Position::*;

    let squad = vec![
        player(1, "Jokin Ezkieta", Goalkeeper, 28, "Spain", "ezkieta.jpg", 1),
        player(2, "Andrés Martín", Midfielder, 25, "Spain", "martin.jpg", 10),
        player(3, "Iñigo Vicente", Midfielder, 27, "Spain", "vicente.jpg", 11),
        player(4, "Aldasoro", Midfielder, 26, "Spain", "aldasoro.jpg", 8),
        player(5, "Unai Vencedor Paris", Midfielder, 24, "Spain", "vencedor.jpg", 6),
        player(6, "Javier Castro", Defender, 24, "Spain", "castro.jpg", 3),
        player(7, "Pablo Rodríguez", Midfielder, 23, "Spain", "rodriguez.jpg", 7),
        player(8, "Sory Kaba", Forward, 28, "Guinea", "kaba.jpg", 9),
        player(9, "Jorge Pombo", Forward, 30, "Spain", "pombo.jpg", 14),
        player(10, "Álvaro Jiménez", Goalkeeper, 24, "Spain", "jimenez.jpg", 13),
        player(11, "Jorge Sáenz", Defender, 26, "Spain", "saenz.jpg", 5),
        player(12, "Mikel González", Defender, 25, "Spain", "gonzalez.jpg", 4),
    ];

    let racing = ("Racing de Santander", "/images/racingLogo.png");
    let past = vec![
        fixture(Game {
            id: 1,
            date: kickoff(2024, 11, 24, 20),
            home: racing,
            away: ("CD Leganés", "/images/leganes.png"),
            venue: "El Sardinero",
            score: Some((2, 1)),
            result: Some(MatchResult::Win),
        }),
        fixture(Game {
            id: 2,
            date: kickoff(2024, 12, 1, 18),
            home: ("Real Valladolid", "/images/valladolid.png"),
            away: racing,
            venue: "José Zorrilla",
            score: Some((0, 2)),
            result: Some(MatchResult::Win),
        }),
        fixture(Game {
            id: 3,
            date: kickoff(2024, 12, 8, 20),
            home: racing,
            away: ("Mirandés", "/images/mirandes.png"),
            venue: "El Sardinero",
            score: Some((1, 4)),
            result: Some(MatchResult::Loss),
        }),
    ];

    let upcoming = vec![
        fixture(Game {
            id: 4,
            date: kickoff(2024, 12, 15, 20),
            home: racing,
            away: ("Real Oviedo", "/images/oviedo.png"),
            venue: "El Sardinero",
            score: None,
            result: None,
        }),
        fixture(Game {
            id: 5,
            date: kickoff(2024, 12, 22, 18),
            home: ("CD Tenerife", "/images/tenerife.png"),
            away: racing,
            venue: "Heliodoro Rodríguez López",
            score: None,
            result: None,
        }),
        fixture(Game {
            id: 6,
            date: kickoff(2024, 12, 29, 20),
            home: racing,
            away: ("SD Huesca", "/images/huesca.png"),
            venue: "El Sardinero",
            score: None,
            result: None,
        }),
        fixture(Game {
            id: 7,
            date: kickoff(2025, 1, 5, 18),
            home: ("Real Zaragoza", "/images/realZaragoza.png"),
            away: racing,
            venue: "La Romareda",
            score: None,
            result: None,
        }),
        fixture(Game {
            id: 8,
            date: kickoff(2025, 1, 12, 20),
            home: racing,
            away: ("Sporting Gijón", "/images/SportingLogo.png"),
            venue: "El Sardinero",
            score: None,
            result: None,
        }),
    ];

    let standings = LeaguePosition {
        position: 5,
        points: 71,
        played: 42,
        won: 20,
        drawn: 11,
        lost: 11,
        goals_for: None,
        goals_against: None,
        goal_difference: 14,
    };

    FallbackData {
        squad,
        fixtures: FixtureSet { past, upcoming },
        standings,
    }
}

//! FBref squad page extractor
//!
//! Squad rows come from the `stats_standard` table, fixtures from the match
//! log table and standings from the page's text summary ("Record: 20-11-11,
//! 71 points, 5th in Segunda División"). The standings are best-effort
//! text matching, so the result is validated before it is accepted.

use super::{DocumentExtractor, ExtractContext, DEFAULT_PLAYER_AGE};
use crate::config::{ProviderKind, ScrapeProviderConfig};
use crate::error::ExtractionError;
use crate::models::{
    CategoryData, DataCategory, Fixture, FixtureSet, LeaguePosition, Player, Position, Side,
};
use crate::retrieval::{DocumentBody, RawDocument};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

const DEFAULT_NATIONALITY: &str = "Spain";
const HEADSHOT_BASE: &str = "https://fbref.com/req/202302030/images/headshots";
const SUMMARY_ROWS: [&str; 2] = ["Squad Total", "Opponent Total"];
const FIXTURE_TABLE_HINTS: [&str; 4] = ["matchlogs", "results", "fixtures", "scores"];

pub struct FbrefExtractor {
    ctx: ExtractContext,
    scrape: ScrapeProviderConfig,
}

impl FbrefExtractor {
    pub fn new(ctx: ExtractContext, scrape: &ScrapeProviderConfig) -> Self {
        Self {
            ctx,
            scrape: scrape.clone(),
        }
    }

    fn extract_squad(&self, document: &Html) -> Result<Vec<Player>, ExtractionError> {
        let table = find_table(document, |id| id.starts_with("stats_standard"))?
            .or(find_table(document, |id| id.contains("stats"))?)
            .ok_or_else(|| missing("squad stats table"))?;

        let player_link = Regex::new(r"/en/players/([a-f0-9]+)/")
            .map_err(|e| ExtractionError::Pattern(e.to_string()))?;

        let mut players = Vec::new();
        for (row_index, row) in body_rows(table)?.into_iter().enumerate() {
            match self.parse_player_row(row, &player_link, players.len() as u64 + 1) {
                Some(player) => players.push(player),
                None => debug!("Skipping squad row {}", row_index),
            }
        }
        Ok(players)
    }

    fn parse_player_row(&self, row: ElementRef, player_link: &Regex, id: u64) -> Option<Player> {
        let name_cell = cell(row, "player")?;
        let link = name_cell
            .children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "a");

        let name = link
            .map(element_text)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| element_text(name_cell));
        if name.is_empty() || SUMMARY_ROWS.contains(&name.as_str()) {
            return None;
        }

        let photo = link
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| player_link.captures(href))
            .map(|caps| format!("{}/{}_2022.jpg", HEADSHOT_BASE, &caps[1]))
            .unwrap_or_else(|| self.ctx.default_photo.clone());

        let nationality = cell_text(row, "nationality")
            .and_then(|text| text.split_whitespace().last().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_NATIONALITY.to_string());

        Some(Player {
            id,
            number: self.ctx.roster.shirt_number(&name),
            position: Position::from_code(&cell_text(row, "position").unwrap_or_default()),
            age: cell_text(row, "age")
                .and_then(|a| leading_number(&a))
                .unwrap_or(DEFAULT_PLAYER_AGE),
            nationality,
            photo,
            matches: Some(stat_count(row, &["games"])),
            goals: Some(stat_count(row, &["goals"])),
            assists: Some(stat_count(row, &["assists"])),
            name,
        })
    }

    fn extract_fixtures(&self, document: &Html) -> Result<FixtureSet, ExtractionError> {
        let table = find_table(document, |id| id == "matchlogs_for")?
            .or(find_table(document, |id| {
                FIXTURE_TABLE_HINTS.iter().any(|hint| id.contains(hint))
            })?)
            .ok_or_else(|| missing("match log table"))?;

        let squad_link = Regex::new(r"/en/squads/([a-f0-9]+)/")
            .map_err(|e| ExtractionError::Pattern(e.to_string()))?;

        let mut fixtures = Vec::new();
        for (row_index, row) in body_rows(table)?.into_iter().enumerate() {
            match self.parse_fixture_row(row, &squad_link, fixtures.len() as u64 + 1) {
                Some(fixture) => fixtures.push(fixture),
                None => debug!("Skipping match log row {}", row_index),
            }
        }
        Ok(FixtureSet::from_fixtures(fixtures))
    }

    fn parse_fixture_row(&self, row: ElementRef, squad_link: &Regex, id: u64) -> Option<Fixture> {
        let date = NaiveDate::parse_from_str(&cell_text(row, "date")?, "%Y-%m-%d").ok()?;
        let time = cell_text(row, "start_time")
            .and_then(|t| NaiveTime::parse_from_str(t.get(..5)?, "%H:%M").ok())
            .unwrap_or_default();
        let date = Utc.from_utc_datetime(&date.and_time(time));

        let opponent_cell = cell(row, "opponent")?;
        let opponent = element_text(opponent_cell);
        if opponent.is_empty() {
            return None;
        }
        let opponent_logo = opponent_cell
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter_map(|el| el.value().attr("href"))
            .find_map(|href| squad_link.captures(href).map(|caps| caps[1].to_string()))
            .map(|id| self.scrape.logo_url(&id))
            .unwrap_or_else(|| placeholder_logo(&opponent));
        let club_logo = self.scrape.logo_url(&self.scrape.club_stats_id);

        let goals_for = stat_value(row, &["goals_for", "gf"]);
        let goals_against = stat_value(row, &["goals_against", "ga"]);
        let is_home = cell_text(row, "venue")
            .map(|v| v.eq_ignore_ascii_case("home"))
            .unwrap_or(false);

        let club = self.ctx.club.name.clone();
        let (home_team, away_team, home_logo, away_logo, home_score, away_score, side) = if is_home
        {
            (club, opponent, club_logo, opponent_logo, goals_for, goals_against, Side::Home)
        } else {
            (opponent, club, opponent_logo, club_logo, goals_against, goals_for, Side::Away)
        };

        let fixture = Fixture {
            id,
            date,
            home_team,
            away_team,
            home_logo,
            away_logo,
            venue: if is_home {
                self.ctx.club.home_venue.clone()
            } else {
                "Away".to_string()
            },
            competition: cell_text(row, "comp").unwrap_or_else(|| self.ctx.club.league.clone()),
            round: cell_text(row, "round"),
            home_score,
            away_score,
            result: None,
        };
        Some(fixture.with_result_for(Some(side)))
    }

    fn extract_standings(&self, document: &Html) -> Result<LeaguePosition, ExtractionError> {
        let text = document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ");
        parse_standings_text(&text, &self.ctx.club.league)
    }
}

impl DocumentExtractor for FbrefExtractor {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Fbref
    }

    fn extract(
        &self,
        doc: &RawDocument,
        category: DataCategory,
    ) -> Result<CategoryData, ExtractionError> {
        let DocumentBody::Html(html) = &doc.body else {
            return Err(ExtractionError::WrongBody {
                provider: ProviderKind::Fbref,
                expected: "html",
            });
        };

        let document = Html::parse_document(html);
        match category {
            DataCategory::Squad => self.extract_squad(&document).map(CategoryData::Squad),
            DataCategory::Fixtures => self.extract_fixtures(&document).map(CategoryData::Fixtures),
            DataCategory::Standings => {
                let result = self.extract_standings(&document);
                if let Err(e) = &result {
                    warn!("FBref standings summary not found: {}", e);
                }
                result.map(CategoryData::Standings)
            }
        }
    }
}

/// Pull the club's table position out of free page text.
///
/// Position, record and points are required; the goal difference comes from
/// the "Diff" figure or, failing that, from goals for and against.
pub fn parse_standings_text(text: &str, league: &str) -> Result<LeaguePosition, ExtractionError> {
    let pattern = |p: &str| Regex::new(p).map_err(|e| ExtractionError::Pattern(e.to_string()));

    let league_words = league
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let position_re = pattern(&format!(r"(\d+)(?:st|nd|rd|th)\s+in\s+{}", league_words))?;
    let points_re = pattern(r"(\d+)\s+points?\b")?;
    let labelled_record_re = pattern(r"Record:\s*(\d{1,3})-(\d{1,3})-(\d{1,3})")?;
    let record_re = pattern(r"\b(\d{1,2})-(\d{1,2})-(\d{1,2})\b")?;
    let diff_re = pattern(r"Diff(?:erential)?:\s*([+-]?\d+)")?;
    let goals_re = pattern(r"Goals:\s*(\d+)")?;
    let against_re = pattern(r"Goals Against:\s*(\d+)")?;

    let capture_u32 = |re: &Regex, group: usize| -> Option<u32> {
        re.captures(text)
            .and_then(|caps| caps.get(group).and_then(|m| m.as_str().parse().ok()))
    };

    let position = capture_u32(&position_re, 1).ok_or_else(|| missing("league position"))?;
    let points = capture_u32(&points_re, 1).ok_or_else(|| missing("points total"))?;

    let record = labelled_record_re
        .captures(text)
        .or_else(|| record_re.captures(text))
        .ok_or_else(|| missing("win-draw-loss record"))?;
    let figure = |i: usize| record[i].parse::<u32>().map_err(|_| missing("win-draw-loss record"));
    let (won, drawn, lost) = (figure(1)?, figure(2)?, figure(3)?);

    let goals_for = capture_u32(&goals_re, 1);
    let goals_against = capture_u32(&against_re, 1);
    let goal_difference = diff_re
        .captures(text)
        .and_then(|caps| caps[1].parse::<i32>().ok())
        .or_else(|| match (goals_for, goals_against) {
            (Some(f), Some(a)) => i32::try_from(i64::from(f) - i64::from(a)).ok(),
            _ => None,
        })
        .ok_or_else(|| missing("goal difference"))?;

    let played = won
        .checked_add(drawn)
        .and_then(|sum| sum.checked_add(lost))
        .ok_or_else(|| missing("win-draw-loss record"))?;

    Ok(LeaguePosition {
        position,
        points,
        played,
        won,
        drawn,
        lost,
        goals_for,
        goals_against,
        goal_difference,
    })
}

fn missing(what: &str) -> ExtractionError {
    ExtractionError::MissingStructure {
        provider: ProviderKind::Fbref,
        what: what.to_string(),
    }
}

fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::Pattern(format!("{}: {:?}", css, e)))
}

/// First table whose id satisfies `accept`
fn find_table<'a>(
    document: &'a Html,
    accept: impl Fn(&str) -> bool,
) -> Result<Option<ElementRef<'a>>, ExtractionError> {
    let tables = selector("table[id]")?;
    Ok(document
        .select(&tables)
        .find(|table| table.value().attr("id").map(&accept).unwrap_or(false)))
}

/// Data rows, without repeated header and spacer rows
fn body_rows(table: ElementRef<'_>) -> Result<Vec<ElementRef<'_>>, ExtractionError> {
    let rows = selector("tbody tr")?;
    Ok(table
        .select(&rows)
        .filter(|row| {
            !row.value()
                .classes()
                .any(|c| c == "thead" || c == "spacer" || c == "over_header")
        })
        .collect())
}

fn cell<'a>(row: ElementRef<'a>, stat: &str) -> Option<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().attr("data-stat") == Some(stat))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn cell_text(row: ElementRef<'_>, stat: &str) -> Option<String> {
    cell(row, stat)
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// First of `stats` present and numeric
fn stat_value(row: ElementRef<'_>, stats: &[&str]) -> Option<u16> {
    stats
        .iter()
        .filter_map(|stat| cell_text(row, stat))
        .find_map(|text| text.replace(',', "").parse().ok())
}

fn stat_count(row: ElementRef<'_>, stats: &[&str]) -> u32 {
    stat_value(row, stats).map(u32::from).unwrap_or(0)
}

/// "27-101" (years-days) -> 27
fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn placeholder_logo(team: &str) -> String {
    let slug: String = team
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    format!("/images/{}.png", slug)
}

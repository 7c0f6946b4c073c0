//! Identity of the tracked club.
//!
//! Providers spell the club differently ("Racing de Santander", "Racing
//! Santander", "Real Racing Club"), so home/away detection goes through
//! normalized alias matching instead of string equality.

use crate::models::Side;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubIdentity {
    /// Display name used when a source only reports "Home"/"Away"
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub home_venue: String,
    pub logo: String,
    /// League name as printed on the stats site, e.g. "Segunda División"
    pub league: String,
}

impl ClubIdentity {
    pub fn racing_santander() -> Self {
        Self {
            name: "Racing de Santander".to_string(),
            aliases: vec![
                "Racing Santander".to_string(),
                "Real Racing Club".to_string(),
                "Santander".to_string(),
            ],
            home_venue: "El Sardinero".to_string(),
            logo: "/images/racingLogo.png".to_string(),
            league: "Segunda División".to_string(),
        }
    }

    /// Case-insensitive whole-word match against the name and aliases
    pub fn matches(&self, team_name: &str) -> bool {
        let team = normalize(team_name);
        if team.is_empty() {
            return false;
        }

        std::iter::once(&self.name)
            .chain(self.aliases.iter())
            .map(|alias| normalize(alias))
            .any(|alias| contains_phrase(&team, &alias))
    }

    /// Which side the club played on; `None` when neither or both match
    pub fn side_of(&self, home_team: &str, away_team: &str) -> Option<Side> {
        match (self.matches(home_team), self.matches(away_team)) {
            (true, false) => Some(Side::Home),
            (false, true) => Some(Side::Away),
            _ => None,
        }
    }
}

impl Default for ClubIdentity {
    fn default() -> Self {
        Self::racing_santander()
    }
}

/// Lowercase, drop punctuation, collapse whitespace
pub(crate) fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check if text contains phrase as whole words (not substring of another word)
fn contains_phrase(text: &str, phrase: &str) -> bool {
    let text_words: Vec<&str> = text.split_whitespace().collect();
    let phrase_words: Vec<&str> = phrase.split_whitespace().collect();

    if phrase_words.is_empty() || phrase_words.len() > text_words.len() {
        return false;
    }

    text_words
        .windows(phrase_words.len())
        .any(|window| window == phrase_words.as_slice())
}

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::collection::Collection;

const JOB_VIEW_BASE_URL: &str = "https://www.linkedin.com/jobs/view/";

static MATCH_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)matches?\s+(\d+)\s+of\s+(?:the\s+)?(\d+)\s+required")
        .expect("match count pattern is valid")
});

const SUMMARY_PHRASES: [&str; 3] = ["top applicant", "strong match", "good match"];
const MATCHED_BULLETS: [char; 2] = ['✓', '✔'];
const MISSING_BULLET: char = '?';

/// One job listing as extracted from a collection walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub url: String,
    pub collection: Collection,
    pub title: Option<String>,
    pub employer: Option<String>,
    pub employer_url: Option<String>,
    pub location: Option<String>,
    pub posted_time: Option<String>,
    pub employment_type: Option<String>,
    pub workplace_type: Option<String>,
    pub is_promoted: bool,
    pub supports_expedited_apply: bool,
    pub is_actively_hiring: bool,
    pub description: Option<String>,
    pub hiring_team: Option<Vec<HiringTeamMember>>,
    pub match_analysis: Option<MatchAnalysis>,
}

/// Fields only available from a record's detail view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobDetails {
    pub description: Option<String>,
    pub hiring_team: Option<Vec<HiringTeamMember>>,
    pub match_analysis: Option<MatchAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiringTeamMember {
    pub name: String,
    pub profile_url: Option<String>,
    pub title: Option<String>,
    pub connection_degree: Option<String>,
    pub is_job_poster: bool,
    pub mutual_connections: Option<String>,
}

/// Premium "how you match" panel, parsed best-effort from its rendered text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchAnalysis {
    pub raw_text: Option<String>,
    pub summary: Option<String>,
    pub matched_qualifications: Vec<String>,
    pub missing_qualifications: Vec<String>,
    pub total_matched: Option<u32>,
    pub total_required: Option<u32>,
}

impl JobRecord {
    /// A bare record carrying only identity; every optional field is absent.
    pub fn new(id: impl Into<String>, collection: Collection) -> Self {
        let id = id.into();
        JobRecord {
            url: Self::url_for(&id),
            id,
            collection,
            title: None,
            employer: None,
            employer_url: None,
            location: None,
            posted_time: None,
            employment_type: None,
            workplace_type: None,
            is_promoted: false,
            supports_expedited_apply: false,
            is_actively_hiring: false,
            description: None,
            hiring_team: None,
            match_analysis: None,
        }
    }

    /// Canonical detail-view address for a job id.
    pub fn url_for(id: &str) -> String {
        format!("{JOB_VIEW_BASE_URL}{id}/")
    }

    pub fn apply_details(&mut self, details: JobDetails) {
        self.description = details.description;
        self.hiring_team = details.hiring_team;
        self.match_analysis = details.match_analysis;
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Unknown Title")
    }

    pub fn display_employer(&self) -> &str {
        self.employer.as_deref().unwrap_or("Unknown Company")
    }
}

impl MatchAnalysis {
    /// Parse the captured panel text. Returns `None` for blank input.
    pub fn parse(text: &str) -> Option<MatchAnalysis> {
        let raw = text.trim();
        if raw.is_empty() {
            return None;
        }

        let lines: Vec<&str> = raw.lines().map(str::trim).collect();
        let mut analysis = MatchAnalysis {
            raw_text: Some(raw.to_string()),
            summary: summary_line(&lines).map(String::from),
            ..Default::default()
        };

        if let Some(caps) = MATCH_COUNT.captures(raw) {
            analysis.total_matched = caps[1].parse().ok();
            analysis.total_required = caps[2].parse().ok();
        }

        for line in &lines {
            if let Some(rest) = line.strip_prefix(MATCHED_BULLETS) {
                push_qualification(&mut analysis.matched_qualifications, rest);
            } else if let Some(rest) = line.strip_prefix(MISSING_BULLET) {
                push_qualification(&mut analysis.missing_qualifications, rest);
            }
        }

        Some(analysis)
    }
}

fn summary_line<'a>(lines: &[&'a str]) -> Option<&'a str> {
    let qualifying = lines
        .iter()
        .find(|line| {
            let lower = line.to_lowercase();
            SUMMARY_PHRASES.iter().any(|phrase| lower.contains(phrase))
        })
        .copied();
    if let Some(line) = qualifying {
        return Some(line);
    }

    lines
        .iter()
        .find(|line| {
            !line.is_empty()
                && !line.starts_with(MATCHED_BULLETS)
                && !line.starts_with(MISSING_BULLET)
                && !line.to_lowercase().contains("qualification")
        })
        .copied()
}

fn push_qualification(target: &mut Vec<String>, rest: &str) {
    let qualification = rest.trim();
    if !qualification.is_empty() {
        target.push(qualification.to_string());
    }
}

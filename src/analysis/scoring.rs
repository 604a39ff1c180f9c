use chrono::{DateTime, Utc};

use crate::models::{CommitSummary, ContributorSummary, HealthScore, RepositorySnapshot};

/// Everything the health score is computed from. No I/O happens past this
/// point.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub repo: &'a RepositorySnapshot,
    pub commits: &'a [CommitSummary],
    pub contributors: &'a [ContributorSummary],
    pub has_readme: bool,
    pub open_issues: u32,
    pub closed_issues: u32,
}

/// Sub-score weights in whole percent; they must add up to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWeights {
    pub code_quality: u32,
    pub documentation: u32,
    pub activity: u32,
    pub community: u32,
    pub maintenance: u32,
}

impl ScoreWeights {
    pub const STANDARD: ScoreWeights = ScoreWeights {
        code_quality: 25,
        documentation: 20,
        activity: 25,
        community: 15,
        maintenance: 15,
    };

    pub fn total(&self) -> u32 {
        self.code_quality + self.documentation + self.activity + self.community + self.maintenance
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::STANDARD
    }
}

pub struct HealthScorer {
    weights: ScoreWeights,
}

impl HealthScorer {
    pub fn new() -> Self {
        Self {
            weights: ScoreWeights::STANDARD,
        }
    }

    pub fn score(&self, input: &ScoreInput<'_>, now: DateTime<Utc>) -> HealthScore {
        let repo = input.repo;
        let contributor_count = input.contributors.len();

        let code_quality = clamp_score(code_quality(input.commits.len(), contributor_count));
        let documentation = clamp_score(documentation(
            input.has_readme,
            repo.has_license(),
            repo.has_description(),
            !repo.topics.is_empty(),
        ));
        let activity = clamp_score(activity(days_since(repo.pushed_at, now)));
        let community = clamp_score(community(
            repo.stargazers_count,
            repo.forks_count,
            contributor_count,
        ));
        let maintenance = clamp_score(maintenance(input.open_issues, input.closed_issues));

        HealthScore {
            overall: self.overall(code_quality, documentation, activity, community, maintenance),
            code_quality,
            documentation,
            activity,
            community,
            maintenance,
        }
    }

    /// Weighted combination of already-rounded sub-scores.
    pub fn overall(
        &self,
        code_quality: u8,
        documentation: u8,
        activity: u8,
        community: u8,
        maintenance: u8,
    ) -> u8 {
        let w = &self.weights;
        let weighted = code_quality as u32 * w.code_quality
            + documentation as u32 * w.documentation
            + activity as u32 * w.activity
            + community as u32 * w.community
            + maintenance as u32 * w.maintenance;
        clamp_score(weighted as f64 / w.total().max(1) as f64)
    }
}

impl Default for HealthScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Rounds into [0, 100]; NaN becomes 0.
pub fn clamp_score(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0).round() as u8
}

/// Fractional days between the last push and `now`. A repository that was
/// never pushed to counts as infinitely stale.
pub fn days_since(pushed_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match pushed_at {
        Some(pushed) => (now - pushed).num_milliseconds() as f64 / 86_400_000.0,
        None => f64::INFINITY,
    }
}

pub fn documentation(has_readme: bool, has_license: bool, has_description: bool, has_topics: bool) -> f64 {
    let mut score = 0.0;
    if has_readme {
        score += 40.0;
    }
    if has_license {
        score += 30.0;
    }
    if has_description {
        score += 20.0;
    }
    if has_topics {
        score += 10.0;
    }
    score
}

pub fn activity(days_since_push: f64) -> f64 {
    match days_since_push {
        d if d < 7.0 => 100.0,
        d if d < 30.0 => 80.0,
        d if d < 90.0 => 60.0,
        d if d < 180.0 => 40.0,
        d if d < 365.0 => 20.0,
        _ => 10.0,
    }
}

pub fn community(stars: u32, forks: u32, contributors: usize) -> f64 {
    let stars_score = (stars as f64 / 100.0 * 30.0).min(30.0);
    let forks_score = (forks as f64 / 50.0 * 30.0).min(30.0);
    let contributors_score = (contributors as f64 / 10.0 * 40.0).min(40.0);
    stars_score + forks_score + contributors_score
}

/// Share of issues that got closed, with +1 in the denominator so a
/// repository without issues scores 0 instead of dividing by zero.
pub fn maintenance(open_issues: u32, closed_issues: u32) -> f64 {
    let total = open_issues as f64 + closed_issues as f64 + 1.0;
    (closed_issues as f64 / total * 100.0).min(100.0)
}

pub fn code_quality(commit_count: usize, contributor_count: usize) -> f64 {
    let commit_bonus = match commit_count {
        n if n > 50 => 30.0,
        n if n > 20 => 20.0,
        n if n > 10 => 10.0,
        _ => 0.0,
    };
    let contributor_bonus = match contributor_count {
        n if n > 5 => 20.0,
        n if n > 2 => 10.0,
        _ => 0.0,
    };
    50.0 + commit_bonus + contributor_bonus
}

//! Job-list search, filtering, and pagination.
//!
//! Operates on the job list already held by the session context; nothing
//! here performs network calls.

#[cfg(test)]
#[path = "listing_test.rs"]
mod listing_test;

use crate::net::types::Job;

pub const DEFAULT_PER_PAGE: usize = 10;

/// Criteria applied to the held job list.
///
/// `search` matches case-insensitively against title, company name, and
/// location. `job_type` and `location` are exact (case-insensitive) filters.
/// Pages are 1-based; page 0 is treated as page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    pub search: Option<String>,
    pub job_type: Option<String>,
    pub location: Option<String>,
    pub page: usize,
    pub per_page: usize,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self { search: None, job_type: None, location: None, page: 1, per_page: DEFAULT_PER_PAGE }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub page: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl JobQuery {
    #[must_use]
    pub fn matches(&self, job: &Job) -> bool {
        if let Some(needle) = normalized(self.search.as_deref()) {
            let hit = [Some(job.title.as_str()), job.company_name(), job.location.as_deref()]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        exact(self.job_type.as_deref(), job.job_type.as_deref())
            && exact(self.location.as_deref(), job.location.as_deref())
    }

    /// Filter `jobs` and cut out the requested page.
    ///
    /// A page past the end yields an empty slice with the real totals.
    #[must_use]
    pub fn apply(&self, jobs: &[Job]) -> JobPage {
        let matched: Vec<&Job> = jobs.iter().filter(|job| self.matches(job)).collect();
        let per_page = self.per_page.max(1);
        let page = self.page.max(1);
        let total = matched.len();
        let total_pages = total.div_ceil(per_page);

        let jobs = matched
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .cloned()
            .collect();

        JobPage { jobs, page, total, total_pages }
    }
}

fn normalized(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase)
}

fn exact(filter: Option<&str>, value: Option<&str>) -> bool {
    match normalized(filter) {
        None => true,
        Some(wanted) => value.is_some_and(|v| v.trim().to_lowercase() == wanted),
    }
}

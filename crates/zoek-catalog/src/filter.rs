use std::collections::HashSet;
use std::path::Path;

use zoek_core::error::ZoekError;
use zoek_core::models::record::RepositoryRecord;

/// How many records each exclusion rule removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub blacklisted: usize,
    pub disabled: usize,
    pub too_big: usize,
}

impl FilterReport {
    pub fn total(&self) -> usize {
        self.blacklisted + self.disabled + self.too_big
    }
}

/// Build the working set: drop blacklisted, disabled and (with `max_size`)
/// oversized records. Unknown sizes pass; relative order is kept.
pub fn filter(
    records: Vec<RepositoryRecord>,
    blacklist: &HashSet<String>,
    max_size: Option<u64>,
) -> Vec<RepositoryRecord> {
    filter_with_report(records, blacklist, max_size).0
}

/// Like [`filter`], also counting and logging every exclusion.
pub fn filter_with_report(
    records: Vec<RepositoryRecord>,
    blacklist: &HashSet<String>,
    max_size: Option<u64>,
) -> (Vec<RepositoryRecord>, FilterReport) {
    let mut report = FilterReport::default();
    let kept = records
        .into_iter()
        .filter(|record| {
            if blacklist.contains(&record.name) {
                tracing::warn!("skipping repo {}, blacklisted", record.name);
                report.blacklisted += 1;
                false
            } else if record.is_disabled {
                tracing::warn!("skipping repo {}, disabled", record.name);
                report.disabled += 1;
                false
            } else if record.exceeds(max_size) {
                tracing::warn!(
                    "skipping repo {}, too big ({})",
                    record.name,
                    record.disk_usage.unwrap_or_default()
                );
                report.too_big += 1;
                false
            } else {
                true
            }
        })
        .collect();
    (kept, report)
}

/// Read a blacklist file: one repository name per line, `#` starts a comment.
pub fn load_blacklist(path: &Path) -> Result<HashSet<String>, ZoekError> {
    let content = std::fs::read_to_string(path).map_err(|e| ZoekError::Config {
        message: format!("cannot read blacklist {}: {e}", path.display()),
    })?;
    Ok(parse_blacklist(&content))
}

fn parse_blacklist(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

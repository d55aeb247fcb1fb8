//! Locating the diff summaries the host page embeds as JSON.
//!
//! The review page ships one or more `application/json` script bodies. The
//! one carrying `payload.pullRequestsChangesRoute.diffSummaries` describes every
//! changed file. Scripts that do not parse, or parse without that route, are
//! skipped; finding nothing is a normal outcome.

use serde::Deserialize;
use tracing::debug;

/// One file entry as the host page describes it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub path: String,
    #[serde(default)]
    pub path_digest: Option<String>,
    #[serde(default)]
    pub lines_added: Option<u64>,
    #[serde(default)]
    pub lines_deleted: Option<u64>,
    #[serde(default)]
    pub lines_changed: Option<u64>,
    /// `null` and a missing flag both read as not viewed.
    #[serde(default)]
    pub marked_as_viewed: Option<bool>,
}

#[derive(Deserialize)]
struct EmbeddedPage {
    payload: Option<Payload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    pull_requests_changes_route: Option<ChangesRoute>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangesRoute {
    diff_summaries: Option<Vec<SourceRecord>>,
}

/// Decode a single script body, if it carries diff summaries.
pub fn parse_script(body: &str) -> Option<Vec<SourceRecord>> {
    let page: EmbeddedPage = match serde_json::from_str(body) {
        Ok(page) => page,
        Err(e) => {
            debug!(error = %e, "skipping unparsable embedded script");
            return None;
        }
    };

    page.payload?.pull_requests_changes_route?.diff_summaries
}

/// Find the first script carrying diff summaries.
pub fn find_diff_summaries<I, S>(scripts: I) -> Option<Vec<SourceRecord>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let found = scripts
        .into_iter()
        .find_map(|script| parse_script(script.as_ref()));
    if found.is_none() {
        debug!("no embedded diff summaries on page");
    }
    found
}

/// Split a saved page dump into script bodies.
///
/// A dump is either a JSON array of script bodies (strings) or a single
/// script body.
pub fn scripts_from_dump(dump: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(dump) {
        Ok(scripts) => scripts,
        Err(_) => vec![dump.to_string()],
    }
}

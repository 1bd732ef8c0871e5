use log::warn;
use url::Url;

use super::core::CircleCiClient;
use crate::providers::circleci::types::LogEntry;

impl CircleCiClient {
    /// Fetch the log text behind an action's `output_url`.
    ///
    /// Never fails: any transport error, bad status or invalid URL yields an
    /// empty string. Retrying is left to the next poll.
    pub async fn fetch_log(&self, output_url: &str) -> String {
        let url = match Url::parse(output_url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Ignoring invalid log URL '{output_url}': {e}");
                return String::new();
            }
        };

        match self.get_text(url).await {
            Ok(body) => decode_log_body(&body),
            Err(e) => {
                warn!("Failed to fetch log output: {e}");
                String::new()
            }
        }
    }
}

/// CircleCI serves action output as a JSON array of `{message, time, type}`
/// entries. Anything else is treated as plain text.
pub(crate) fn decode_log_body(body: &str) -> String {
    if !body.trim_start().starts_with('[') {
        return body.to_string();
    }

    match serde_json::from_str::<Vec<LogEntry>>(body) {
        Ok(entries) => entries.into_iter().map(|entry| entry.message).collect(),
        Err(_) => body.to_string(),
    }
}

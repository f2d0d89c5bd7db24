use std::env;

use log::{info, warn};

use crate::columns::FixedLayout;

/// Runtime configuration, loaded once from the environment at startup
///
/// Credentials are optional on purpose: a missing or malformed value is
/// logged and the server keeps serving, with requests failing at the
/// backing-store call instead of the process refusing to start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base64-encoded service account JSON, as deployed.
    pub google_credentials: Option<String>,

    /// Identifier of the backing spreadsheet.
    pub google_sheet_id: Option<String>,

    /// Worksheet tab holding the roster.
    pub sheet_tab: String,

    /// Fixed column layout when the sheet carries no header row.
    pub fixed_layout: Option<FixedLayout>,

    pub bind_addr: String,
    pub port: u16,
}

impl Config {
    pub fn load() -> Self {
        let google_credentials = optional("GOOGLE_CREDENTIALS");
        let google_sheet_id = optional("GOOGLE_SHEET_ID");

        if google_credentials.is_none() {
            warn!("GOOGLE_CREDENTIALS not set; sheet access will fail until configured");
        }
        if google_sheet_id.is_none() {
            warn!("GOOGLE_SHEET_ID not set; sheet access will fail until configured");
        }

        let no_header = matches!(
            env::var("SHEET_NO_HEADER").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes")
        );
        let fixed_layout = if no_header {
            info!("SHEET_NO_HEADER set; using fixed canonical column layout");
            Some(FixedLayout::canonical())
        } else {
            None
        };

        Self {
            google_credentials,
            google_sheet_id,
            sheet_tab: with_default("SHEET_TAB", "Sheet1"),
            fixed_layout,
            bind_addr: with_default("BIND_ADDR", "0.0.0.0"),
            port: with_default("PORT", "5000").parse().unwrap_or_else(|e| {
                warn!("Invalid PORT value ({}); using 5000", e);
                5000
            }),
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn with_default(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => {
            info!("{} not set, using default: {}", key, default);
            default.to_string()
        }
    }
}

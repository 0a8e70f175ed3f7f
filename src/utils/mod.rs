/// Default manifest file name
pub const MANIFEST_FILE: &str = "updown.json";

/// Default state file name
pub const STATE_FILE: &str = ".updown-state.json";

/// Get current timestamp in ISO 8601 format
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

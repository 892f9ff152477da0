//! Central Configuration Constants
//!
//! Single source of truth for simulation and analysis defaults.
//! To change the default model or endpoint, only edit this file.

use std::ops::RangeInclusive;

/// Default Gemini API base URL
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini model used for the vulnerability report
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Default HTTP timeout for the analysis request (seconds)
pub const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 30;

/// Largest accepted multiplier for scripted delays
pub const MAX_DELAY_SCALE: f64 = 100.0;

/// Withdrawal amount range picked at the amount-selection stage (dollars)
pub const AMOUNT_RANGE: RangeInclusive<u32> = 100..=500;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Skim Simulator";

// ============================================
// Analysis prompt material
// ============================================

/// System instruction sent with every analysis request
pub const ANALYST_PERSONA: &str = "You are a cybersecurity researcher specializing in payment card \
security and NFC/EMV contactless attacks. You review logs from a controlled skimming attack \
simulation and produce a concise vulnerability report. Score the demonstrated exposure from 0 \
(no risk) to 100 (critical), classify the threat, list concrete mitigations in priority order, \
and summarize the attack chain in plain language.";

/// Prompt header placed before the serialized log transcript
pub const ANALYSIS_PROMPT_HEADER: &str =
    "Analyze the following NFC skimming simulation log and return the vulnerability report:";

// ============================================
// Fallback report
// ============================================

pub const FALLBACK_THREAT_TYPE: &str = "Analysis Failed";

pub const FALLBACK_RECOMMENDATIONS: [&str; 2] = [
    "Check API key configuration",
    "Retry the analysis",
];

pub const FALLBACK_SUMMARY: &str = "Unable to generate vulnerability report. The analysis service \
returned an error or an unreadable response.";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get Gemini API key from environment (no default)
pub fn get_api_key() -> Option<String> {
    std::env::var("GEMINI_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
}

/// Get Gemini model from environment or use default
pub fn get_model() -> String {
    std::env::var("GEMINI_MODEL")
        .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string())
}

/// Get Gemini base URL from environment or use default
pub fn get_base_url() -> String {
    std::env::var("GEMINI_BASE_URL")
        .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string())
}

/// Get analysis timeout from environment or use default
pub fn get_analysis_timeout() -> u64 {
    std::env::var("ANALYSIS_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_ANALYSIS_TIMEOUT_SECS)
}

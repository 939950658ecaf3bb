//! Bot-aware transport mode selection.

use edge_core::{header_lookup, BotConfig, Headers, QueryParams, RenderRequest, TransportMode};

/// User-agent substrings of crawlers and link unfurlers.
pub const BOT_USER_AGENTS: &[&str] = &[
    "slurp",
    "facebookexternalhit",
    "embedly",
    "quora link preview",
    "outbrain",
    "pinterest",
    "vkshare",
    "w3c_validator",
    "whatsapp",
    "flipboard",
    "tumblr",
    "skypeuripreview",
    "nuzzel",
    "qwantify",
    "chrome-lighthouse",
    "headlesschrome",
    "prerender",
];

/// Generic crawler words. They count only at the end of a product token,
/// so `Googlebot/2.1` matches and a device name like `CUBOT_X30` does not.
pub const BOT_TOKEN_SUFFIXES: &[&str] = &["bot", "crawler", "spider"];

/// Why a mode was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyReason {
    /// The override query flag decided.
    Override,
    /// The user agent matched a bot pattern.
    UserAgent(String),
    /// No signal; streaming.
    Default,
}

/// Decides whether a request is streamed or buffered.
///
/// Pure and deterministic: the same signals always give the same mode.
/// The override flag wins over the user agent; anything unrecognized
/// streams.
#[derive(Debug, Clone)]
pub struct BotPolicyClassifier {
    query_param: String,
    detect_user_agent: bool,
    patterns: Vec<String>,
}

impl BotPolicyClassifier {
    /// Create a classifier from config.
    pub fn new(config: &BotConfig) -> Self {
        let mut patterns: Vec<String> = BOT_USER_AGENTS.iter().map(|p| p.to_string()).collect();
        patterns.extend(config.extra_user_agents.iter().map(|p| p.to_lowercase()));
        Self {
            query_param: config.query_param.clone(),
            detect_user_agent: config.enabled,
            patterns,
        }
    }

    /// Classify a request.
    pub fn classify(&self, request: &RenderRequest) -> TransportMode {
        self.classify_signals(&request.query, &request.headers)
    }

    /// Classify from raw query and headers.
    pub fn classify_signals(&self, query: &QueryParams, headers: &Headers) -> TransportMode {
        self.explain(query, headers).0
    }

    /// Classify and report which signal decided.
    pub fn explain(&self, query: &QueryParams, headers: &Headers) -> (TransportMode, ClassifyReason) {
        if let Some(value) = query.get(&self.query_param) {
            let mode = if flag_is_set(value) {
                TransportMode::Buffer
            } else {
                TransportMode::Stream
            };
            return (mode, ClassifyReason::Override);
        }

        if self.detect_user_agent {
            if let Some(pattern) = header_lookup(headers, "user-agent")
                .and_then(|ua| self.matching_pattern(ua))
            {
                return (TransportMode::Buffer, ClassifyReason::UserAgent(pattern.to_string()));
            }
        }

        (TransportMode::Stream, ClassifyReason::Default)
    }

    /// Whether a user agent looks like a bot.
    pub fn is_bot_user_agent(&self, user_agent: &str) -> bool {
        self.matching_pattern(user_agent).is_some()
    }

    fn matching_pattern(&self, user_agent: &str) -> Option<&str> {
        let ua_lower = user_agent.to_lowercase();
        self.patterns
            .iter()
            .find(|p| ua_lower.contains(p.as_str()))
            .map(|p| p.as_str())
            .or_else(|| bot_token_suffix(&ua_lower))
    }

    /// Name of the override query flag.
    pub fn query_param(&self) -> &str {
        &self.query_param
    }
}

impl Default for BotPolicyClassifier {
    fn default() -> Self {
        Self::new(&BotConfig::default())
    }
}

fn bot_token_suffix(ua_lower: &str) -> Option<&'static str> {
    BOT_TOKEN_SUFFIXES.iter().copied().find(|suffix| {
        ua_lower.match_indices(suffix).any(|(at, _)| {
            let next = ua_lower[at + suffix.len()..].chars().next();
            matches!(next, None | Some('/' | '-' | ';' | ')' | '.' | '+' | ','))
        })
    })
}

/// A present flag counts as set unless it is explicitly `0` or `false`.
fn flag_is_set(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false")
}

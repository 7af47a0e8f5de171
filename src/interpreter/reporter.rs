use serde::Serialize;

use crate::analytics::AnalyticsSnapshot;

const BULLET: &str = "• ";

pub const SUGGESTIONS: &[&str] = &[
    "sold 2 rice for $4 each",
    "paid 20 for transport",
    "bought 10 bags of beans",
    "profit this month",
    "top selling products this month",
    "email client@example.com subject: Order message: Your order is ready",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub ok: bool,
    pub reply: String,
    pub results: Vec<String>,
    pub analytics: Option<AnalyticsSnapshot>,
    pub suggestions: Vec<String>,
}

/// Collects one bullet line per processed command.
#[derive(Debug, Default)]
pub struct Reporter {
    lines: Vec<String>,
    analytics: Option<AnalyticsSnapshot>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl AsRef<str>) {
        self.lines.push(format!("{BULLET}{}", line.as_ref()));
    }

    /// Later snapshots replace earlier ones.
    pub fn set_analytics(&mut self, snapshot: AnalyticsSnapshot) {
        self.analytics = Some(snapshot);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn finish(self) -> ChatResponse {
        ChatResponse {
            ok: true,
            reply: self.lines.join("\n"),
            results: self.lines,
            analytics: self.analytics,
            suggestions: SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

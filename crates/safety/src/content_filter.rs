//! Substring and topic-regex filtering for model inputs and outputs.
//!
//! Rules are checked in declaration order, patterns before topics, and the
//! first match wins. Topic regexes are compiled once at construction; a bad
//! regex is a configuration error, never a silent skip.

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use scriptwarden_core::{Direction, SafetyError};

#[derive(Debug)]
struct TopicRule {
    source: String,
    regex: Regex,
}

#[derive(Debug)]
pub struct ContentFilter {
    patterns: Vec<String>,
    topics: Vec<TopicRule>,
    case_sensitive: bool,
}

/// Result of a full scan, including a redacted copy of the text.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub is_clean: bool,
    pub matched_rules: Vec<String>,
    pub sanitized: String,
}

impl ContentFilter {
    pub fn new(
        blocked_patterns: &[String],
        blocked_topics: &[String],
        case_sensitive: bool,
    ) -> Result<Self, SafetyError> {
        let mut topics = Vec::with_capacity(blocked_topics.len());
        for source in blocked_topics {
            let regex = RegexBuilder::new(source)
                .case_insensitive(!case_sensitive)
                .build()
                .map_err(|e| {
                    SafetyError::ConfigError(format!("invalid blocked topic /{source}/: {e}"))
                })?;
            topics.push(TopicRule {
                source: source.clone(),
                regex,
            });
        }
        Ok(Self {
            patterns: blocked_patterns.to_vec(),
            topics,
            case_sensitive,
        })
    }

    pub fn rule_count(&self) -> usize {
        self.patterns.len() + self.topics.len()
    }

    fn matched_pattern(&self, text: &str) -> Option<&str> {
        if self.case_sensitive {
            self.patterns
                .iter()
                .find(|p| text.contains(p.as_str()))
                .map(String::as_str)
        } else {
            let folded = text.to_lowercase();
            self.patterns
                .iter()
                .find(|p| folded.contains(&p.to_lowercase()))
                .map(String::as_str)
        }
    }

    /// First-match scan: patterns in declaration order, then topics.
    pub fn check_content(&self, text: &str, direction: Direction) -> Result<(), SafetyError> {
        if let Some(pattern) = self.matched_pattern(text) {
            return Err(SafetyError::ContentBlocked {
                direction,
                rule: format!("pattern `{pattern}`"),
            });
        }
        if let Some(topic) = self.topics.iter().find(|t| t.regex.is_match(text)) {
            return Err(SafetyError::ContentBlocked {
                direction,
                rule: format!("topic /{}/", topic.source),
            });
        }
        Ok(())
    }

    pub fn is_blocked(&self, text: &str) -> bool {
        self.check_content(text, Direction::Input).is_err()
    }

    /// Exhaustive scan that redacts every line matching any rule. Unlike
    /// `check_content`, this does not stop at the first hit.
    pub fn sanitize(&self, text: &str) -> ScanOutcome {
        let mut matched_rules = Vec::new();
        let mut lines = Vec::new();
        for line in text.lines() {
            let mut hit = false;
            if let Some(pattern) = self.matched_pattern(line) {
                hit = true;
                let rule = format!("pattern `{pattern}`");
                if !matched_rules.contains(&rule) {
                    matched_rules.push(rule);
                }
            }
            for topic in self.topics.iter().filter(|t| t.regex.is_match(line)) {
                hit = true;
                let rule = format!("topic /{}/", topic.source);
                if !matched_rules.contains(&rule) {
                    matched_rules.push(rule);
                }
            }
            lines.push(if hit { "[REDACTED]" } else { line });
        }
        ScanOutcome {
            is_clean: matched_rules.is_empty(),
            matched_rules,
            sanitized: lines.join("\n"),
        }
    }
}

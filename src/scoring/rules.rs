//! Rule tables for the four CFR steps.
//!
//! Each dimension is an ordered list of `(pattern, weight)` rules evaluated
//! against the normalised utterance. The tables are a tunable reference
//! policy; the scorer only relies on their weights.

use once_cell::sync::Lazy;
use regex::Regex;

/// A weighted pattern
#[derive(Debug)]
pub struct WeightedRule {
    pub phrase: &'static str,
    pub weight: u8,
    pattern: Regex,
}

impl WeightedRule {
    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Isolation-question form
#[derive(Debug)]
pub struct IsolationRule {
    pub phrase: &'static str,
    /// Open question ("anything else") rather than a closed yes/no form
    pub open: bool,
    pattern: Regex,
}

impl IsolationRule {
    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// The marker is asked as a question: some occurrence is followed by `?`
    /// before the sentence ends
    pub fn is_asked(&self, text: &str) -> bool {
        self.pattern.find_iter(text).any(|m| {
            text[m.end()..]
                .chars()
                .find(|c| matches!(c, '?' | '.' | '!'))
                == Some('?')
        })
    }
}

fn weighted(table: &[(&'static str, &'static str, u8)]) -> Vec<WeightedRule> {
    table
        .iter()
        .map(|(phrase, pattern, weight)| WeightedRule {
            phrase: *phrase,
            weight: *weight,
            // literal tables, covered by the tests below
            pattern: Regex::new(pattern).unwrap(),
        })
        .collect()
}

/// Acknowledge & affirm: 2 for affirming phrases, 1 for generic openers
pub static ACKNOWLEDGE_RULES: Lazy<Vec<WeightedRule>> = Lazy::new(|| {
    weighted(&[
        ("perfect", r"\bperfect\b", 2),
        ("that makes sense", r"\bthat makes (?:perfect |total )?sense\b", 2),
        ("absolutely", r"\babsolutely\b", 2),
        ("great", r"\bgreat\b", 2),
        ("fantastic", r"\bfantastic\b", 2),
        ("wonderful", r"\bwonderful\b", 2),
        ("amazing", r"\bamazing\b", 2),
        ("you're right", r"\byou'?re (?:absolutely |totally )?right\b", 2),
        ("that's valid", r"\bthat'?s (?:a )?(?:totally |completely )?(?:valid|fair)\b", 2),
        ("i can appreciate that", r"\bi (?:can )?(?:really )?appreciate (?:that|you)\b", 2),
        ("i understand your concern", r"\bi understand your concern", 2),
        ("most people tell me that", r"\bmost people tell me\b", 2),
        ("i can see the benefit", r"\bi can see the benefit\b", 2),
        ("good point", r"\b(?:good|fair|great) (?:point|question)\b", 2),
        ("okay", r"\b(?:okay|ok)\b", 1),
        ("sure", r"\bsure\b", 1),
        ("got it", r"\bgot it\b", 1),
        ("i hear you", r"\bi hear you\b", 1),
        ("i see", r"\bi see\b", 1),
        ("noted", r"\bnoted\b", 1),
        ("thanks for sharing", r"\bthank(?:s| you) for sharing\b", 1),
        ("all right", r"^\s*(?:all )?right\b", 1),
    ])
});

/// Isolation forms; any match is at least an isolation attempt
pub static ISOLATION_RULES: Lazy<Vec<IsolationRule>> = Lazy::new(|| {
    [
        ("anything else", r"\banything else\b", true),
        ("what else", r"\bwhat else\b", true),
        ("besides", r"\bbesides\b", false),
        ("other than", r"\bother than\b", false),
        ("aside from", r"\baside from\b", false),
        ("apart from", r"\bapart from\b", false),
        ("any other reason", r"\bany other (?:reasons?|concerns?|questions?|hesitations?)\b", false),
        ("out of curiosity", r"\bout of curiosity\b", false),
        ("what specifically makes you", r"\bwhat specifically makes you\b", false),
        ("what is the benefit", r"\bwhat(?: is|'s) the benefit\b", false),
        ("if we could solve that", r"\bif (?:we|i) (?:could|can) (?:solve|fix|address|handle|take care of)\b", false),
        ("is that the only", r"\bis that the only\b", false),
    ]
    .iter()
    .map(|(phrase, pattern, open)| IsolationRule {
        phrase: *phrase,
        open: *open,
        pattern: Regex::new(pattern).unwrap(),
    })
    .collect()
});

/// Close: 2 for an explicit next-step ask, 1 for a soft check-in
pub static CLOSE_RULES: Lazy<Vec<WeightedRule>> = Lazy::new(|| {
    weighted(&[
        ("which works better", r"\bwhich (?:one |day |time |option )?works better\b", 2),
        ("ready to move forward", r"\bready to move forward\b", 2),
        ("would you like to", r"\bwould you like to\b", 2),
        ("why don't we", r"\bwhy don'?t we\b", 2),
        (
            "let's schedule",
            r"\blet'?s (?:schedule|set up|book|get|go|move|start|write|sign|lock|put)\b",
            2,
        ),
        ("please sign", r"\bplease sign\b", 2),
        ("shall we", r"\bshall we\b", 2),
        ("can we schedule", r"\bcan we (?:schedule|set up|book|meet)\b", 2),
        ("next step", r"\bnext step\b", 2),
        (
            "schedule a showing",
            r"\bschedule (?:a|the) (?:showing|call|meeting|tour|walkthrough)\b",
            2,
        ),
        (
            "does that make sense",
            r"\bdoes that (?:make sense|sound good|sound fair|work for you)\b",
            1,
        ),
        ("how does that sound", r"\bhow does that sound\b", 1),
        ("can you see", r"\bcan you see\b", 1),
        ("would that help", r"\bwould that help\b", 1),
        ("are you comfortable", r"\bare you comfortable with\b", 1),
        ("fair enough?", r"\bfair enough\?", 1),
    ])
});

/// Acronyms that are not embedded commands
pub const COMMON_ACRONYMS: &[&str] = &[
    "HOA", "ROI", "FHA", "VA", "USDA", "PMI", "MLS", "CMA", "DTI", "LTV", "ARM", "APR", "NOI",
    "OK", "TV", "USA", "LLC", "HVAC", "AC", "HUD", "IRS", "CEO", "ASAP", "FAQ",
];

/// Runs of ALL-CAPS words, matched on the original casing
pub static EMBEDDED_COMMAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2,}(?:\s+[A-Z]{2,})*\b").unwrap());

/// Strongest rule that matches; earlier rules win ties
pub fn strongest<'a>(rules: &'a [WeightedRule], text: &str) -> Option<&'a WeightedRule> {
    rules
        .iter()
        .filter(|r| r.is_match(text))
        .fold(None, |best: Option<&WeightedRule>, rule| match best {
            Some(b) if b.weight >= rule.weight => Some(b),
            _ => Some(rule),
        })
}

/// Embedded commands in the original-case utterance
pub fn embedded_commands(original: &str) -> Vec<String> {
    EMBEDDED_COMMAND
        .find_iter(original)
        .filter(|m| {
            m.as_str()
                .split_whitespace()
                .any(|w| !COMMON_ACRONYMS.contains(&w))
        })
        .map(|m| m.as_str().to_string())
        .collect()
}

//! Technique / phrase catalog
//!
//! Immutable pattern tables for named techniques, magic phrases and
//! rapport breakers. The catalog is parsed and compiled once; any malformed
//! entry fails the whole load. After loading it is only ever read, so it is
//! shared between sessions behind an `Arc` without locking.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::error::{AppError, Result};

/// Technique entry as stored in the catalog file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TechniqueSpec {
    pub id: String,
    pub name: String,
    pub patterns: Vec<String>,
    pub point_value: u8,
}

/// Magic phrase entry as stored in the catalog file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MagicPhraseSpec {
    pub id: String,
    pub canonical_text: String,
    pub patterns: Vec<String>,
    pub associated_objections: Vec<String>,
}

/// Rapport breaker rule as stored in the catalog file
///
/// A match of `trigger_pattern` is ignored when the text right after it
/// matches `exempt_suffix` ("I understand" vs "I understand your concern").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RapportBreakerSpec {
    pub id: String,
    pub trigger_pattern: String,
    #[serde(default)]
    pub exempt_suffix: Option<String>,
    pub penalty: u8,
    pub suggested_alternative: String,
}

/// Catalog file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    pub techniques: Vec<TechniqueSpec>,
    pub magic_phrases: Vec<MagicPhraseSpec>,
    pub rapport_breakers: Vec<RapportBreakerSpec>,
}

/// Compiled technique
#[derive(Debug, Clone)]
pub struct Technique {
    pub id: String,
    pub name: String,
    pub point_value: u8,
    patterns: Vec<Regex>,
}

impl Technique {
    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// Compiled magic phrase
#[derive(Debug, Clone)]
pub struct MagicPhrase {
    pub id: String,
    pub canonical_text: String,
    pub associated_objections: BTreeSet<String>,
    patterns: Vec<Regex>,
}

impl MagicPhrase {
    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// Compiled rapport breaker rule
#[derive(Debug, Clone)]
pub struct RapportBreakerRule {
    pub id: String,
    pub penalty: u8,
    pub suggested_alternative: String,
    trigger: Regex,
    exempt_suffix: Option<Regex>,
}

impl RapportBreakerRule {
    /// First non-exempt trigger match, if any
    pub fn find(&self, text: &str) -> Option<String> {
        self.trigger
            .find_iter(text)
            .find(|m| match &self.exempt_suffix {
                Some(exempt) => !exempt.is_match(&text[m.end()..]),
                None => true,
            })
            .map(|m| m.as_str().to_string())
    }
}

/// Ids matched per table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogMatches {
    pub techniques: BTreeSet<String>,
    pub magic_phrases: BTreeSet<String>,
    pub rapport_breakers: BTreeSet<String>,
}

/// Loaded catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    techniques: Vec<Technique>,
    magic_phrases: Vec<MagicPhrase>,
    rapport_breakers: Vec<RapportBreakerRule>,
}

impl Catalog {
    /// Parse and compile a catalog from JSON
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw)
            .map_err(|e| AppError::Configuration(format!("invalid catalog: {}", e)))?;
        Self::from_file(file)
    }

    /// Load a catalog from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!("cannot read catalog {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json_str(&raw)?;
        tracing::info!(
            "Loaded catalog from {} ({} techniques, {} magic phrases, {} rapport breakers)",
            path.display(),
            catalog.techniques.len(),
            catalog.magic_phrases.len(),
            catalog.rapport_breakers.len()
        );
        Ok(catalog)
    }

    /// Compile a parsed catalog file
    pub fn from_file(file: CatalogFile) -> Result<Self> {
        let mut ids = IdGuard::default();

        let mut techniques = Vec::with_capacity(file.techniques.len());
        for spec in file.techniques {
            ids.check("technique", &spec.id)?;
            techniques.push(Technique {
                patterns: compile_all("technique", &spec.id, &spec.patterns)?,
                id: spec.id,
                name: spec.name,
                point_value: spec.point_value,
            });
        }

        let mut magic_phrases = Vec::with_capacity(file.magic_phrases.len());
        for spec in file.magic_phrases {
            ids.check("magic phrase", &spec.id)?;
            magic_phrases.push(MagicPhrase {
                patterns: compile_all("magic phrase", &spec.id, &spec.patterns)?,
                id: spec.id,
                canonical_text: spec.canonical_text,
                associated_objections: spec.associated_objections.into_iter().collect(),
            });
        }

        let mut rapport_breakers = Vec::with_capacity(file.rapport_breakers.len());
        for spec in file.rapport_breakers {
            ids.check("rapport breaker", &spec.id)?;
            if spec.penalty == 0 {
                return Err(AppError::Configuration(format!(
                    "rapport breaker '{}' must carry a positive penalty",
                    spec.id
                )));
            }
            let exempt_suffix = spec
                .exempt_suffix
                .as_deref()
                .map(|suffix| compile("rapport breaker", &spec.id, &format!("^(?:{})", suffix)))
                .transpose()?;
            rapport_breakers.push(RapportBreakerRule {
                trigger: compile("rapport breaker", &spec.id, &spec.trigger_pattern)?,
                exempt_suffix,
                id: spec.id,
                penalty: spec.penalty,
                suggested_alternative: spec.suggested_alternative,
            });
        }

        Ok(Self {
            techniques,
            magic_phrases,
            rapport_breakers,
        })
    }

    /// Scan an utterance against every table
    pub fn find_matches(&self, utterance: &str) -> CatalogMatches {
        CatalogMatches {
            techniques: self
                .techniques
                .iter()
                .filter(|t| t.is_match(utterance))
                .map(|t| t.id.clone())
                .collect(),
            magic_phrases: self
                .magic_phrases
                .iter()
                .filter(|m| m.is_match(utterance))
                .map(|m| m.id.clone())
                .collect(),
            rapport_breakers: self
                .rapport_breakers
                .iter()
                .filter(|r| r.find(utterance).is_some())
                .map(|r| r.id.clone())
                .collect(),
        }
    }

    pub fn techniques(&self) -> &[Technique] {
        &self.techniques
    }

    pub fn magic_phrases(&self) -> &[MagicPhrase] {
        &self.magic_phrases
    }

    pub fn rapport_breakers(&self) -> &[RapportBreakerRule] {
        &self.rapport_breakers
    }

    pub fn technique(&self, id: &str) -> Option<&Technique> {
        self.techniques.iter().find(|t| t.id == id)
    }

    pub fn magic_phrase(&self, id: &str) -> Option<&MagicPhrase> {
        self.magic_phrases.iter().find(|m| m.id == id)
    }

    pub fn rapport_breaker(&self, id: &str) -> Option<&RapportBreakerRule> {
        self.rapport_breakers.iter().find(|r| r.id == id)
    }
}

/// Ids must be unique within a table
#[derive(Default)]
struct IdGuard {
    seen: HashSet<(&'static str, String)>,
}

impl IdGuard {
    fn check(&mut self, table: &'static str, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(AppError::Configuration(format!("{} with an empty id", table)));
        }
        if !self.seen.insert((table, id.to_string())) {
            return Err(AppError::Configuration(format!(
                "duplicate {} id '{}'",
                table, id
            )));
        }
        Ok(())
    }
}

fn compile(table: &str, id: &str, pattern: &str) -> Result<Regex> {
    if pattern.trim().is_empty() {
        return Err(AppError::Configuration(format!(
            "{} '{}' has an empty pattern",
            table, id
        )));
    }
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            AppError::Configuration(format!("{} '{}' has an invalid pattern: {}", table, id, e))
        })
}

fn compile_all(table: &str, id: &str, patterns: &[String]) -> Result<Vec<Regex>> {
    if patterns.is_empty() {
        return Err(AppError::Configuration(format!(
            "{} '{}' has no patterns",
            table, id
        )));
    }
    patterns.iter().map(|p| compile(table, id, p)).collect()
}

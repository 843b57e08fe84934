//! Sequence entries as anchored regular expressions.

use regex::Regex;

use sequencer_core::{ResourceName, Result, SequencerError, SequencingRule};

const START: &str = "^";
const END: &str = "$";

/// A compiled sequence entry that keeps the pattern as the user wrote it.
#[derive(Debug, Clone)]
pub struct StrictPattern {
    raw: ResourceName,
    regex: Regex,
}

impl StrictPattern {
    /// Compile `pattern`, wrapping it in `^...$` unless it already starts
    /// with `^` or ends with `$`. A single anchor is honoured as given.
    pub fn compile(pattern: &ResourceName) -> Result<Self> {
        let raw = pattern.as_str();
        let anchored = if !raw.starts_with(START) && !raw.ends_with(END) {
            format!("{}{}{}", START, raw, END)
        } else {
            raw.to_string()
        };
        let regex = Regex::new(&anchored)
            .map_err(|source| SequencerError::InvalidPattern { pattern: raw.to_string(), source })?;
        Ok(Self { raw: pattern.clone(), regex })
    }

    /// The sequence entry exactly as configured.
    pub fn raw(&self) -> &ResourceName { &self.raw }

    pub fn as_regex(&self) -> &Regex { &self.regex }

    pub fn matches(&self, name: &str) -> bool { self.regex.is_match(name) }
}

/// A rule whose entries have all compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub patterns: Vec<StrictPattern>,
}

impl CompiledRule {
    pub fn compile(rule: &SequencingRule) -> Result<Self> {
        let patterns = rule.sequence.iter().map(StrictPattern::compile).collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn len(&self) -> usize { self.patterns.len() }
    pub fn is_empty(&self) -> bool { self.patterns.is_empty() }
}

/// Compile every rule up front; the first invalid entry aborts.
pub fn compile_rules(rules: &[SequencingRule]) -> Result<Vec<CompiledRule>> {
    rules.iter().map(CompiledRule::compile).collect()
}

//! Creation sequencing over one desired/observed snapshot.
//!
//! Rules are walked in order and position by position. A position is kept in
//! the desired state only when every earlier position's matches exist and are
//! ready; otherwise its matches are pruned (never ones that already exist).
//! Removals made by one rule are visible to the rules after it.

use std::fmt::Write;

use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use sequencer_core::{
    ComposedResource, ComposedResources, EvaluationOptions, Ready, ResourceName, Result, SequencingRule,
};
use sequencer_usage::{generate_usage, UsageSchema};

use crate::pattern::{compile_rules, StrictPattern};

/// Outcome of one evaluation. The caller's maps are never touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Desired resources left after pruning.
    pub desired: ComposedResources,
    /// Usages synthesized for deletion sequencing, keyed `{by}-{of}-usage`.
    pub usages: ComposedResources,
    /// Deferral messages in emission order.
    pub messages: Vec<String>,
    /// Set when something was pruned and composite readiness should reset.
    pub reset_composite: bool,
}

impl Evaluation {
    /// Pruned desired resources with the usages merged in.
    pub fn merged(&self) -> ComposedResources {
        let mut out = self.desired.clone();
        out.extend(self.usages.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }
}

pub fn deferral_message(current: &ResourceName, before: &ResourceName, ready: usize, total: usize) -> String {
    let (current, before) = (quote(current.as_str()), quote(before.as_str()));
    if total == 0 {
        format!("Delaying creation of resource(s) matching {} because {} does not exist yet", current, before)
    } else {
        format!(
            "Delaying creation of resource(s) matching {} because {} is not fully ready ({} of {})",
            current, before, ready, total
        )
    }
}

/// Double-quote `s` with Go `%q` escapes so messages read the same across
/// function implementations.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{b}' => out.push_str("\\v"),
            c if c.is_ascii_control() => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn usage_key(by: &ResourceName, of: &ResourceName) -> ResourceName {
    ResourceName::from(format!("{}-{}-usage", by, of))
}

/// Decide which desired resources may be created now.
///
/// Every rule pattern is compiled before anything is evaluated, so an
/// invalid pattern anywhere fails the whole run with no partial result.
pub fn evaluate(
    rules: &[SequencingRule],
    desired: &ComposedResources,
    observed: &ComposedResources,
    opts: EvaluationOptions,
) -> Result<Evaluation> {
    let t0 = std::time::Instant::now();
    let compiled = compile_rules(rules)?;
    let mut pass = Pass {
        observed,
        opts,
        schema: UsageSchema::from(opts.usage_version),
        out: Evaluation { desired: desired.clone(), ..Evaluation::default() },
    };

    for rule in &compiled {
        for i in 1..rule.len() {
            let current = &rule.patterns[i];
            if let Some(by) = observed.get(current.raw()) {
                // Sequencing only gates creation; this one already exists.
                debug!(resource = %current.raw(), "already observed; not gating");
                if opts.enable_deletion_sequencing && !pass.schema.is_usage(by) {
                    pass.protect_predecessor(current.raw(), by, &rule.patterns[i - 1])?;
                }
                continue;
            }
            pass.gate(current, &rule.patterns[..i])?;
        }
    }

    histogram!("sequencer_eval_ms", t0.elapsed().as_secs_f64() * 1000.0);
    Ok(pass.out)
}

struct Pass<'a> {
    observed: &'a ComposedResources,
    opts: EvaluationOptions,
    schema: UsageSchema,
    out: Evaluation,
}

impl Pass<'_> {
    fn matching(&self, pattern: &StrictPattern) -> Vec<ResourceName> {
        self.out.desired.keys().filter(|k| pattern.matches(k.as_str())).cloned().collect()
    }

    /// Check predecessors left to right; the first unmet one defers `current`.
    fn gate(&mut self, current: &StrictPattern, befores: &[StrictPattern]) -> Result<()> {
        for before in befores {
            let keys = self.matching(before);
            let ready = keys.iter().filter(|k| self.out.desired.get(*k).map(|r| r.ready.is_true()).unwrap_or(false)).count();

            if keys.is_empty() || ready != keys.len() {
                let msg = deferral_message(current.raw(), before.raw(), ready, keys.len());
                info!("{}", msg);
                counter!("sequencer_deferrals_total", 1u64);
                self.out.messages.push(msg);
                self.prune(current);
                return Ok(());
            }

            if self.opts.enable_deletion_sequencing {
                self.protect_group(current, &keys)?;
            }
        }
        Ok(())
    }

    /// Remove desired matches of `current` that do not exist yet.
    fn prune(&mut self, current: &StrictPattern) {
        let doomed: Vec<ResourceName> = self
            .out
            .desired
            .keys()
            .filter(|k| current.matches(k.as_str()) && !self.observed.contains_key(*k))
            .cloned()
            .collect();
        for k in doomed {
            debug!(resource = %k, pattern = %current.raw(), "pruning desired resource");
            self.out.desired.remove(&k);
            counter!("sequencer_pruned_total", 1u64);
            if self.opts.reset_composite_readiness {
                self.out.reset_composite = true;
            }
        }
    }

    /// Observed matches of `current` (other than Usages) are used by every
    /// resource in the passing predecessor group.
    fn protect_group(&mut self, current: &StrictPattern, keys: &[ResourceName]) -> Result<()> {
        let observed = self.observed;
        let schema = self.schema;
        for (c, by) in observed.iter().filter(|(c, o)| current.matches(c.as_str()) && !schema.is_usage(o)) {
            for k in keys {
                match observed.get(k) {
                    Some(of) => self.record_usage(c, by, k, of)?,
                    None => warn!(of = %k, by = %c, "dependency not observed yet; no usage recorded"),
                }
            }
        }
        Ok(())
    }

    /// An already observed position is used by the observed matches of the
    /// position right before it.
    fn protect_predecessor(&mut self, r: &ResourceName, by: &ComposedResource, of_pattern: &StrictPattern) -> Result<()> {
        let observed = self.observed;
        for k in self.matching(of_pattern) {
            if let Some(of) = observed.get(&k) {
                self.record_usage(r, by, &k, of)?;
            }
        }
        Ok(())
    }

    fn record_usage(&mut self, by_name: &ResourceName, by: &ComposedResource, of_name: &ResourceName, of: &ComposedResource) -> Result<()> {
        debug!(of = %of_name, by = %by_name, "generate usage");
        let usage = generate_usage(of, by, self.opts.replay_deletion, self.opts.usage_version)?;
        if self.out.usages.insert(usage_key(by_name, of_name), ComposedResource::new(usage, Ready::True)).is_none() {
            counter!("sequencer_usages_total", 1u64);
        }
        Ok(())
    }
}

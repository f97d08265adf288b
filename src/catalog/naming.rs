//! Deterministic, collision-free entity naming
//!
//! Resource entity names are derived in tiers:
//!
//! 1. `{cleanedName}-{kind}` where the cleaned name drops a `{chartId}-` prefix
//! 2. `{namespace}-{base}` unless the namespace is `default`
//! 3. `{chartId}-{base}`
//! 4. a hashed, budget-truncated name
//!
//! A tier is abandoned when its name is already taken or when another
//! resource would derive the same name at that tier. Names longer than the
//! 63 character ceiling always fall through to the hashed form.

use super::entity::MAX_ENTITY_NAME_LEN;
use crate::models::DEFAULT_NAMESPACE;
use std::collections::{HashMap, HashSet};

/// Length of the base-36 hash suffix
pub const HASH_LEN: usize = 6;
/// Longest resource-name fragment kept in a hashed name
const HASHED_NAME_PART: usize = 35;
/// Longest namespace fragment kept in a hashed name
const HASHED_NAMESPACE_PART: usize = 10;

/// Identity of a resource for naming purposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCandidate {
    pub chart_id: String,
    pub namespace: String,
    pub name: String,
    pub kind: String,
}

impl NameCandidate {
    pub fn new(chart_id: &str, namespace: &str, name: &str, kind: &str) -> Self {
        Self {
            chart_id: chart_id.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Resource name with a leading `{chartId}-` removed
    pub fn cleaned_name(&self) -> &str {
        let prefix = format!("{}-", self.chart_id);
        match self.name.strip_prefix(&prefix) {
            Some(rest) if !rest.is_empty() => rest,
            _ => &self.name,
        }
    }

    /// Tier 1: `{cleanedName}-{kind}`
    pub fn base_name(&self) -> String {
        sanitize(&format!("{}-{}", self.cleaned_name(), self.kind.to_lowercase()))
    }

    /// Tier 2: `{namespace}-{base}`, None for the default namespace
    pub fn namespaced_name(&self) -> Option<String> {
        if self.namespace == DEFAULT_NAMESPACE || self.namespace.is_empty() {
            return None;
        }
        Some(sanitize(&format!("{}-{}", self.namespace, self.base_name())))
    }

    /// Tier 3: `{chartId}-{base}`
    pub fn chart_qualified_name(&self) -> String {
        sanitize(&format!("{}-{}", self.chart_id, self.base_name()))
    }

    fn hash_source(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.chart_id, self.namespace, self.name, self.kind
        )
    }

    /// Tier 4: budgeted `[ns-]name[-kind]-{hash}`
    pub fn hashed_name(&self, salt: u32) -> String {
        let source = if salt == 0 {
            self.hash_source()
        } else {
            format!("{}#{}", self.hash_source(), salt)
        };
        let hash = short_hash(&source);
        let budget = MAX_ENTITY_NAME_LEN - hash.len() - 1;

        let name_part = truncate(&sanitize(self.cleaned_name()), HASHED_NAME_PART);
        let mut parts: Vec<String> = Vec::new();
        let mut used = 0usize;
        if !name_part.is_empty() {
            used = name_part.len();
            parts.push(name_part);
        }

        let kind_part = sanitize(&self.kind.to_lowercase());
        if !kind_part.is_empty() && used + separator(used) + kind_part.len() <= budget {
            used += separator(used) + kind_part.len();
            parts.push(kind_part);
        }

        if self.namespace != DEFAULT_NAMESPACE {
            let ns_part = truncate(&sanitize(&self.namespace), HASHED_NAMESPACE_PART);
            if !ns_part.is_empty() && used + separator(used) + ns_part.len() <= budget {
                parts.insert(0, ns_part);
            }
        }

        parts.push(hash);
        parts.join("-")
    }
}

fn separator(used: usize) -> usize {
    if used == 0 { 0 } else { 1 }
}

/// Lowercase and restrict to `[a-z0-9._-]`, collapsing dash runs
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = false;
    for ch in raw.chars() {
        let ch = ch.to_ascii_lowercase();
        let mapped = if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '.' || ch == '_' {
            ch
        } else {
            '-'
        };
        if mapped == '-' {
            if last_dash {
                continue;
            }
            last_dash = true;
        } else {
            last_dash = false;
        }
        out.push(mapped);
    }
    out.trim_matches(|c| c == '-' || c == '.' || c == '_').to_string()
}

fn truncate(s: &str, max: usize) -> String {
    let cut: String = s.chars().take(max).collect();
    cut.trim_end_matches(|c| c == '-' || c == '.' || c == '_')
        .to_string()
}

/// 32-bit multiplicative string hash over UTF-16 code units
pub fn string_hash(s: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in s.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    hash.unsigned_abs()
}

/// Render a number in base 36 (lowercase)
pub fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Six-character base-36 hash of a string
pub fn short_hash(s: &str) -> String {
    let encoded = base36(string_hash(s) as u64);
    let padded = format!("{:0>width$}", encoded, width = HASH_LEN);
    padded.chars().take(HASH_LEN).collect()
}

/// Tracks used names and per-tier name frequencies
#[derive(Debug, Clone, Default)]
pub struct EntityNamer {
    used: HashSet<String>,
    base_counts: HashMap<String, usize>,
    namespaced_counts: HashMap<String, usize>,
    chart_counts: HashMap<String, usize>,
}

impl EntityNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namer pre-seeded with the candidate names of every resource
    ///
    /// The frequency tables replace re-deriving every other resource's name
    /// on each decision; semantics are identical.
    pub fn with_resources(candidates: &[NameCandidate]) -> Self {
        let mut namer = Self::new();
        for candidate in candidates {
            *namer.base_counts.entry(candidate.base_name()).or_default() += 1;
            if let Some(ns_name) = candidate.namespaced_name() {
                *namer.namespaced_counts.entry(ns_name).or_default() += 1;
            }
            *namer
                .chart_counts
                .entry(candidate.chart_qualified_name())
                .or_default() += 1;
        }
        namer
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    /// Claim a fixed name; returns a hashed variant when it is taken or too long
    pub fn claim(&mut self, preferred: &str) -> String {
        let name = sanitize(preferred);
        if name.len() <= MAX_ENTITY_NAME_LEN && !name.is_empty() && !self.used.contains(&name) {
            self.used.insert(name.clone());
            return name;
        }
        let mut salt = 0u32;
        loop {
            let source = if salt == 0 {
                preferred.to_string()
            } else {
                format!("{}#{}", preferred, salt)
            };
            let hash = short_hash(&source);
            let head = truncate(&name, MAX_ENTITY_NAME_LEN - HASH_LEN - 1);
            let candidate = if head.is_empty() {
                hash
            } else {
                format!("{}-{}", head, hash)
            };
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            salt += 1;
        }
    }

    fn collides(&self, name: &str, counts: &HashMap<String, usize>) -> bool {
        self.used.contains(name) || counts.get(name).copied().unwrap_or(0) > 1
    }

    /// Assign the entity name of a resource
    pub fn assign(&mut self, candidate: &NameCandidate) -> String {
        let mut name = Some(candidate.base_name());

        if name.as_deref().is_some_and(|n| self.collides(n, &self.base_counts)) {
            name = candidate
                .namespaced_name()
                .filter(|n| !self.collides(n, &self.namespaced_counts));

            if name.is_none() {
                let chart_name = candidate.chart_qualified_name();
                name = (!self.collides(&chart_name, &self.chart_counts)).then_some(chart_name);
            }
        }

        let name = match name {
            Some(n) if n.len() <= MAX_ENTITY_NAME_LEN && !n.is_empty() => n,
            _ => self.hashed(candidate),
        };
        self.used.insert(name.clone());
        name
    }

    fn hashed(&self, candidate: &NameCandidate) -> String {
        let mut salt = 0u32;
        loop {
            let name = candidate.hashed_name(salt);
            if !self.used.contains(&name) {
                if salt > 0 {
                    tracing::warn!(
                        "Hash collision for {}, resolved with salt {}",
                        candidate.hash_source(),
                        salt
                    );
                }
                return name;
            }
            salt += 1;
        }
    }
}

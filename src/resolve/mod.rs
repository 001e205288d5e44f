//! Candidate resolution: ranking the packages that may provide a module.
//!
//! Sources are consulted in precedence order:
//!
//! 1. explicit overrides (`--mapping`), which end the search;
//! 2. requirement hints from the declarations file;
//! 3. the package index: known providers, then fuzzy name matches against
//!    every package the index or the declarations know about (only the
//!    declared packages when online lookups are disabled);
//! 4. the module name itself, when online lookups are disabled or failed,
//!    or when nothing else matched.

pub mod similarity;

use std::collections::BTreeMap;
use std::fmt;

use crate::declarations::{normalize_key, Declarations};
use crate::error::{Warning, Warnings};
use crate::ports::PackageIndex;

pub use similarity::similarity;

/// Default minimum similarity for a fuzzy match.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

/// How sure the resolver is about a candidate; higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Confidence(pub u16);

impl Confidence {
    /// Explicit override supplied for this run.
    pub const OVERRIDE: Self = Self(1000);
    /// Declared package whose full name matches the module.
    pub const HINT: Self = Self(900);
    /// Declared package whose shortened name matches the module.
    pub const DERIVED_HINT: Self = Self(850);
    /// Package the index knows provides the module.
    pub const KNOWN_ALIAS: Self = Self(820);
    /// The module name itself, assumed to be the package name.
    pub const IDENTITY: Self = Self(100);

    /// Confidence of a fuzzy match with the given similarity.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn fuzzy(score: f64) -> Self {
        Self((score.clamp(0.0, 1.0) * 800.0).round() as u16)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// Explicit module to package override.
    ExactAlias,
    /// Matched a package of the declarations file.
    RequirementHint,
    /// The package index lists it as providing the module.
    KnownAlias,
    /// Similar package name.
    FuzzyMatch,
    /// The module name itself.
    Identity,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExactAlias => "explicit mapping",
            Self::RequirementHint => "requirement hint",
            Self::KnownAlias => "known alias",
            Self::FuzzyMatch => "fuzzy match",
            Self::Identity => "same name",
        })
    }
}

/// A package that may provide a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Package name.
    pub package: String,
    /// Ranking score.
    pub confidence: Confidence,
    /// Which source produced it.
    pub source: CandidateSource,
}

/// Produces ranked candidate packages for modules.
pub struct CandidateResolver<'a> {
    overrides: &'a BTreeMap<String, String>,
    declarations: &'a Declarations,
    index: Option<&'a dyn PackageIndex>,
    online: bool,
    threshold: f64,
}

impl<'a> CandidateResolver<'a> {
    /// Creates a resolver. `index` is `None` when lookups are unavailable.
    #[must_use]
    pub fn new(
        overrides: &'a BTreeMap<String, String>,
        declarations: &'a Declarations,
        index: Option<&'a dyn PackageIndex>,
        threshold: f64,
    ) -> Self {
        Self { overrides, declarations, index, online: true, threshold }
    }

    /// Marks whether `index` answers from the online index. A built-in
    /// index only contributes its known providers, and the module name is
    /// always offered.
    #[must_use]
    pub fn with_online_lookups(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// The explicit package supplied for `module` this run, if any.
    #[must_use]
    pub fn override_for(&self, module: &str) -> Option<&'a str> {
        self.overrides.get(module).map(String::as_str)
    }

    /// Returns the ranked candidates for `module`: highest confidence first,
    /// ties broken by package name. Never empty.
    ///
    /// Index failures are recorded in `warnings` and degrade resolution to
    /// local heuristics.
    pub fn resolve(&self, module: &str, warnings: &mut Warnings) -> Vec<Candidate> {
        if let Some(package) = self.overrides.get(module) {
            self.check_override(module, package);
            return vec![Candidate {
                package: package.clone(),
                confidence: Confidence::OVERRIDE,
                source: CandidateSource::ExactAlias,
            }];
        }

        let mut ranked = Ranking::default();

        if let Some(hint) = self.declarations.hint_for(module) {
            let confidence = if hint.derived { Confidence::DERIVED_HINT } else { Confidence::HINT };
            ranked.offer(&hint.package, confidence, CandidateSource::RequirementHint);
        }

        let mut pool: Vec<String> = self.declarations.packages().iter().cloned().collect();
        let lookup_ok = match self.index.map(|index| index.lookup(module)) {
            Some(Ok(hits)) => {
                for hit in hits {
                    if hit.provides {
                        ranked.offer(
                            &hit.package,
                            Confidence::KNOWN_ALIAS,
                            CandidateSource::KnownAlias,
                        );
                    } else if self.online {
                        pool.push(hit.package);
                    }
                }
                self.online
            }
            Some(Err(e)) => {
                warnings.push(Warning::Lookup {
                    module: module.to_string(),
                    reason: e.to_string(),
                });
                false
            }
            None => false,
        };

        let module_key = normalize_key(module);
        for package in &pool {
            let score = similarity(&module_key, &normalize_key(package));
            if score >= self.threshold {
                ranked.offer(package, Confidence::fuzzy(score), CandidateSource::FuzzyMatch);
            }
        }

        if !lookup_ok || ranked.is_empty() {
            ranked.offer(module, Confidence::IDENTITY, CandidateSource::Identity);
        }

        let candidates = ranked.into_sorted();
        tracing::debug!(module, ?candidates, "candidates");
        candidates
    }

    fn check_override(&self, module: &str, package: &str) {
        let Some(index) = self.index else {
            return;
        };
        match index.exists(package) {
            Ok(true) => tracing::debug!(module, package, "explicit mapping"),
            Ok(false) => tracing::warn!(
                "mapping found for {module} but the package {package} does not seem to exist"
            ),
            Err(e) => tracing::debug!(module, package, "could not verify mapping: {e}"),
        }
    }
}

/// Candidates keyed by normalized package name, keeping the best offer.
#[derive(Default)]
struct Ranking {
    by_key: BTreeMap<String, Candidate>,
}

impl Ranking {
    fn offer(&mut self, package: &str, confidence: Confidence, source: CandidateSource) {
        let candidate = Candidate { package: package.to_string(), confidence, source };
        self.by_key
            .entry(normalize_key(package))
            .and_modify(|existing| {
                if confidence > existing.confidence {
                    *existing = candidate.clone();
                }
            })
            .or_insert(candidate);
    }

    fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    fn into_sorted(self) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self.by_key.into_values().collect();
        candidates.sort_by(|a, b| {
            b.confidence.cmp(&a.confidence).then_with(|| a.package.cmp(&b.package))
        });
        candidates
    }
}

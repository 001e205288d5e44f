//! Reconciliation: settling the package of every required module.
//!
//! Each module moves through `Unresolved -> Prompted -> {Confirmed,
//! Ignored, CustomMapping}`. Modules settled by a previous run, or by
//! command-line options, reach a terminal state without being prompted.
//! The reconciler only mutates the in-memory [`ContextRecord`] it returns;
//! persisting it is the caller's decision.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{InspectError, Warnings};
use crate::ports::{Choice, Prompter};
use crate::resolve::{Candidate, CandidateResolver};
use crate::store::ContextRecord;

/// Where a module is in its reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleState {
    /// Not decided yet.
    Unresolved,
    /// Candidates were presented to the operator.
    Prompted(Vec<Candidate>),
    /// Mapped to a ranked or previously recorded package.
    Confirmed(String),
    /// Left out of the audit.
    Ignored,
    /// Mapped to a package named explicitly by the operator.
    CustomMapping(String),
}

impl ModuleState {
    /// Returns `true` once a disposition is recorded.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed(_) | Self::Ignored | Self::CustomMapping(_))
    }

    /// The package a terminal state maps to.
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::Confirmed(p) | Self::CustomMapping(p) => Some(p),
            _ => None,
        }
    }

    /// Presents `candidates`; only an unresolved module can be prompted.
    #[must_use]
    pub fn prompt(self, candidates: Vec<Candidate>) -> Self {
        match self {
            Self::Unresolved => Self::Prompted(candidates),
            other => other,
        }
    }

    /// Applies the operator's answer to a prompted module.
    ///
    /// # Errors
    ///
    /// Returns [`InspectError::UserAbort`] when the operator aborts, and
    /// [`InspectError::Prompt`] for a pick outside the candidate list.
    pub fn answer(self, choice: Choice) -> Result<Self, InspectError> {
        let Self::Prompted(candidates) = self else {
            return Ok(self);
        };
        let pick = |idx: usize| {
            candidates
                .get(idx)
                .map(|c| Self::Confirmed(c.package.clone()))
                .ok_or_else(|| InspectError::Prompt(format!("no candidate number {}", idx + 1)))
        };
        match choice {
            Choice::AcceptTop => pick(0),
            Choice::Pick(idx) => pick(idx),
            Choice::Custom(package) => Ok(Self::CustomMapping(package)),
            Choice::Ignore => Ok(Self::Ignored),
            Choice::Abort => Err(InspectError::UserAbort),
        }
    }
}

/// How a module ended up in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Imported module mapped to a package.
    Confirmed,
    /// Left out of the audit.
    Ignored,
    /// Forced-in module mapped to a package.
    Extra,
}

/// The settled outcome for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// The package, absent for ignored modules.
    pub package: Option<String>,
    /// Which section of the record the module lands in.
    pub disposition: Disposition,
    /// Whether the operator was asked this run.
    pub prompted: bool,
}

/// Per-run inputs beside the previous record.
#[derive(Debug, Clone, Default)]
pub struct ReconcileRequest {
    /// External modules found by the scanner.
    pub scanned: BTreeSet<String>,
    /// Modules forced in for this run (`--extra-module`).
    pub extra_modules: BTreeSet<String>,
    /// Modules ignored for this run (`--ignore-module`).
    pub ignore_modules: BTreeSet<String>,
}

/// Result of reconciling every required module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// The updated record.
    pub record: ContextRecord,
    /// Decision per required module.
    pub decisions: BTreeMap<String, Decision>,
}

impl Reconciliation {
    /// Packages of every non-ignored required module.
    #[must_use]
    pub fn required_packages(&self) -> BTreeSet<String> {
        self.decisions.values().filter_map(|d| d.package.clone()).collect()
    }
}

/// Settles modules against the previous record, asking the operator when
/// a prompter is available and accepting the top candidate otherwise.
pub struct InteractiveReconciler<'a, 'p> {
    resolver: &'a CandidateResolver<'a>,
    prompter: Option<&'p mut dyn Prompter>,
}

impl<'a, 'p> InteractiveReconciler<'a, 'p> {
    /// Creates a reconciler; `prompter` is `None` in non-interactive mode.
    pub fn new(
        resolver: &'a CandidateResolver<'a>,
        prompter: Option<&'p mut dyn Prompter>,
    ) -> Self {
        Self { resolver, prompter }
    }

    /// Reconciles `request` against `previous` and returns the new record.
    ///
    /// Entries of `previous` for modules that are no longer required are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`InspectError::UserAbort`] if the operator aborts; no partial
    /// result is returned in that case.
    pub fn reconcile(
        &mut self,
        previous: &ContextRecord,
        request: &ReconcileRequest,
        warnings: &mut Warnings,
    ) -> Result<Reconciliation, InspectError> {
        let extra: BTreeSet<String> = previous
            .extra
            .keys()
            .chain(&request.extra_modules)
            .filter(|m| !request.ignore_modules.contains(*m))
            .cloned()
            .collect();
        let required: BTreeSet<&String> = request.scanned.iter().chain(&extra).collect();
        tracing::info!("Mapping {} modules to their packages...", required.len());

        let mut result = Reconciliation::default();
        for module in required {
            let is_extra = extra.contains(module);
            let (state, prompted) = self.settle(module, previous, request, warnings)?;
            let decision = match state.package() {
                None => Decision { package: None, disposition: Disposition::Ignored, prompted },
                Some(package) => Decision {
                    package: Some(package.to_string()),
                    disposition: if is_extra { Disposition::Extra } else { Disposition::Confirmed },
                    prompted,
                },
            };
            tracing::debug!(module = module.as_str(), ?decision, "settled");

            match (&decision.disposition, &decision.package) {
                (Disposition::Ignored, _) => {
                    result.record.ignored.insert(module.clone());
                }
                (Disposition::Extra, package) => {
                    result.record.extra.insert(module.clone(), package.clone());
                }
                (Disposition::Confirmed, Some(package)) => {
                    result.record.mappings.insert(module.clone(), package.clone());
                }
                (Disposition::Confirmed, None) => {}
            }
            result.decisions.insert(module.clone(), decision);
        }
        tracing::info!("Mapping done");
        Ok(result)
    }

    /// Drives one module to a terminal state; also reports whether the
    /// operator was asked.
    fn settle(
        &mut self,
        module: &str,
        previous: &ContextRecord,
        request: &ReconcileRequest,
        warnings: &mut Warnings,
    ) -> Result<(ModuleState, bool), InspectError> {
        if request.ignore_modules.contains(module) {
            return Ok((ModuleState::Ignored, false));
        }
        let recorded = previous
            .mappings
            .get(module)
            .or_else(|| previous.extra.get(module).and_then(Option::as_ref));
        if let Some(package) = self.resolver.override_for(module) {
            let state = if recorded.is_some_and(|p| p == package) {
                ModuleState::Confirmed(package.to_string())
            } else {
                ModuleState::CustomMapping(package.to_string())
            };
            return Ok((state, false));
        }
        if let Some(package) = recorded {
            return Ok((ModuleState::Confirmed(package.clone()), false));
        }
        // An ignored module that is now forced in is decided afresh.
        if previous.ignored.contains(module) && !request.extra_modules.contains(module) {
            return Ok((ModuleState::Ignored, false));
        }

        let candidates = self.resolver.resolve(module, warnings);
        let (choice, prompted) = match self.prompter.as_deref_mut() {
            Some(prompter) => {
                let choice = prompter
                    .choose(module, &candidates)
                    .map_err(|e| InspectError::Prompt(e.to_string()))?;
                (choice, true)
            }
            None => (Choice::AcceptTop, false),
        };
        Ok((ModuleState::Unresolved.prompt(candidates).answer(choice)?, prompted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scripted::ScriptedPrompter;
    use crate::declarations::Declarations;
    use crate::resolve::{CandidateSource, Confidence, DEFAULT_SIMILARITY_THRESHOLD};

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn request(scanned: &[&str]) -> ReconcileRequest {
        ReconcileRequest { scanned: set(scanned), ..ReconcileRequest::default() }
    }

    fn candidate(package: &str) -> Candidate {
        Candidate {
            package: package.into(),
            confidence: Confidence::IDENTITY,
            source: CandidateSource::Identity,
        }
    }

    #[test]
    fn state_machine_transitions() {
        let prompted = ModuleState::Unresolved.prompt(vec![candidate("a"), candidate("b")]);
        assert!(!prompted.is_terminal());
        assert_eq!(
            prompted.clone().answer(Choice::Pick(1)).unwrap(),
            ModuleState::Confirmed("b".into())
        );
        assert_eq!(prompted.clone().answer(Choice::Ignore).unwrap(), ModuleState::Ignored);
        assert_eq!(
            prompted.clone().answer(Choice::Custom("c".into())).unwrap(),
            ModuleState::CustomMapping("c".into())
        );
        assert!(matches!(prompted.clone().answer(Choice::Abort), Err(InspectError::UserAbort)));
        assert!(matches!(prompted.answer(Choice::Pick(5)), Err(InspectError::Prompt(_))));
    }

    #[test]
    fn terminal_states_ignore_further_transitions() {
        let state = ModuleState::Ignored.prompt(vec![candidate("a")]);
        assert_eq!(state.answer(Choice::AcceptTop).unwrap(), ModuleState::Ignored);
    }

    #[test]
    fn non_interactive_accepts_top_candidate() {
        let overrides = BTreeMap::new();
        let decl = Declarations::from_packages(["django-waffle"]);
        let resolver =
            CandidateResolver::new(&overrides, &decl, None, DEFAULT_SIMILARITY_THRESHOLD);
        let mut reconciler = InteractiveReconciler::new(&resolver, None);

        let result = reconciler
            .reconcile(
                &ContextRecord::default(),
                &request(&["waffle", "foobarx"]),
                &mut Warnings::new(),
            )
            .unwrap();

        assert_eq!(result.record.mappings.get("waffle").map(String::as_str), Some("django-waffle"));
        assert_eq!(result.record.mappings.get("foobarx").map(String::as_str), Some("foobarx"));
    }

    #[test]
    fn interactive_answers_are_recorded() {
        let overrides = BTreeMap::new();
        let decl = Declarations::default();
        let resolver =
            CandidateResolver::new(&overrides, &decl, None, DEFAULT_SIMILARITY_THRESHOLD);
        let mut prompter =
            ScriptedPrompter::new([Choice::Custom("beautifulsoup4".into()), Choice::Ignore]);

        let result = InteractiveReconciler::new(&resolver, Some(&mut prompter))
            .reconcile(
                &ContextRecord::default(),
                &request(&["bs4", "legacy"]),
                &mut Warnings::new(),
            )
            .unwrap();

        assert_eq!(result.record.mappings.get("bs4").map(String::as_str), Some("beautifulsoup4"));
        assert!(result.record.ignored.contains("legacy"));
        assert!(result.decisions["bs4"].prompted);
        assert_eq!(prompter.asked_modules(), vec!["bs4", "legacy"]);
    }

    #[test]
    fn recorded_decisions_skip_prompting() {
        let overrides = BTreeMap::new();
        let decl = Declarations::default();
        let resolver =
            CandidateResolver::new(&overrides, &decl, None, DEFAULT_SIMILARITY_THRESHOLD);
        let mut prompter = ScriptedPrompter::new([]);
        let previous = ContextRecord {
            mappings: BTreeMap::from([("yaml".to_string(), "PyYAML".to_string())]),
            ignored: set(&["legacy"]),
            extra: BTreeMap::from([("plugins".to_string(), Some("acme-loader".to_string()))]),
        };

        let result = InteractiveReconciler::new(&resolver, Some(&mut prompter))
            .reconcile(&previous, &request(&["yaml", "legacy"]), &mut Warnings::new())
            .unwrap();

        assert!(prompter.asked().is_empty());
        assert_eq!(result.record, previous);
        assert_eq!(result.decisions["plugins"].disposition, Disposition::Extra);
        assert_eq!(result.decisions["plugins"].package.as_deref(), Some("acme-loader"));
    }

    #[test]
    fn extra_module_answer_is_kept_for_the_next_run() {
        let overrides = BTreeMap::new();
        let decl = Declarations::default();
        let resolver =
            CandidateResolver::new(&overrides, &decl, None, DEFAULT_SIMILARITY_THRESHOLD);
        let req =
            ReconcileRequest { extra_modules: set(&["plugins"]), ..ReconcileRequest::default() };
        let mut prompter = ScriptedPrompter::new([Choice::Custom("acme-loader".into())]);

        let first = InteractiveReconciler::new(&resolver, Some(&mut prompter))
            .reconcile(&ContextRecord::default(), &req, &mut Warnings::new())
            .unwrap();
        assert_eq!(first.record.extra.get("plugins"), Some(&Some("acme-loader".to_string())));

        let mut silent = ScriptedPrompter::new([]);
        let second = InteractiveReconciler::new(&resolver, Some(&mut silent))
            .reconcile(&first.record, &ReconcileRequest::default(), &mut Warnings::new())
            .unwrap();
        assert!(silent.asked().is_empty());
        assert_eq!(second.record, first.record);
        assert_eq!(second.required_packages(), set(&["acme-loader"]));
    }

    #[test]
    fn bare_extra_entry_is_prompted() {
        let overrides = BTreeMap::new();
        let decl = Declarations::default();
        let resolver =
            CandidateResolver::new(&overrides, &decl, None, DEFAULT_SIMILARITY_THRESHOLD);
        let previous = ContextRecord {
            extra: BTreeMap::from([("tasks".to_string(), None)]),
            ..ContextRecord::default()
        };
        let mut prompter = ScriptedPrompter::new([Choice::Custom("celery".into())]);

        let result = InteractiveReconciler::new(&resolver, Some(&mut prompter))
            .reconcile(&previous, &ReconcileRequest::default(), &mut Warnings::new())
            .unwrap();

        assert_eq!(prompter.asked_modules(), vec!["tasks"]);
        assert_eq!(result.record.extra.get("tasks"), Some(&Some("celery".to_string())));
    }

    #[test]
    fn stale_entries_are_dropped() {
        let overrides = BTreeMap::new();
        let decl = Declarations::default();
        let resolver =
            CandidateResolver::new(&overrides, &decl, None, DEFAULT_SIMILARITY_THRESHOLD);
        let previous = ContextRecord {
            mappings: BTreeMap::from([("yaml".to_string(), "PyYAML".to_string())]),
            ignored: set(&["legacy"]),
            extra: BTreeMap::new(),
        };

        let result = InteractiveReconciler::new(&resolver, None)
            .reconcile(&previous, &request(&["requests"]), &mut Warnings::new())
            .unwrap();

        assert_eq!(result.record.mappings.keys().collect::<Vec<_>>(), vec!["requests"]);
        assert!(result.record.ignored.is_empty());
    }

    #[test]
    fn forcing_an_ignored_module_prompts_again() {
        let overrides = BTreeMap::new();
        let decl = Declarations::default();
        let resolver =
            CandidateResolver::new(&overrides, &decl, None, DEFAULT_SIMILARITY_THRESHOLD);
        let mut prompter = ScriptedPrompter::new([Choice::AcceptTop]);
        let previous = ContextRecord { ignored: set(&["plugins"]), ..ContextRecord::default() };
        let req =
            ReconcileRequest { extra_modules: set(&["plugins"]), ..ReconcileRequest::default() };

        let result = InteractiveReconciler::new(&resolver, Some(&mut prompter))
            .reconcile(&previous, &req, &mut Warnings::new())
            .unwrap();

        assert_eq!(prompter.asked_modules(), vec!["plugins"]);
        assert!(result.record.extra.contains_key("plugins"));
        assert!(result.record.ignored.is_empty());
    }

    #[test]
    fn command_line_ignore_and_override_win() {
        let overrides = BTreeMap::from([("yaml".to_string(), "ruamel.yaml".to_string())]);
        let decl = Declarations::default();
        let resolver =
            CandidateResolver::new(&overrides, &decl, None, DEFAULT_SIMILARITY_THRESHOLD);
        let previous = ContextRecord {
            mappings: BTreeMap::from([
                ("yaml".to_string(), "PyYAML".to_string()),
                ("six".to_string(), "six".to_string()),
            ]),
            ..ContextRecord::default()
        };
        let req = ReconcileRequest {
            scanned: set(&["yaml", "six"]),
            ignore_modules: set(&["six"]),
            ..ReconcileRequest::default()
        };

        let result = InteractiveReconciler::new(&resolver, None)
            .reconcile(&previous, &req, &mut Warnings::new())
            .unwrap();

        assert_eq!(result.record.mappings.get("yaml").map(String::as_str), Some("ruamel.yaml"));
        assert!(result.record.ignored.contains("six"));
        assert!(result.record.validate().is_ok());
    }

    #[test]
    fn abort_returns_no_result() {
        let overrides = BTreeMap::new();
        let decl = Declarations::default();
        let resolver =
            CandidateResolver::new(&overrides, &decl, None, DEFAULT_SIMILARITY_THRESHOLD);
        let mut prompter = ScriptedPrompter::new([Choice::AcceptTop, Choice::Abort]);

        let result = InteractiveReconciler::new(&resolver, Some(&mut prompter)).reconcile(
            &ContextRecord::default(),
            &request(&["a", "b", "c"]),
            &mut Warnings::new(),
        );

        assert!(matches!(result, Err(InspectError::UserAbort)));
        assert_eq!(prompter.asked_modules(), vec!["a", "b"]);
    }
}

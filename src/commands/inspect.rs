//! The `packages-inspector` command: scan, resolve, reconcile, diff.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;

use crate::config::InspectConfig;
use crate::context::ServiceContext;
use crate::declarations::apply::rewrite_requirements;
use crate::declarations::{Declarations, DeclarationsFormat};
use crate::drift::{self, DiffOptions, DiffResult};
use crate::error::{InspectError, Warning, Warnings};
use crate::ports::{FileSystem, Prompter};
use crate::reconcile::{Decision, Disposition, InteractiveReconciler, ReconcileRequest};
use crate::resolve::CandidateResolver;
use crate::scan::{ImportScanner, ScanResult};
use crate::store::{write_atomic, ContextStore};

/// How a run ended, mapped to the process exit status by `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No drift, or drift that is not reported as a failure.
    Clean,
    /// Missing or unused packages were found.
    Drift,
    /// The operator aborted; nothing was saved.
    Aborted,
}

/// Everything a completed run found.
#[derive(Debug)]
pub struct Report {
    /// What the scanner saw.
    pub scan: ScanResult,
    /// Decision per required module.
    pub decisions: BTreeMap<String, Decision>,
    /// Missing and unused packages.
    pub diff: DiffResult,
    /// Whether a declarations file was given.
    pub has_declarations: bool,
    /// Whether the context file was written.
    pub context_saved: bool,
    /// Whether the declarations file was rewritten.
    pub applied: bool,
    /// Per-item issues raised along the way.
    pub warnings: Warnings,
}

impl Report {
    /// The outcome for this report. Drift only fails the run when a
    /// declarations file was given and `error_on_diff` is set.
    #[must_use]
    pub fn outcome(&self, error_on_diff: bool) -> Outcome {
        if error_on_diff && self.has_declarations && self.diff.has_drift() {
            Outcome::Drift
        } else {
            Outcome::Clean
        }
    }
}

/// Runs the inspection and prints the report to `out`.
///
/// # Errors
///
/// Returns an error string for fatal failures. An operator abort is not an
/// error; it yields [`Outcome::Aborted`].
pub fn run_with_context(
    config: &InspectConfig,
    ctx: &mut ServiceContext,
    out: &mut dyn Write,
) -> Result<Outcome, String> {
    match inspect(config, ctx) {
        Ok(report) => {
            out.write_all(render(&report).as_bytes())
                .map_err(|e| format!("Failed to write report: {e}"))?;
            Ok(report.outcome(config.error_on_diff))
        }
        Err(InspectError::UserAbort) => {
            tracing::warn!("{}", InspectError::UserAbort);
            Ok(Outcome::Aborted)
        }
        Err(e) => Err(e.to_string()),
    }
}

/// Runs every stage of an inspection.
///
/// The context file is only written once every module is settled, so an
/// abort or a fatal error leaves it untouched.
///
/// # Errors
///
/// Returns the first fatal [`InspectError`].
pub fn inspect(config: &InspectConfig, ctx: &mut ServiceContext) -> Result<Report, InspectError> {
    let mut warnings = Warnings::new();
    let fs = ctx.fs.as_ref();

    tracing::info!("Discovering all the modules of the codebase...");
    let scan = ImportScanner::new(fs).scan(&config.root, &mut warnings)?;
    tracing::info!(
        "Scanned {} files: {} imported only modules, {} both imported and defined.",
        scan.files_scanned,
        scan.external.len(),
        scan.shadowed.len()
    );

    let declarations = Declarations::load(fs, config.declarations.as_ref(), &mut warnings)?;
    let store = ContextStore::new(fs, &config.context_file, config.persist_context);
    let previous = store.load()?;
    if previous.is_empty() {
        tracing::info!("No recorded decisions in {}", config.context_file.display());
    }

    let resolver = CandidateResolver::new(
        &config.overrides,
        &declarations,
        Some(ctx.index.as_ref()),
        config.similarity_threshold,
    )
    .with_online_lookups(config.index.enabled);
    let request = ReconcileRequest {
        scanned: scan.external.clone(),
        extra_modules: config.extra_modules.clone(),
        ignore_modules: config.ignore_modules.clone(),
    };
    let prompter = ctx.prompter.as_mut().map(|p| &mut **p as &mut dyn Prompter);
    let reconciliation = InteractiveReconciler::new(&resolver, prompter).reconcile(
        &previous,
        &request,
        &mut warnings,
    )?;

    reconciliation.record.validate().map_err(|reason| InspectError::ContextValidation {
        path: config.context_file.clone(),
        reason,
    })?;
    let context_saved = store.save(&reconciliation.record)?;

    let options = DiffOptions {
        extra_packages: config.extra_packages.clone(),
        keep_packages: config.keep_packages.clone(),
        shadowed: scan.shadowed.clone(),
    };
    let diff = drift::check(&reconciliation.required_packages(), &declarations, &options);

    let applied = if config.apply && diff.has_drift() {
        apply(fs, config, &diff, &mut warnings)?
    } else {
        false
    };

    Ok(Report {
        scan,
        decisions: reconciliation.decisions,
        diff,
        has_declarations: config.declarations.is_some(),
        context_saved,
        applied,
        warnings,
    })
}

fn apply(
    fs: &dyn FileSystem,
    config: &InspectConfig,
    diff: &DiffResult,
    warnings: &mut Warnings,
) -> Result<bool, InspectError> {
    let Some(source) = &config.declarations else {
        warnings.push(Warning::Apply("no declarations file given, nothing to apply".into()));
        return Ok(false);
    };
    if source.format == DeclarationsFormat::Pipfile {
        warnings.push(Warning::Apply(format!(
            "applying changes to a Pipfile is not supported, edit {} by hand",
            source.path.display()
        )));
        return Ok(false);
    }

    let apply_error = |reason: String| InspectError::Apply { path: source.path.clone(), reason };
    let text = if fs.exists(&source.path) {
        fs.read_to_string(&source.path).map_err(|e| apply_error(e.to_string()))?
    } else {
        String::new()
    };
    let rewritten = rewrite_requirements(&text, &diff.missing, &diff.unused);
    write_atomic(fs, &source.path, &rewritten).map_err(|e| apply_error(e.to_string()))?;
    tracing::info!("Applied changes to {}", source.path.display());
    Ok(true)
}

/// Renders the end-of-run report: the module summary, the diff and the
/// warnings.
#[must_use]
pub fn render(report: &Report) -> String {
    let mut out = String::new();
    if !report.decisions.is_empty() {
        out.push_str("\nModules:\n\n");
        for (module, decision) in &report.decisions {
            let _ = match (&decision.disposition, &decision.package) {
                (Disposition::Ignored, _) | (_, None) => writeln!(out, "{module} (ignored)"),
                (Disposition::Extra, Some(package)) => {
                    writeln!(out, "{module} -> {package} (extra)")
                }
                (Disposition::Confirmed, Some(package)) => writeln!(out, "{module} -> {package}"),
            };
        }
    }

    out.push_str(&drift::format_report(&report.diff, report.has_declarations));
    if report.applied {
        out.push_str("\nChanges applied to the declarations file\n");
    }

    if !report.warnings.is_empty() {
        out.push_str("\nWarnings:\n\n");
        for warning in report.warnings.items() {
            let _ = writeln!(out, "- {warning}");
        }
    }
    out
}

//! One build-start pass: locate tools, resolve grammars, build or reuse
//! artifacts, and fill the serve table.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::builder::cache::{ArtifactCache, CacheAction};
use crate::builder::compiler::{compiler_for, Backend, WasmCompiler};
use crate::builder::driver::BuildDriver;
use crate::builder::events::BuildEvent;
use crate::builder::locator::{locate_emcc, locate_tree_sitter, LocatedTool};
use crate::core::error::GrammarError;
use crate::core::reference::GrammarReference;
use crate::delivery::table::{ServeTable, DEFAULT_RUNTIME_WASM};
use crate::host::Host;
use crate::resolver::Resolver;
use crate::util::config::Options;
use crate::util::fs::relative_path;
use crate::util::shell::{format_duration, Shell, Status};

/// An artifact available after the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub grammar: String,
    pub public_name: String,
    pub path: PathBuf,
}

/// What a build pass did.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Compiled in this pass
    pub built: Vec<ArtifactRecord>,
    /// Reused from the cache
    pub cached: Vec<ArtifactRecord>,
    /// Per-grammar failures, in batch order
    pub failures: Vec<GrammarError>,
    /// Set when the pass was aborted before any grammar was processed
    pub fatal: Option<GrammarError>,
    /// Number of compiler invocations attempted
    pub build_invocations: usize,
    /// The compiler that was used
    pub tool: Option<LocatedTool>,
    pub duration: Duration,
}

impl BuildReport {
    /// No fatal error and no failed grammar.
    pub fn is_success(&self) -> bool {
        self.fatal.is_none() && self.failures.is_empty()
    }

    /// References or names of the grammars that failed.
    pub fn failed_subjects(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|err| err.subject().unwrap_or("<unknown>").to_string())
            .collect()
    }

    /// Turn any failure into an error.
    pub fn into_strict(self) -> Result<BuildReport, GrammarError> {
        if let Some(fatal) = self.fatal {
            return Err(fatal);
        }
        if !self.failures.is_empty() {
            return Err(GrammarError::BatchFailed {
                failed: self.failed_subjects(),
            });
        }
        Ok(self)
    }
}

/// Inputs of a build pass.
pub struct BuildRequest<'a> {
    pub host: &'a dyn Host,
    pub options: &'a Options,
    pub shell: &'a Arc<Shell>,
    pub table: &'a ServeTable,
}

/// The compiler plus the tree-sitter CLI used for manifest repair.
struct Toolchain {
    compiler: Box<dyn WasmCompiler>,
    repair_tool: Option<PathBuf>,
}

fn locate_toolchain(host: &dyn Host, options: &Options) -> Result<Toolchain, GrammarError> {
    match options.backend {
        Backend::Cli => {
            let tree_sitter = locate_tree_sitter(host)?;
            let repair_tool = Some(tree_sitter.path.clone());
            Ok(Toolchain {
                compiler: compiler_for(
                    Backend::Cli,
                    tree_sitter,
                    options.em_build_cache_dir.clone(),
                ),
                repair_tool,
            })
        }
        Backend::Emcc => {
            let emcc = locate_emcc(host)?;
            // tree-sitter is only needed to repair manifests here.
            let repair_tool = match locate_tree_sitter(host) {
                Ok(tool) => Some(tool.path),
                Err(err) => {
                    tracing::debug!("{}; grammars without `tree-sitter.json` cannot be repaired", err);
                    None
                }
            };
            Ok(Toolchain {
                compiler: compiler_for(
                    Backend::Emcc,
                    emcc,
                    options.em_build_cache_dir.clone(),
                ),
                repair_tool,
            })
        }
    }
}

/// Run one build pass over `references`.
///
/// The serve table is cleared first and refilled with the runtime module
/// and every grammar artifact that is available at the end of the pass.
/// Errors never escape: a missing tool is recorded as the report's fatal
/// error, everything else as a per-grammar failure.
pub fn build_grammars(request: &BuildRequest<'_>, references: &[GrammarReference]) -> BuildReport {
    let BuildRequest {
        host,
        options,
        shell,
        table,
    } = *request;
    let start = Instant::now();
    let mut report = BuildReport::default();

    table.clear();
    shell.event(&BuildEvent::BuildStarted {
        grammar_count: references.len(),
        backend: options.backend.to_string(),
    });

    if references.is_empty() {
        report.fatal = Some(GrammarError::NoGrammars);
        return finish(request, report, start);
    }

    let toolchain = match locate_toolchain(host, options) {
        Ok(toolchain) => toolchain,
        Err(err) => {
            tracing::error!("{}", err);
            report.fatal = Some(err);
            return finish(request, report, start);
        }
    };
    tracing::info!("using {}", toolchain.compiler.tool().describe());

    let runtime = options
        .runtime_wasm
        .as_deref()
        .map(|path| host.resolve(path))
        .unwrap_or_else(|| host.root().join(DEFAULT_RUNTIME_WASM));
    if !table.seed_runtime(host, &runtime) {
        tracing::debug!(path = %runtime.display(), "web-tree-sitter runtime not installed");
    }

    let cache = ArtifactCache::new(host, options);
    cache.prepare(host);

    let resolver = Resolver::new(host, toolchain.repair_tool.as_deref());
    let resolution = {
        let _span = shell.span(Status::Resolving, format!("{} grammar(s)", references.len()));
        resolver.resolve_all(references)
    };
    for err in &resolution.failures {
        let subject = err.subject().unwrap_or_default();
        shell.status(Status::Failed, subject);
        shell.event(&BuildEvent::failed(subject, err.to_string()));
    }
    report.failures = resolution.failures;

    let driver = BuildDriver::new(host, toolchain.compiler.as_ref());
    for grammar in &resolution.grammars {
        let plan = cache.plan(host, grammar);
        let spinner = shell.grammar_spinner(&grammar.name);
        let shown = relative_path(host.root(), &plan.output_path);

        let fresh = match plan.action {
            CacheAction::Skip => false,
            CacheAction::Build => {
                report.build_invocations += 1;
                match driver.build_checked(grammar, &plan.output_path) {
                    Ok(_) => true,
                    Err(err) => {
                        tracing::error!(grammar = %grammar.name, reference = %grammar.reference, "{}", err);
                        if let GrammarError::BuildFailed { stderr, .. } = &err {
                            if !stderr.trim().is_empty() {
                                tracing::error!("{}", stderr.trim_end());
                            }
                        }
                        spinner.failed();
                        shell.event(&BuildEvent::failed(&grammar.name, err.to_string()));
                        report.failures.push(err);
                        continue;
                    }
                }
            }
        };

        if !table.register(host, &plan.public_name, &plan.output_path) {
            spinner.failed();
            continue;
        }

        shell.event(&BuildEvent::artifact(
            &grammar.name,
            &plan.output_path,
            &plan.public_name,
            fresh,
        ));
        let record = ArtifactRecord {
            grammar: grammar.name.clone(),
            public_name: plan.public_name,
            path: plan.output_path,
        };
        if fresh {
            spinner.built(shown.display());
            report.built.push(record);
        } else {
            spinner.cached(shown.display());
            report.cached.push(record);
        }
    }

    report.tool = Some(toolchain.compiler.tool().clone());
    finish(request, report, start)
}

fn finish(request: &BuildRequest<'_>, mut report: BuildReport, start: Instant) -> BuildReport {
    report.duration = start.elapsed();
    let shell = request.shell;

    shell.event(&BuildEvent::BuildFinished {
        success: report.is_success(),
        duration_ms: report.duration.as_millis() as u64,
        built: report.built.len(),
        cached: report.cached.len(),
        failed: report.failures.len(),
    });

    if report.fatal.is_none() {
        shell.status(
            Status::Finished,
            format!(
                "{} built, {} cached, {} failed in {}",
                report.built.len(),
                report.cached.len(),
                report.failures.len(),
                format_duration(report.duration)
            ),
        );
    }
    tracing::debug!(
        built = report.built.len(),
        cached = report.cached.len(),
        failed = report.failures.len(),
        invocations = report.build_invocations,
        "build pass finished"
    );

    report
}

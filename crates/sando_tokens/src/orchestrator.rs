//! Dependency-ordered multi-layer builds
//!
//! Layers are built strictly in the order given. A failing layer is
//! recorded and the run moves on; the aggregate report decides overall
//! success afterwards. A failed layer loses its cache entry, so it is
//! retried on the next run.

use std::time::Instant;

use crate::cache::{fingerprint, needs_rebuild, CacheEntry, CacheStore, RebuildDecision, RebuildReason};
use crate::engine::TokenEngine;
use crate::layer::{build_layer, BuildContext, BuildLayerResult, LayerConfig};
use crate::metrics;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Ignore the cache and rebuild every layer
    pub force: bool,
    /// Build only the named layer
    pub only: Option<String>,
}

/// Outcome of one orchestration run
#[derive(Clone, Debug, Default)]
pub struct BuildReport {
    pub results: Vec<BuildLayerResult>,
    pub duration_ms: u64,
}

impl BuildReport {
    /// Every layer succeeded (skipped layers count as successes)
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &BuildLayerResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn result(&self, layer: &str) -> Option<&BuildLayerResult> {
        self.results.iter().find(|r| r.layer_name == layer)
    }

    pub fn summary(&self) -> String {
        metrics::summary_table(&self.results, self.duration_ms)
    }
}

/// Runs layer builds against an engine, a cache store and a shared context
pub struct Orchestrator<'a> {
    engine: &'a dyn TokenEngine,
    cache: &'a mut dyn CacheStore,
    context: &'a BuildContext,
    options: BuildOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        engine: &'a dyn TokenEngine,
        cache: &'a mut dyn CacheStore,
        context: &'a BuildContext,
    ) -> Self {
        Self {
            engine,
            cache,
            context,
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Cache verdict for `layer`, without building anything
    pub fn decision(&self, layer: &LayerConfig) -> RebuildDecision {
        if self.options.force {
            return RebuildDecision::Rebuild(RebuildReason::Forced);
        }
        needs_rebuild(
            &*self.cache,
            &layer.name,
            &layer.source_dir,
            &self.context.layer_output_dirs(layer),
        )
    }

    /// Verdict for every selected layer in build order. Once one layer
    /// needs a rebuild, every later layer does too.
    pub fn plan<'l>(
        &self,
        layers: &'l [LayerConfig],
    ) -> Vec<(&'l LayerConfig, RebuildDecision)> {
        let only = self.options.only.as_deref();
        let mut upstream_rebuilt = false;
        layers
            .iter()
            .filter(|l| only.map_or(true, |only| only == l.name))
            .map(|layer| {
                let decision = if upstream_rebuilt {
                    RebuildDecision::Rebuild(RebuildReason::DependencyRebuilt)
                } else {
                    self.decision(layer)
                };
                upstream_rebuilt |= decision.needs_rebuild();
                (layer, decision)
            })
            .collect()
    }

    /// Build `layers` in order and report on each
    pub fn run(&mut self, layers: &[LayerConfig]) -> BuildReport {
        let started = Instant::now();
        let plan = self.plan(layers);
        let mut results = Vec::with_capacity(plan.len());

        for (layer, decision) in plan {
            let reason = match decision {
                RebuildDecision::UpToDate => {
                    tracing::info!("Layer `{}` is up to date", layer.name);
                    results.push(BuildLayerResult::up_to_date(&layer.name));
                    continue;
                }
                RebuildDecision::Rebuild(reason) => reason,
            };
            tracing::debug!("Rebuilding `{}`: {}", layer.name, reason);

            let result = build_layer(self.engine, layer, self.context);
            if result.success {
                self.record(layer);
            } else {
                self.forget(layer);
            }
            results.push(result);
        }

        let report = BuildReport {
            results,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        if report.is_success() {
            tracing::info!("Build finished in {} ms", report.duration_ms);
        } else {
            tracing::warn!(
                "Build finished with {} failed layer(s)",
                report.failed().count()
            );
        }
        report
    }

    /// Replace the layer's cache entry and persist it
    fn record(&mut self, layer: &LayerConfig) {
        let hashes = match fingerprint(&layer.source_dir) {
            Ok(hashes) => hashes,
            Err(e) => {
                tracing::warn!("Not caching `{}`: {}", layer.name, e);
                return;
            }
        };
        self.cache.replace(CacheEntry::new(layer.name.clone(), hashes));
        self.flush();
    }

    /// A failed layer must not look up to date on the next run
    fn forget(&mut self, layer: &LayerConfig) {
        if self.cache.entry(&layer.name).is_some() {
            self.cache.remove(&layer.name);
            self.flush();
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.cache.flush() {
            tracing::warn!("Failed to write build cache: {}", e);
        }
    }
}

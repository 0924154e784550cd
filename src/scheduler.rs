//! Batch scheduler: buckets records by classification, groups them by
//! location and fans sub-batches out to the waterfall executor under a
//! per-bucket concurrency ceiling.

use crate::classification::{
    BusinessClassifier, Classification, ConfidenceLevel, ProcessingStrategy,
};
use crate::geographic::{analyze_location, GeographicContext};
use crate::models::{BatchEnrichResponse, BatchStats, BusinessRecord, EnrichmentOptions, EnrichmentResponse};
use crate::options::{resolve_options, FeatureToggles, ResolvedOptions};
use crate::stages::StageId;
use crate::waterfall::{RunContext, WaterfallExecutor};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Skip,
    HighPriorityParallel,
    MediumPriorityParallel,
    Sequential,
}

/// Picks the bucket for a classified record given the external stages that
/// would run for it.
pub fn bucket_for(classification: &Classification, applicable: &[StageId]) -> Bucket {
    match (
        classification.confidence,
        classification.processing_strategy,
    ) {
        (ConfidenceLevel::Low, _) if applicable.is_empty() => Bucket::Skip,
        (ConfidenceLevel::High, ProcessingStrategy::Parallel) => Bucket::HighPriorityParallel,
        (ConfidenceLevel::Medium, ProcessingStrategy::Parallel) => Bucket::MediumPriorityParallel,
        _ => Bucket::Sequential,
    }
}

/// Groups keyed items by key (in key order) and chunks each group into
/// sub-batches of at most `size` items.
pub fn sub_batches<T>(items: Vec<(String, T)>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut groups: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for (key, item) in items {
        groups.entry(key).or_default().push(item);
    }

    let mut batches = Vec::new();
    for (_, group) in groups {
        let mut current = Vec::with_capacity(size.min(group.len()));
        for item in group {
            current.push(item);
            if current.len() == size {
                batches.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            batches.push(current);
        }
    }
    batches
}

struct Job {
    index: usize,
    record: BusinessRecord,
    classification: Classification,
    geography: GeographicContext,
}

impl Job {
    fn context<'a>(&'a self, options: &'a ResolvedOptions) -> RunContext<'a> {
        RunContext {
            record: &self.record,
            classification: &self.classification,
            geography: &self.geography,
            options,
        }
    }
}

#[derive(Clone)]
pub struct BatchScheduler {
    executor: WaterfallExecutor,
    classifier: BusinessClassifier,
    toggles: FeatureToggles,
    max_parallel_batches: usize,
    max_batch_size: usize,
}

impl BatchScheduler {
    pub fn new(
        executor: WaterfallExecutor,
        classifier: BusinessClassifier,
        toggles: FeatureToggles,
        max_parallel_batches: usize,
        max_batch_size: usize,
    ) -> Self {
        Self {
            executor,
            classifier,
            toggles,
            max_parallel_batches: max_parallel_batches.max(1),
            max_batch_size: max_batch_size.max(1),
        }
    }

    /// Enriches a batch. Results come back in input order.
    pub async fn run(
        &self,
        records: Vec<BusinessRecord>,
        options: &EnrichmentOptions,
    ) -> BatchEnrichResponse {
        let started = Instant::now();
        let resolved = resolve_options(options, &self.toggles);
        let total = records.len();

        let mut high = Vec::new();
        let mut medium = Vec::new();
        let mut sequential = Vec::new();
        let mut results: Vec<Option<EnrichmentResponse>> = vec![None; total];
        let mut stats = BatchStats {
            total_records: total,
            ..Default::default()
        };

        for (index, record) in records.into_iter().enumerate() {
            let classification = self.classifier.classify(&record).await;
            let geography = analyze_location(&record);
            let job = Job {
                index,
                record,
                classification,
                geography,
            };

            let applicable = self.executor.applicable_stages(job.context(&resolved));
            match bucket_for(&job.classification, &applicable) {
                Bucket::Skip => {
                    tracing::debug!("⏭ Skipping '{}': no applicable providers", job.record.name);
                    stats.skipped += 1;
                    results[index] = Some(self.executor.skipped_response(job.context(&resolved)));
                }
                Bucket::HighPriorityParallel => high.push(job),
                Bucket::MediumPriorityParallel => medium.push(job),
                Bucket::Sequential => sequential.push(job),
            }
        }

        stats.high_priority = high.len();
        stats.medium_priority = medium.len();
        stats.sequential = sequential.len();

        tracing::info!(
            "📦 Batch of {}: {} high, {} medium, {} sequential, {} skipped",
            total,
            stats.high_priority,
            stats.medium_priority,
            stats.sequential,
            stats.skipped
        );

        let high_ceiling = self.max_parallel_batches;
        let medium_ceiling = (self.max_parallel_batches / 2).max(1);

        let mut completed = self.run_parallel(high, high_ceiling, &resolved).await;
        completed.extend(self.run_parallel(medium, medium_ceiling, &resolved).await);
        for job in &sequential {
            let response = self.executor.execute(job.context(&resolved)).await;
            completed.push((job.index, response));
        }

        for (index, response) in completed {
            if let Some(slot) = results.get_mut(index) {
                *slot = Some(response);
            }
        }

        let results: Vec<EnrichmentResponse> = results.into_iter().flatten().collect();
        finish_stats(&mut stats, &results, started);

        tracing::info!(
            "✓ Batch complete: {} records, {} API calls skipped, cache hit rate {:.1}%, cost ${:.3}",
            stats.total_records,
            stats.api_calls_skipped,
            stats.cache_hit_rate * 100.0,
            stats.total_cost
        );

        BatchEnrichResponse { results, stats }
    }

    async fn run_parallel(
        &self,
        jobs: Vec<Job>,
        ceiling: usize,
        options: &ResolvedOptions,
    ) -> Vec<(usize, EnrichmentResponse)> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let keyed = jobs
            .into_iter()
            .map(|job| (job.geography.location_key(), job))
            .collect();
        let batches = sub_batches(keyed, self.max_batch_size);
        tracing::debug!("Running {} sub-batches, {} at a time", batches.len(), ceiling);

        let finished: Vec<Vec<(usize, EnrichmentResponse)>> = stream::iter(batches)
            .map(|batch| self.run_sub_batch(batch, options))
            .buffer_unordered(ceiling.max(1))
            .collect()
            .await;

        finished.into_iter().flatten().collect()
    }

    async fn run_sub_batch(
        &self,
        batch: Vec<Job>,
        options: &ResolvedOptions,
    ) -> Vec<(usize, EnrichmentResponse)> {
        futures::future::join_all(batch.iter().map(|job| async move {
            (job.index, self.executor.execute(job.context(options)).await)
        }))
        .await
    }
}

fn finish_stats(stats: &mut BatchStats, results: &[EnrichmentResponse], started: Instant) {
    stats.api_calls_skipped = results.iter().map(|r| r.routing_skips()).sum();
    stats.cache_lookups = results.iter().map(|r| r.cache_lookups as usize).sum();
    stats.cache_hits = results.iter().map(|r| r.cache_hits()).sum();
    stats.cache_hit_rate = if stats.cache_lookups == 0 {
        0.0
    } else {
        stats.cache_hits as f64 / stats.cache_lookups as f64
    };
    stats.provider_calls = results.iter().map(|r| r.provider_calls).sum();
    stats.total_cost = results.iter().map(|r| r.total_cost).sum();
    stats.processing_time_ms = started.elapsed().as_millis() as u64;
}

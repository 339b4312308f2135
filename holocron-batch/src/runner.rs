//! Batch runner
//!
//! Writes are issued one at a time with an optional fixed delay between
//! them. A failed write is logged with its slug and counted; the pass carries
//! on with the next record. Re-running an idempotent pass is the recovery
//! path, so nothing is retried here.
//!
//! In dry-run mode every pass computes and logs its writes and tallies them
//! as updated, but the store is never written.

use std::collections::hash_map::{Entry, HashMap};
use std::fmt;
use std::time::Duration;

use holocron_common::family::{plan_parent_migration, resolve, FamilyRule, Resolution};
use holocron_common::{Category, Lineage, Result, Starship, StarshipStore};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Pause between consecutive writes
    pub delay: Duration,
    /// Log and count writes without issuing them
    pub dry_run: bool,
}

impl BatchOptions {
    pub fn with_delay_ms(ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            ..Self::default()
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Per-record outcome tally for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub updated: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn merge(&mut self, other: BatchSummary) {
        self.updated += other.updated;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Count the result of one store write
    ///
    /// `Ok(false)` means the slug vanished between load and write.
    pub fn record(&mut self, slug: &str, outcome: Result<bool>) {
        match outcome {
            Ok(true) => {
                debug!("Updated {}", slug);
                self.updated += 1;
            }
            Ok(false) => {
                warn!("Skipped {}: record not found", slug);
                self.skipped += 1;
            }
            Err(e) => {
                warn!("Failed {}: {}", slug, e);
                self.failed += 1;
            }
        }
    }

    /// Count a write that a dry run left out
    pub fn record_planned(&mut self, slug: &str, what: impl fmt::Display) {
        info!("Would update {}: {}", slug, what);
        self.updated += 1;
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "updated: {}, failed: {}, skipped: {}",
            self.updated, self.failed, self.skipped
        )
    }
}

/// Spaces out writes by the configured delay; the first write is not delayed
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    pub fn new(options: &BatchOptions) -> Self {
        Self {
            delay: options.delay,
            started: false,
        }
    }

    pub async fn wait(&mut self) {
        if self.started && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;
    }
}

/// Write the changed assignments of one resolution
pub async fn apply_resolution<S: StarshipStore>(
    store: &S,
    resolution: &Resolution,
    options: &BatchOptions,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let mut pacer = Pacer::new(options);

    for assignment in &resolution.assignments {
        if assignment.unchanged {
            debug!("Skipped {}: already in target state", assignment.slug);
            summary.skipped += 1;
            continue;
        }

        if options.dry_run {
            summary.record_planned(&assignment.slug, describe_lineage(&assignment.lineage));
            continue;
        }

        pacer.wait().await;
        let outcome = store.set_lineage(&assignment.slug, &assignment.lineage).await;
        summary.record(&assignment.slug, outcome);
    }

    for slug in &resolution.missing {
        warn!("Skipped {}: not found in {}", slug, resolution.category);
        summary.skipped += 1;
    }

    summary
}

/// Resolve every rule, then write
///
/// Each category is loaded once. Rules resolve in order against that
/// in-memory set, so later rules see the effect of earlier ones. An input
/// error in any rule (an override whose base is absent) aborts the run
/// before the first write.
pub async fn run_family_rules<S: StarshipStore>(
    store: &S,
    rules: &[FamilyRule],
    options: &BatchOptions,
) -> Result<BatchSummary> {
    let mut loaded: HashMap<Category, Vec<Starship>> = HashMap::new();
    let mut resolutions = Vec::with_capacity(rules.len());

    for rule in rules {
        let records = match loaded.entry(rule.category) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(store.load_starships(Some(rule.category)).await?)
            }
        };

        let resolution = resolve(rule, records)?;
        resolution.apply_to(records);

        match &resolution.base {
            Some(base) => info!(
                "Family '{}' ({}): base {}, {} member(s), {} change(s)",
                rule.family,
                rule.category,
                base,
                resolution.assignments.len(),
                resolution.changes().count()
            ),
            None => info!("Family '{}' ({}): no matching records", rule.family, rule.category),
        }

        resolutions.push(resolution);
    }

    let mut total = BatchSummary::default();
    for resolution in &resolutions {
        total.merge(apply_resolution(store, resolution, options).await);
    }

    Ok(total)
}

/// Rewrite every stored `parent` to the base record's display name
pub async fn normalize_parents<S: StarshipStore>(store: &S, options: &BatchOptions) -> Result<BatchSummary> {
    let records = store.load_starships(None).await?;
    let plan = plan_parent_migration(&records);
    info!("{} of {} record(s) need a parent rewrite", plan.len(), records.len());

    let mut summary = BatchSummary::default();
    let mut pacer = Pacer::new(options);

    for (slug, lineage) in &plan {
        if options.dry_run {
            summary.record_planned(slug, describe_lineage(lineage));
            continue;
        }

        log_lineage_change(slug, lineage);
        pacer.wait().await;
        let outcome = store.set_lineage(slug, lineage).await;
        summary.record(slug, outcome);
    }

    Ok(summary)
}

fn log_lineage_change(slug: &str, lineage: &Lineage) {
    debug!("{} -> {}", slug, describe_lineage(lineage));
}

fn describe_lineage(lineage: &Lineage) -> String {
    match &lineage.parent {
        Some(parent) => format!("parent '{}'", parent),
        None => "base".to_string(),
    }
}

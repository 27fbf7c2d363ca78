use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use adhist_core::{
    AdhistConfig, AdhistError, CausalRun, ContextBucketConfig, ContextBucketExtractor,
    ContextTable, CounterWidth, FeatureSet, GroupExtractor, Grouping, ReferenceData, RunReport,
    SplitPair, UidExtractor, build_strategy,
};
use futures::stream::{self, StreamExt};

use crate::io::{GzCsvRowSink, GzCsvRowSource};
use crate::load::load_reference;

/// Orchestrator that runs every (feature set, split pair) combination of a plan.
///
/// Cloning is cheap: configuration, reference data, and the context table are
/// shared between clones, which is how concurrent runs see the same tables.
#[derive(Clone)]
pub struct Adhist {
    pub(crate) cfg: Arc<AdhistConfig>,
    pub(crate) refs: Arc<ReferenceData>,
    pub(crate) context: ContextTable,
}

/// Builder for constructing an [`Adhist`] orchestrator.
pub struct AdhistBuilder {
    cfg: AdhistConfig,
    refs: Option<Arc<ReferenceData>>,
    context: Option<ContextTable>,
}

impl Default for AdhistBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AdhistBuilder {
    /// Start from [`AdhistConfig::default`], which reproduces the full batch
    /// job: eleven feature sets over the validation and full split pairs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cfg: AdhistConfig::default(),
            refs: None,
            context: None,
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: AdhistConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Directory the feature files are written to.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cfg.output_dir = dir.into();
        self
    }

    /// Feature sets to generate, in order.
    #[must_use]
    pub fn feature_sets(mut self, sets: Vec<FeatureSet>) -> Self {
        self.cfg.feature_sets = sets;
        self
    }

    /// Split pairs every feature set runs over, in order.
    #[must_use]
    pub fn split_pairs(mut self, pairs: Vec<SplitPair>) -> Self {
        self.cfg.split_pairs = pairs;
        self
    }

    /// Number of runs allowed to execute at once.
    ///
    /// Each run holds its own counter maps, so memory grows with this value.
    #[must_use]
    pub const fn max_concurrent_runs(mut self, n: usize) -> Self {
        self.cfg.max_concurrent_runs = n;
        self
    }

    /// Rows between progress events (0 disables them).
    #[must_use]
    pub const fn progress_every(mut self, rows: u64) -> Self {
        self.cfg.progress_every = rows;
        self
    }

    /// Read and write buffer size for gzip CSV files.
    #[must_use]
    pub const fn io_buffer_bytes(mut self, bytes: usize) -> Self {
        self.cfg.io_buffer_bytes = bytes;
        self
    }

    /// Parameters of the context-bucket grouping.
    #[must_use]
    pub const fn context(mut self, context: ContextBucketConfig) -> Self {
        self.cfg.context = context;
        self
    }

    /// Use already indexed reference data instead of loading it from
    /// `config.reference`.
    #[must_use]
    pub fn reference_data(mut self, refs: Arc<ReferenceData>) -> Self {
        self.refs = Some(refs);
        self
    }

    /// Share an existing context id table.
    #[must_use]
    pub fn context_table(mut self, table: ContextTable) -> Self {
        self.context = Some(table);
        self
    }

    /// Validate the configuration and load reference data if none was injected.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for an unusable plan (no concurrency, empty
    /// buffers, empty context windows, duplicate feature-set names, or a counter
    /// width that does not fit its dimension), and any loader error.
    pub fn build(self) -> Result<Adhist, AdhistError> {
        validate(&self.cfg)?;
        let refs = match self.refs {
            Some(refs) => refs,
            None => Arc::new(load_reference(
                &self.cfg.reference,
                self.cfg.io_buffer_bytes,
            )?),
        };
        Ok(Adhist {
            cfg: Arc::new(self.cfg),
            refs,
            context: self.context.unwrap_or_default(),
        })
    }
}

fn validate(cfg: &AdhistConfig) -> Result<(), AdhistError> {
    let invalid = |msg: String| Err(AdhistError::InvalidConfig(msg));
    if cfg.max_concurrent_runs == 0 {
        return invalid("max_concurrent_runs must be at least 1".into());
    }
    if cfg.io_buffer_bytes == 0 {
        return invalid("io_buffer_bytes must be positive".into());
    }
    ContextBucketExtractor::new(cfg.context, ContextTable::new())?;

    let mut names = HashSet::new();
    for fs in &cfg.feature_sets {
        if !names.insert(fs.name.as_str()) {
            return invalid(format!("duplicate feature set {}", fs.name));
        }
        if fs.dimension.is_weighted() != (fs.counter == CounterWidth::F32) {
            return invalid(format!(
                "feature set {}: {:?} counters cannot be {:?}",
                fs.name, fs.dimension, fs.counter
            ));
        }
    }
    Ok(())
}

/// Fold the failures of a batch into one error.
///
/// A single failure is returned as is; several become `AllRunsFailed`.
#[must_use]
pub fn collapse_errors(mut errors: Vec<AdhistError>) -> Option<AdhistError> {
    match errors.len() {
        0 => None,
        1 => errors.pop(),
        _ => Some(AdhistError::AllRunsFailed(errors)),
    }
}

impl Adhist {
    /// Start building a new `Adhist` instance.
    ///
    /// ```rust,ignore
    /// use adhist::{Adhist, FeatureSet};
    ///
    /// let adhist = Adhist::builder()
    ///     .feature_sets(vec![FeatureSet::default_plan().remove(0)])
    ///     .output_dir("cache")
    ///     .max_concurrent_runs(2)
    ///     .build()?;
    /// let reports = adhist.run_all().await?;
    /// ```
    #[must_use]
    pub fn builder() -> AdhistBuilder {
        AdhistBuilder::new()
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &AdhistConfig {
        &self.cfg
    }

    /// Reference data shared by every run.
    #[must_use]
    pub const fn reference_data(&self) -> &Arc<ReferenceData> {
        &self.refs
    }

    /// Context id table shared by every context-grouped run.
    #[must_use]
    pub const fn context_table(&self) -> &ContextTable {
        &self.context
    }

    /// `<output_dir>/<feature set>_<split>.csv.gz`.
    #[must_use]
    pub fn output_path(&self, feature_set: &str, split: &str) -> PathBuf {
        self.cfg
            .output_dir
            .join(format!("{feature_set}_{split}.csv.gz"))
    }

    fn extractor(&self, grouping: Grouping) -> Result<Arc<dyn GroupExtractor>, AdhistError> {
        Ok(match grouping {
            Grouping::Uid => Arc::new(UidExtractor),
            Grouping::Context => Arc::new(ContextBucketExtractor::new(
                self.cfg.context,
                self.context.clone(),
            )?),
        })
    }

    fn open_source(&self, path: &Path) -> Result<GzCsvRowSource, AdhistError> {
        GzCsvRowSource::open(path, self.cfg.io_buffer_bytes)
    }

    /// Generate one feature set over one split pair.
    ///
    /// Seeds the future counters from the scored split, then merge-joins both
    /// splits into their two output files. Blocking; see [`run_all`](Self::run_all)
    /// for the async driver.
    ///
    /// # Errors
    /// Any failure is wrapped in `RunFailed` naming the feature set and split
    /// pair. Output files of a failed run are left in place and are invalid.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "adhist::core::generate",
            skip(self, fs, pair),
            fields(
                feature_set = %fs.name,
                scored = %pair.scored.name,
                unscored = %pair.unscored.name,
            ),
        )
    )]
    pub fn generate(&self, fs: &FeatureSet, pair: &SplitPair) -> Result<RunReport, AdhistError> {
        let label = format!("{}[{}/{}]", fs.name, pair.scored.name, pair.unscored.name);
        self.generate_inner(fs, pair, &label)
            .map_err(|e| e.in_run(label))
    }

    fn generate_inner(
        &self,
        fs: &FeatureSet,
        pair: &SplitPair,
        label: &str,
    ) -> Result<RunReport, AdhistError> {
        std::fs::create_dir_all(&self.cfg.output_dir)
            .map_err(|e| AdhistError::io(&self.cfg.output_dir, &e))?;

        let strategy = build_strategy(fs.dimension, fs.counter, self.refs.clone())?;
        let mut run = CausalRun::new(
            label,
            strategy,
            self.extractor(fs.grouping)?,
            self.refs.clone(),
        )
        .with_progress_every(self.cfg.progress_every);

        let started = Instant::now();
        let seeded_rows = run.seed_future(&mut self.open_source(&pair.scored.path)?)?;
        let seed_elapsed = started.elapsed();

        let buffer = self.cfg.io_buffer_bytes;
        let mut scored_out =
            GzCsvRowSink::create(self.output_path(&fs.name, &pair.scored.name), buffer)?;
        let mut unscored_out =
            GzCsvRowSink::create(self.output_path(&fs.name, &pair.unscored.name), buffer)?;

        let started = Instant::now();
        let merge = run.merge_join(
            &mut self.open_source(&pair.scored.path)?,
            &mut self.open_source(&pair.unscored.path)?,
            &mut scored_out,
            &mut unscored_out,
        )?;
        let merge_elapsed = started.elapsed();

        #[cfg(feature = "tracing")]
        tracing::info!(
            seeded_rows,
            rows = merge.total_rows(),
            seed_ms = u64::try_from(seed_elapsed.as_millis()).unwrap_or(u64::MAX),
            merge_ms = u64::try_from(merge_elapsed.as_millis()).unwrap_or(u64::MAX),
            "run complete"
        );

        Ok(RunReport {
            feature_set: fs.name.clone(),
            scored_split: pair.scored.name.clone(),
            unscored_split: pair.unscored.name.clone(),
            seeded_rows,
            merge,
            seed_elapsed,
            merge_elapsed,
        })
    }

    /// Every (feature set, split pair) job of the plan, feature sets outermost.
    #[must_use]
    pub fn jobs(&self) -> Vec<(FeatureSet, SplitPair)> {
        self.cfg
            .feature_sets
            .iter()
            .flat_map(|fs| {
                self.cfg
                    .split_pairs
                    .iter()
                    .map(move |pair| (fs.clone(), pair.clone()))
            })
            .collect()
    }

    /// Run the whole plan on the blocking pool, at most `max_concurrent_runs`
    /// at a time. Reports come back in plan order.
    ///
    /// Every job is attempted even after a failure.
    ///
    /// # Errors
    /// The single failure if exactly one run failed, `AllRunsFailed` if several
    /// did.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "adhist::core::run_all",
            skip(self),
            fields(concurrency = self.cfg.max_concurrent_runs),
        )
    )]
    pub async fn run_all(&self) -> Result<Vec<RunReport>, AdhistError> {
        let results: Vec<Result<RunReport, AdhistError>> = stream::iter(self.jobs())
            .map(|(fs, pair)| {
                let this = self.clone();
                async move {
                    tokio::task::spawn_blocking(move || this.generate(&fs, &pair))
                        .await
                        .map_err(|e| AdhistError::Other(format!("run task failed: {e}")))?
                }
            })
            .buffered(self.cfg.max_concurrent_runs.max(1))
            .collect()
            .await;

        let mut reports = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        for r in results {
            match r {
                Ok(report) => reports.push(report),
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %e, "run failed");
                    errors.push(e);
                }
            }
        }
        collapse_errors(errors).map_or(Ok(reports), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adhist_core::{DataSplit, Dimension};

    fn builder() -> AdhistBuilder {
        Adhist::builder().reference_data(Arc::new(ReferenceData::default()))
    }

    #[test]
    fn rejects_width_that_does_not_fit_dimension() {
        let err = builder()
            .feature_sets(vec![FeatureSet::new(
                "bad",
                Grouping::Uid,
                Dimension::Category,
                CounterWidth::U8,
            )])
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, AdhistError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_duplicate_names_and_zero_concurrency() {
        let fs = FeatureSet::new("dup", Grouping::Uid, Dimension::Ad, CounterWidth::U8);
        assert!(builder().feature_sets(vec![fs.clone(), fs]).build().is_err());
        assert!(builder().max_concurrent_runs(0).build().is_err());
        assert!(
            builder()
                .context(ContextBucketConfig {
                    windows_per_week: 0,
                    ..ContextBucketConfig::default()
                })
                .build()
                .is_err()
        );
    }

    #[test]
    fn default_plan_expands_to_twenty_two_jobs_in_plan_order() {
        let adhist = builder().build().unwrap();
        let jobs = adhist.jobs();
        assert_eq!(jobs.len(), 22);
        assert_eq!(jobs[0].0.name, "uid_viewed_grps");
        assert_eq!(jobs[0].1.scored.name, "val_train");
        assert_eq!(jobs[1].1.scored.name, "full_train");
        assert_eq!(jobs[21].0.name, "g2_viewed_ad_tops");
    }

    #[test]
    fn output_paths_follow_the_naming_scheme() {
        let adhist = builder().output_dir("/tmp/feat").build().unwrap();
        assert_eq!(
            adhist.output_path("g2_viewed_ads", "val_test"),
            PathBuf::from("/tmp/feat/g2_viewed_ads_val_test.csv.gz")
        );
    }

    #[test]
    fn collapse_keeps_single_errors_unwrapped() {
        assert_eq!(collapse_errors(vec![]), None);
        let one = AdhistError::Other("x".into());
        assert_eq!(collapse_errors(vec![one.clone()]), Some(one.clone()));
        assert!(matches!(
            collapse_errors(vec![one.clone(), one]),
            Some(AdhistError::AllRunsFailed(v)) if v.len() == 2
        ));
    }

    #[test]
    fn missing_input_fails_the_run_with_its_label() {
        let dir = tempfile::tempdir().unwrap();
        let adhist = builder().output_dir(dir.path()).build().unwrap();
        let pair = SplitPair {
            scored: DataSplit::new("train", dir.path().join("missing_train.csv.gz")),
            unscored: DataSplit::new("test", dir.path().join("missing_test.csv.gz")),
        };
        let fs = FeatureSet::new("grp", Grouping::Uid, Dimension::Group, CounterWidth::U16);
        let err = adhist.generate(&fs, &pair).unwrap_err();
        match err {
            AdhistError::RunFailed { run, source } => {
                assert_eq!(run, "grp[train/test]");
                assert!(matches!(*source, AdhistError::Io { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

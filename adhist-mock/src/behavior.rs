use adhist_core::{AdhistError, FeatureValue, InteractionRow, MemorySink, RowSink, RowSource};

/// What a [`FailingSink`] does once its row budget is spent.
#[derive(Debug, Clone)]
pub enum SinkBehavior {
    /// Record everything, never fail.
    Record,
    /// Accept this many rows, then fail every write with the given error.
    FailAfter(usize, AdhistError),
    /// Accept every row but fail on `finish`.
    FailOnFinish(AdhistError),
}

/// Sink that records like [`MemorySink`] and fails on cue.
#[derive(Debug, Clone)]
pub struct FailingSink {
    behavior: SinkBehavior,
    /// Everything accepted so far.
    pub recorded: MemorySink,
}

impl FailingSink {
    /// Sink following `behavior`.
    #[must_use]
    pub fn new(behavior: SinkBehavior) -> Self {
        Self {
            behavior,
            recorded: MemorySink::new(),
        }
    }

    /// Sink accepting `rows` rows, then failing with an `Io` error on `path`.
    #[must_use]
    pub fn fail_after(rows: usize, path: &str) -> Self {
        Self::new(SinkBehavior::FailAfter(
            rows,
            AdhistError::Io {
                path: path.to_string(),
                msg: "disk full".into(),
            },
        ))
    }
}

impl RowSink for FailingSink {
    fn write_header(&mut self, header: &[&str]) -> Result<(), AdhistError> {
        self.recorded.write_header(header)
    }

    fn write_row(&mut self, values: &[FeatureValue]) -> Result<(), AdhistError> {
        if let SinkBehavior::FailAfter(limit, err) = &self.behavior
            && self.recorded.rows.len() >= *limit
        {
            return Err(err.clone());
        }
        self.recorded.write_row(values)
    }

    fn finish(&mut self) -> Result<(), AdhistError> {
        if let SinkBehavior::FailOnFinish(err) = &self.behavior {
            return Err(err.clone());
        }
        self.recorded.finish()
    }
}

/// Source that yields its rows and then fails instead of signalling the end.
#[derive(Debug, Clone)]
pub struct FailingSource {
    rows: std::vec::IntoIter<InteractionRow>,
    error: AdhistError,
}

impl FailingSource {
    /// Source yielding `rows`, then `error` on every further call.
    #[must_use]
    pub fn new(rows: Vec<InteractionRow>, error: AdhistError) -> Self {
        Self {
            rows: rows.into_iter(),
            error,
        }
    }

    /// Source that hits a malformed `clicked` field after `rows`.
    #[must_use]
    pub fn malformed_after(rows: Vec<InteractionRow>) -> Self {
        Self::new(rows, AdhistError::parse("clicked", "yes"))
    }
}

impl RowSource for FailingSource {
    fn next_row(&mut self) -> Result<Option<InteractionRow>, AdhistError> {
        self.rows.next().map_or_else(|| Err(self.error.clone()), |r| Ok(Some(r)))
    }
}

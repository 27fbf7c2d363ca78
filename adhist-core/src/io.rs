use std::collections::VecDeque;
use std::fmt;

use adhist_types::{AdId, AdhistError, EventId};

/// One interaction: an ad displayed during an event, with its click label if known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionRow {
    /// Event the ad was displayed in.
    pub event_id: EventId,
    /// Displayed ad.
    pub ad_id: AdId,
    /// Click label; `None` for unscored rows.
    pub clicked: Option<bool>,
}

impl InteractionRow {
    /// Build a row with a known label.
    #[must_use]
    pub const fn scored(event_id: EventId, ad_id: AdId, clicked: bool) -> Self {
        Self {
            event_id,
            ad_id,
            clicked: Some(clicked),
        }
    }

    /// Build a row without a label.
    #[must_use]
    pub const fn unscored(event_id: EventId, ad_id: AdId) -> Self {
        Self {
            event_id,
            ad_id,
            clicked: None,
        }
    }

    /// Parse `event_id,ad_id[,clicked]` from an ordered field list.
    ///
    /// A missing or empty third field yields an unlabeled row; any label greater
    /// than zero counts as a click.
    ///
    /// # Errors
    /// Returns `AdhistError::Parse` for missing or non-numeric fields.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self, AdhistError> {
        fn field<'a, S: AsRef<str>>(
            fields: &'a [S],
            idx: usize,
            name: &str,
        ) -> Result<&'a str, AdhistError> {
            fields
                .get(idx)
                .map(|f| f.as_ref().trim())
                .ok_or_else(|| AdhistError::parse(name, ""))
        }

        let event_id = parse_num::<EventId>(field(fields, 0, "event_id")?, "event_id")?;
        let ad_id = parse_num::<AdId>(field(fields, 1, "ad_id")?, "ad_id")?;
        let clicked = match fields.get(2).map(|f| f.as_ref().trim()) {
            None | Some("") => None,
            Some(raw) => Some(parse_num::<i32>(raw, "clicked")? > 0),
        };

        Ok(Self {
            event_id,
            ad_id,
            clicked,
        })
    }
}

/// Parse a trimmed numeric field, mapping failures to `AdhistError::Parse`.
///
/// # Errors
/// Returns `AdhistError::Parse` tagged with `name` when `raw` is not a valid `T`.
pub fn parse_num<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, AdhistError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AdhistError::parse(name, raw))
}

/// Sequential pull of interaction rows, sorted by event id.
pub trait RowSource {
    /// The next row, or `None` once the stream is exhausted.
    ///
    /// # Errors
    /// Propagates read and parse failures of the underlying stream.
    fn next_row(&mut self) -> Result<Option<InteractionRow>, AdhistError>;
}

/// Append-only destination of one header line followed by feature rows.
pub trait RowSink {
    /// Write the column names.
    ///
    /// # Errors
    /// Propagates write failures of the underlying stream.
    fn write_header(&mut self, header: &[&str]) -> Result<(), AdhistError>;

    /// Write one row of feature values.
    ///
    /// # Errors
    /// Propagates write failures of the underlying stream.
    fn write_row(&mut self, values: &[FeatureValue]) -> Result<(), AdhistError>;

    /// Flush buffered output. Called once after the last row.
    ///
    /// # Errors
    /// Propagates flush failures of the underlying stream.
    fn finish(&mut self) -> Result<(), AdhistError> {
        Ok(())
    }
}

/// A single output cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    /// Unsigned exact count.
    Unsigned(u64),
    /// Signed exact count.
    Signed(i64),
    /// Confidence-weighted count.
    Weight(f32),
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::Weight(v) => write!(f, "{v}"),
        }
    }
}

/// In-memory row source over a pre-built list of rows.
#[derive(Debug, Clone, Default)]
pub struct VecRowSource {
    rows: VecDeque<InteractionRow>,
}

impl VecRowSource {
    /// Source yielding `rows` in order.
    pub fn new(rows: impl IntoIterator<Item = InteractionRow>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }
}

impl RowSource for VecRowSource {
    fn next_row(&mut self) -> Result<Option<InteractionRow>, AdhistError> {
        Ok(self.rows.pop_front())
    }
}

/// In-memory sink recording the header and every row.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Header as written.
    pub header: Vec<String>,
    /// Rows as written.
    pub rows: Vec<Vec<FeatureValue>>,
    /// Whether `finish` was called.
    pub finished: bool,
}

impl MemorySink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value at (`row`, `column`), if present.
    #[must_use]
    pub fn cell(&self, row: usize, column: &str) -> Option<FeatureValue> {
        let idx = self.header.iter().position(|h| h == column)?;
        self.rows.get(row)?.get(idx).copied()
    }
}

impl RowSink for MemorySink {
    fn write_header(&mut self, header: &[&str]) -> Result<(), AdhistError> {
        self.header = header.iter().map(|h| (*h).to_string()).collect();
        Ok(())
    }

    fn write_row(&mut self, values: &[FeatureValue]) -> Result<(), AdhistError> {
        self.rows.push(values.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), AdhistError> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scored_and_unscored_rows() {
        assert_eq!(
            InteractionRow::from_fields(&["12", "40", "1"]).unwrap(),
            InteractionRow::scored(12, 40, true)
        );
        assert_eq!(
            InteractionRow::from_fields(&["12", "41", "0"]).unwrap(),
            InteractionRow::scored(12, 41, false)
        );
        assert_eq!(
            InteractionRow::from_fields(&["13", "40"]).unwrap(),
            InteractionRow::unscored(13, 40)
        );
    }

    #[test]
    fn malformed_numbers_are_parse_errors() {
        let err = InteractionRow::from_fields(&["x", "40", "1"]).unwrap_err();
        assert_eq!(err, AdhistError::parse("event_id", "x"));
        let err = InteractionRow::from_fields(&["1"]).unwrap_err();
        assert!(matches!(err, AdhistError::Parse { ref field, .. } if field == "ad_id"));
    }

    #[test]
    fn feature_values_format_like_csv_cells() {
        assert_eq!(FeatureValue::Unsigned(3).to_string(), "3");
        assert_eq!(FeatureValue::Signed(-2).to_string(), "-2");
        assert_eq!(FeatureValue::Weight(0.5).to_string(), "0.5");
    }
}

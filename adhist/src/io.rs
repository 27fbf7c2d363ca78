use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use adhist_core::{AdhistError, FeatureValue, InteractionRow, RowSink, RowSource};
use csv::StringRecord;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

pub(crate) fn csv_err(path: &Path) -> impl Fn(csv::Error) -> AdhistError + '_ {
    move |e| AdhistError::Csv(format!("{}: {e}", path.display()))
}

/// Open a gzip CSV file with a header row for record-at-a-time reading.
pub(crate) fn open_gz_csv(
    path: &Path,
    buffer: usize,
) -> Result<csv::Reader<MultiGzDecoder<BufReader<File>>>, AdhistError> {
    let file = File::open(path).map_err(|e| AdhistError::io(path, &e))?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .buffer_capacity(buffer)
        .from_reader(MultiGzDecoder::new(BufReader::with_capacity(buffer, file))))
}

/// Interaction rows from a gzip CSV file with columns `event_id,ad_id[,clicked]`.
///
/// The header row is skipped. One record buffer is reused for the whole file.
pub struct GzCsvRowSource {
    path: PathBuf,
    reader: csv::Reader<MultiGzDecoder<BufReader<File>>>,
    record: StringRecord,
}

impl GzCsvRowSource {
    /// Open `path` with a read buffer of `buffer` bytes.
    ///
    /// # Errors
    /// Returns `Io` when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, buffer: usize) -> Result<Self, AdhistError> {
        let path = path.as_ref().to_path_buf();
        let reader = open_gz_csv(&path, buffer)?;
        Ok(Self {
            path,
            reader,
            record: StringRecord::new(),
        })
    }

    /// File being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSource for GzCsvRowSource {
    fn next_row(&mut self) -> Result<Option<InteractionRow>, AdhistError> {
        let more = self
            .reader
            .read_record(&mut self.record)
            .map_err(csv_err(&self.path))?;
        if !more {
            return Ok(None);
        }
        let fields: [&str; 3] = std::array::from_fn(|i| self.record.get(i).unwrap_or(""));
        InteractionRow::from_fields(&fields).map(Some)
    }
}

/// Feature rows written as gzip CSV.
///
/// Integers print as integers and weights with the shortest `f32`
/// representation. [`finish`](RowSink::finish) must be called to complete the
/// gzip trailer; a sink dropped without it leaves a truncated file.
pub struct GzCsvRowSink {
    path: PathBuf,
    writer: Option<csv::Writer<GzEncoder<BufWriter<File>>>>,
    scratch: String,
}

impl GzCsvRowSink {
    /// Create (or truncate) `path` with a write buffer of `buffer` bytes.
    ///
    /// # Errors
    /// Returns `Io` when the file cannot be created.
    pub fn create(path: impl AsRef<Path>, buffer: usize) -> Result<Self, AdhistError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| AdhistError::io(&path, &e))?;
        let gz = GzEncoder::new(BufWriter::with_capacity(buffer, file), Compression::default());
        let writer = csv::WriterBuilder::new()
            .buffer_capacity(buffer)
            .from_writer(gz);
        Ok(Self {
            path,
            writer: Some(writer),
            scratch: String::new(),
        })
    }

    /// File being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn closed(path: &Path) -> AdhistError {
    AdhistError::Io {
        path: path.display().to_string(),
        msg: "sink already finished".into(),
    }
}

impl RowSink for GzCsvRowSink {
    fn write_header(&mut self, header: &[&str]) -> Result<(), AdhistError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(closed(&self.path));
        };
        writer.write_record(header).map_err(csv_err(&self.path))
    }

    fn write_row(&mut self, values: &[FeatureValue]) -> Result<(), AdhistError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(closed(&self.path));
        };
        for v in values {
            self.scratch.clear();
            write!(self.scratch, "{v}")
                .map_err(|e| AdhistError::Other(format!("formatting {v:?}: {e}")))?;
            writer
                .write_field(&self.scratch)
                .map_err(csv_err(&self.path))?;
        }
        writer
            .write_record(None::<&[u8]>)
            .map_err(csv_err(&self.path))
    }

    fn finish(&mut self) -> Result<(), AdhistError> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        let path = &self.path;
        let gz = writer.into_inner().map_err(|e| AdhistError::io(path, e.error()))?;
        let buffered = gz.finish().map_err(|e| AdhistError::io(path, &e))?;
        buffered
            .into_inner()
            .map_err(|e| AdhistError::io(path, e.error()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn write_raw(path: &Path, text: &str) {
        let mut gz = GzEncoder::new(Vec::new(), Compression::fast());
        gz.write_all(text.as_bytes()).unwrap();
        std::fs::write(path, gz.finish().unwrap()).unwrap();
    }

    fn read_raw(path: &Path) -> String {
        let mut text = String::new();
        MultiGzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        text
    }

    #[test]
    fn source_reads_labeled_and_unlabeled_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clicks.csv.gz");
        write_raw(&path, "event_id,ad_id,clicked\n3,42,1\n4,7,\n5,9,0\n");

        let mut src = GzCsvRowSource::open(&path, 4096).unwrap();
        assert_eq!(src.path(), path.as_path());
        assert_eq!(
            src.next_row().unwrap(),
            Some(InteractionRow::scored(3, 42, true))
        );
        assert_eq!(src.next_row().unwrap(), Some(InteractionRow::unscored(4, 7)));
        assert_eq!(
            src.next_row().unwrap(),
            Some(InteractionRow::scored(5, 9, false))
        );
        assert_eq!(src.next_row().unwrap(), None);
    }

    #[test]
    fn sink_prints_integers_and_shortest_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv.gz");
        let mut sink = GzCsvRowSink::create(&path, 1024).unwrap();
        sink.write_header(&["n", "s", "w", "x"]).unwrap();
        sink.write_row(&[
            FeatureValue::Unsigned(3),
            FeatureValue::Signed(-1),
            FeatureValue::Weight(0.52),
            FeatureValue::Weight(2.0),
        ])
        .unwrap();
        sink.finish().unwrap();
        // finishing twice is harmless, writing afterwards is not
        sink.finish().unwrap();
        assert!(sink.write_row(&[FeatureValue::Unsigned(1)]).is_err());

        assert_eq!(read_raw(&path), "n,s,w,x\n3,-1,0.52,2\n");
    }

    #[test]
    fn cells_do_not_bleed_into_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv.gz");
        let mut sink = GzCsvRowSink::create(&path, 64).unwrap();
        sink.write_header(&["a", "b"]).unwrap();
        sink.write_row(&[FeatureValue::Weight(0.123_456), FeatureValue::Unsigned(7)])
            .unwrap();
        sink.write_row(&[FeatureValue::Signed(0), FeatureValue::Weight(1.5)])
            .unwrap();
        sink.finish().unwrap();

        assert_eq!(read_raw(&path), "a,b\n0.123456,7\n0,1.5\n");
    }

    #[test]
    fn malformed_label_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv.gz");
        write_raw(&path, "event_id,ad_id,clicked\n1,2,yes\n");

        let mut src = GzCsvRowSource::open(&path, 1024).unwrap();
        assert_eq!(
            src.next_row().unwrap_err(),
            AdhistError::parse("clicked", "yes")
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = GzCsvRowSource::open("/nonexistent/clicks.csv.gz", 1024)
            .err()
            .unwrap();
        assert!(matches!(err, AdhistError::Io { .. }));
    }
}

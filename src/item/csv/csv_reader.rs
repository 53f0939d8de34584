use std::{
    cell::RefCell,
    fs::{self, File},
    io::{self, Read},
    mem,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use log::{debug, error};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::{CsvError, CsvResult},
    item::csv::{
        options::CsvOptions,
        row::{KeyedRow, Row},
    },
};

/// Where the bytes come from before the stream is started.
enum Source<R> {
    /// A file opened on the first pull.
    Path(PathBuf, fn(&Path) -> io::Result<R>),
    /// A reader handed over by the caller.
    Reader(R),
}

enum ReaderState<R> {
    Pending(Source<R>),
    Open(StringRecordsIntoIter<R>),
    Done,
}

/// A lazy, single-pass stream of CSV rows.
///
/// Nothing is read until the first pull. The underlying handle is dropped as
/// soon as the stream is exhausted, fails, is [closed](RowReader::close) or is
/// itself dropped, so abandoning a stream never leaks the file.
///
/// With headers enabled the first record is captured as the field names and
/// every later record is yielded as a [`Row::Keyed`] zipped positionally with
/// them: short records lose the trailing names, extra fields are dropped.
/// Without headers every record is yielded as a [`Row::Positional`].
///
/// # Examples
///
/// ```
/// use csv_store::item::csv::csv_reader::RowReaderBuilder;
/// use csv_store::item::csv::row::Row;
///
/// let data = "id,name\n1,Alice\n2,Bob\n";
/// let reader = RowReaderBuilder::new()
///     .has_headers(true)
///     .from_reader(data.as_bytes());
///
/// let rows = reader.collect::<Result<Vec<Row>, _>>().unwrap();
///
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[1].get("name"), Some("Bob"));
/// ```
pub struct RowReader<R> {
    options: CsvOptions,
    state: RefCell<ReaderState<R>>,
    header: RefCell<Option<Vec<String>>>,
}

impl RowReader<File> {
    /// Prepares a stream over the file at `path`.
    ///
    /// The path is checked immediately so a missing file fails here with
    /// [`CsvError::File`]; the file itself is only opened on the first pull.
    pub fn open<P: AsRef<Path>>(path: P, options: CsvOptions) -> CsvResult<Self> {
        RowReaderBuilder::from_options(options).from_path(path)
    }
}

impl<R: Read> RowReader<R> {
    /// Options this stream was configured with.
    pub fn options(&self) -> CsvOptions {
        self.options
    }

    /// Field names captured from the first record, once it has been read.
    ///
    /// Stays available after the stream is exhausted or closed. `None` when
    /// headers are disabled or the source had no record at all.
    pub fn header(&self) -> Option<Vec<String>> {
        self.header.borrow().clone()
    }

    /// Ends the stream early and releases the underlying handle.
    pub fn close(&self) {
        let previous = mem::replace(&mut *self.state.borrow_mut(), ReaderState::Done);
        if matches!(previous, ReaderState::Open(_)) {
            debug!("CSV stream closed before exhaustion");
        }
    }

    fn start(&self, source: Source<R>) -> CsvResult<StringRecordsIntoIter<R>> {
        let rdr = match source {
            Source::Path(path, open) => {
                let file = open(&path).map_err(|e| {
                    error!("Failed to open CSV file {}: {}", path.display(), e);
                    CsvError::file(path.clone(), e)
                })?;
                debug!("CSV stream opened on {}", path.display());
                file
            }
            Source::Reader(rdr) => rdr,
        };

        Ok(ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .quote(self.options.enclosure)
            .escape(self.options.parser_escape())
            .double_quote(true)
            .trim(Trim::None)
            .has_headers(false) // header capture is done here, not by the parser
            .flexible(true)
            .from_reader(rdr)
            .into_records())
    }
}

fn to_fields(record: &StringRecord) -> Vec<String> {
    record.iter().map(str::to_owned).collect()
}

impl<R: Read> ItemReader<Row> for RowReader<R> {
    /// Reads the next row.
    ///
    /// # Returns
    /// - `Ok(Some(row))` for each data record
    /// - `Ok(None)` once the stream is exhausted (and on every later call)
    /// - `Err(CsvError::File)` if the deferred open fails
    /// - `Err(CsvError::Io)` if the source fails mid-stream; the stream ends there
    fn read(&self) -> ItemReaderResult<Row> {
        let mut state = self.state.borrow_mut();

        if matches!(*state, ReaderState::Pending(_)) {
            if let ReaderState::Pending(source) = mem::replace(&mut *state, ReaderState::Done) {
                *state = ReaderState::Open(self.start(source)?);
            }
        }

        loop {
            let ReaderState::Open(records) = &mut *state else {
                return Ok(None);
            };

            match records.next() {
                None => {
                    *state = ReaderState::Done;
                    debug!("CSV stream exhausted");
                    return Ok(None);
                }
                Some(Err(error)) => {
                    *state = ReaderState::Done;
                    error!("CSV stream failed: {}", error);
                    return Err(error.into());
                }
                Some(Ok(record)) => {
                    if !self.options.header {
                        return Ok(Some(Row::Positional(to_fields(&record))));
                    }

                    let mut header = self.header.borrow_mut();
                    match &*header {
                        Some(names) => {
                            let row: KeyedRow =
                                names.iter().cloned().zip(to_fields(&record)).collect();
                            return Ok(Some(Row::Keyed(row)));
                        }
                        None => {
                            debug!("CSV header captured: {:?}", record);
                            *header = Some(to_fields(&record));
                        }
                    }
                }
            }
        }
    }
}

impl<R: Read> Iterator for RowReader<R> {
    type Item = CsvResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}

/// A builder for configuring a [`RowReader`].
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Enclosure: double quote (")
/// - Escape: backslash (\)
/// - Headers: enabled
///
/// # Examples
///
/// ```
/// use csv_store::item::csv::csv_reader::RowReaderBuilder;
/// use csv_store::item::csv::row::Row;
///
/// let mut reader = RowReaderBuilder::new()
///     .delimiter(b';')
///     .has_headers(false)
///     .from_reader("a;b\nc;d".as_bytes());
///
/// assert_eq!(reader.next().unwrap().unwrap(), Row::positional(["a", "b"]));
/// ```
#[derive(Default)]
pub struct RowReaderBuilder {
    options: CsvOptions,
}

impl RowReaderBuilder {
    pub fn new() -> Self {
        Self {
            options: CsvOptions::DEFAULT,
        }
    }

    /// Starts from a complete option set.
    pub fn from_options(options: CsvOptions) -> Self {
        Self { options }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.options.delimiter = delimiter;
        self
    }

    pub fn enclosure(mut self, enclosure: u8) -> Self {
        self.options.enclosure = enclosure;
        self
    }

    pub fn escape(mut self, escape: u8) -> Self {
        self.options.escape = escape;
        self
    }

    /// When enabled the first record names the fields of every later record.
    pub fn has_headers(mut self, yes: bool) -> Self {
        self.options.header = yes;
        self
    }

    /// Creates a stream over any reader. Parsing starts on the first pull.
    pub fn from_reader<R: Read>(self, rdr: R) -> RowReader<R> {
        RowReader {
            options: self.options,
            state: RefCell::new(ReaderState::Pending(Source::Reader(rdr))),
            header: RefCell::new(None),
        }
    }

    /// Creates a stream over the file at `path`.
    ///
    /// # Errors
    ///
    /// [`CsvError::File`] if the path does not exist or is a directory.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> CsvResult<RowReader<File>> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|e| {
            error!("Failed to open CSV file {}: {}", path.display(), e);
            CsvError::file(path, e)
        })?;
        if metadata.is_dir() {
            return Err(CsvError::file(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "path is a directory"),
            ));
        }

        Ok(RowReader {
            options: self.options,
            state: RefCell::new(ReaderState::Pending(Source::Path(
                path.to_path_buf(),
                |p: &Path| File::open(p),
            ))),
            header: RefCell::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        error::Error,
        io::{self, Read},
    };

    use crate::{
        core::item::ItemReader,
        error::CsvError,
        item::csv::{
            csv_reader::RowReaderBuilder,
            row::{KeyedRow, Row},
        },
    };

    /// Yields its data, then fails every later read.
    struct FailingReader {
        data: &'static [u8],
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::other("device gone"));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn headered_rows_are_keyed_by_header() -> Result<(), Box<dyn Error>> {
        let data = "id,first_name\n1,Dolley\n2,Wait\n";
        let reader = RowReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes());

        let rows = reader.collect::<Result<Vec<Row>, CsvError>>()?;

        assert_eq!(
            rows,
            vec![
                Row::keyed([("id", "1"), ("first_name", "Dolley")]),
                Row::keyed([("id", "2"), ("first_name", "Wait")]),
            ]
        );
        Ok(())
    }

    #[test]
    fn unheadered_rows_include_first_line() -> Result<(), Box<dyn Error>> {
        let data = "id,first_name\n1,Dolley\n";
        let reader = RowReaderBuilder::new()
            .has_headers(false)
            .from_reader(data.as_bytes());

        let rows = reader.collect::<Result<Vec<Row>, CsvError>>()?;

        assert_eq!(
            rows,
            vec![
                Row::positional(["id", "first_name"]),
                Row::positional(["1", "Dolley"]),
            ]
        );
        Ok(())
    }

    #[test]
    fn short_and_long_records_are_truncated_to_header() -> Result<(), Box<dyn Error>> {
        let data = "a,b,c\n1,2\n1,2,3,4\n";
        let reader = RowReaderBuilder::new().from_reader(data.as_bytes());

        let rows = reader.collect::<Result<Vec<Row>, CsvError>>()?;

        assert_eq!(rows[0].field_names(), vec!["a", "b"]);
        assert_eq!(rows[1].field_names(), vec!["a", "b", "c"]);
        assert_eq!(rows[1].values(), vec!["1", "2", "3"]);
        Ok(())
    }

    #[test]
    fn quoted_field_spans_lines_and_keeps_spaces() -> Result<(), Box<dyn Error>> {
        let data = "name;note\n\"Smith; J\";\" multi\nline \"\n";
        let reader = RowReaderBuilder::new()
            .delimiter(b';')
            .from_reader(data.as_bytes());

        let rows = reader.collect::<Result<Vec<Row>, CsvError>>()?;

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some("Smith; J"));
        assert_eq!(rows[0].get("note"), Some(" multi\nline "));
        Ok(())
    }

    #[test]
    fn header_is_captured_lazily() -> Result<(), Box<dyn Error>> {
        let reader = RowReaderBuilder::new().from_reader("x,y\n1,2\n".as_bytes());
        assert_eq!(reader.header(), None);

        let row = reader.read()?;
        assert_eq!(row, Some(Row::keyed([("x", "1"), ("y", "2")])));
        assert_eq!(reader.header(), Some(vec!["x".to_string(), "y".to_string()]));
        Ok(())
    }

    #[test]
    fn header_only_source_has_no_rows() -> Result<(), Box<dyn Error>> {
        let reader = RowReaderBuilder::new().from_reader("x,y\n".as_bytes());
        assert_eq!(reader.read()?, None);
        assert_eq!(reader.read()?, None);
        Ok(())
    }

    #[test]
    fn duplicate_header_names_keep_last_value() -> Result<(), Box<dyn Error>> {
        let reader = RowReaderBuilder::new().from_reader("k,k\n1,2\n".as_bytes());
        let expected: KeyedRow = [("k", "2")].into_iter().collect();

        assert_eq!(reader.read()?, Some(Row::Keyed(expected)));
        Ok(())
    }

    #[test]
    fn failure_mid_stream_keeps_earlier_rows_and_stops() {
        let reader = RowReaderBuilder::new()
            .has_headers(false)
            .from_reader(FailingReader { data: b"a,b\n" });

        let results: Vec<_> = reader.collect();

        assert!(matches!(results.first(), Some(Ok(row)) if *row == Row::positional(["a", "b"])));
        assert!(matches!(results.last(), Some(Err(CsvError::Io(_)))));
    }

    #[test]
    fn closed_stream_yields_nothing() -> Result<(), Box<dyn Error>> {
        let reader = RowReaderBuilder::new()
            .has_headers(false)
            .from_reader("1\n2\n3\n".as_bytes());

        assert!(reader.read()?.is_some());
        reader.close();
        assert_eq!(reader.read()?, None);
        Ok(())
    }

    #[test]
    fn default_escape_protects_enclosure_and_itself() -> Result<(), Box<dyn Error>> {
        let data = "\"a\\\"b\",\"c\\\\\",\"d\"\"e\"\n";
        let reader = RowReaderBuilder::new()
            .has_headers(false)
            .from_reader(data.as_bytes());

        let rows = reader.collect::<Result<Vec<Row>, CsvError>>()?;

        assert_eq!(rows, vec![Row::positional(["a\"b", "c\\", "d\"e"])]);
        Ok(())
    }

    #[test]
    fn custom_escape_is_honoured() -> Result<(), Box<dyn Error>> {
        let data = "\"say #\"hi#\"\",\"back\\slash\"\nnext,row\n";
        let reader = RowReaderBuilder::new()
            .has_headers(false)
            .escape(b'#')
            .from_reader(data.as_bytes());

        let rows = reader.collect::<Result<Vec<Row>, CsvError>>()?;

        assert_eq!(
            rows,
            vec![
                Row::positional(["say \"hi\"", "back\\slash"]),
                Row::positional(["next", "row"]),
            ]
        );
        Ok(())
    }

    #[test]
    fn custom_enclosure_quotes_delimiters() -> Result<(), Box<dyn Error>> {
        let data = "name;note\n'Smith; J';'it\\'s \"fine\"'\n";
        let reader = RowReaderBuilder::new()
            .delimiter(b';')
            .enclosure(b'\'')
            .from_reader(data.as_bytes());

        let rows = reader.collect::<Result<Vec<Row>, CsvError>>()?;

        assert_eq!(
            rows,
            vec![Row::keyed([("name", "Smith; J"), ("note", "it's \"fine\"")])]
        );
        Ok(())
    }

    #[test]
    fn escape_equal_to_enclosure_reads_doubled_quotes() -> Result<(), Box<dyn Error>> {
        let data = "\"a\"\"b\",\"c\\\"\nx,y\n";
        let reader = RowReaderBuilder::new()
            .has_headers(false)
            .escape(b'"')
            .from_reader(data.as_bytes());

        let rows = reader.collect::<Result<Vec<Row>, CsvError>>()?;

        // a backslash is plain data here
        assert_eq!(
            rows,
            vec![Row::positional(["a\"b", "c\\"]), Row::positional(["x", "y"])]
        );
        Ok(())
    }

    #[test]
    fn header_survives_exhaustion_and_close() -> Result<(), Box<dyn Error>> {
        let reader = RowReaderBuilder::new().from_reader("x,y\n1,2\n".as_bytes());
        while reader.read()?.is_some() {}
        assert_eq!(reader.header(), Some(vec!["x".to_string(), "y".to_string()]));

        let reader = RowReaderBuilder::new().from_reader("x,y\n1,2\n".as_bytes());
        reader.read()?;
        reader.close();
        assert_eq!(reader.header(), Some(vec!["x".to_string(), "y".to_string()]));
        Ok(())
    }
}

/// CSV support for streaming rows from and to files.
///
/// # Module Architecture
///
/// 1. **RowReader**: a lazy, single-pass stream of [`row::Row`]s. The file is
///    opened on the first pull and released once the stream ends or is dropped.
///    With headers enabled the first record names the fields of every later one.
///
/// 2. **CsvRowWriter**: serializes rows as CSV lines, emitting a header line from
///    the first row's field names when headers are enabled.
///
/// 3. **CsvStore**: the file-level operations (`open`, `save`, `append`,
///    `count`, `detect_delimiter`) with options layered as
///    defaults → store → call site.
///
/// 4. **detector**: guesses a file's delimiter from its first line.
///
/// Readers and writers follow the builder pattern and implement the
/// [`ItemReader`](crate::core::item::ItemReader) and
/// [`ItemWriter`](crate::core::item::ItemWriter) traits.
///
/// # Examples
///
/// ## Reading rows
///
/// ```
/// use csv_store::item::csv::csv_reader::RowReaderBuilder;
/// use csv_store::core::item::ItemReader;
///
/// let csv_data = "\
/// city,country,pop
/// Boston,United States,4628910
/// Concord,United States,42695
/// ";
///
/// let reader = RowReaderBuilder::new()
///     .has_headers(true)
///     .from_reader(csv_data.as_bytes());
///
/// let first = reader.read().unwrap().unwrap();
/// assert_eq!(first.get("city"), Some("Boston"));
/// assert_eq!(first.get("pop"), Some("4628910"));
///
/// let second = reader.read().unwrap().unwrap();
/// assert_eq!(second.get("city"), Some("Concord"));
///
/// assert!(reader.read().unwrap().is_none());
/// ```
///
/// ## Writing rows
///
/// ```
/// use csv_store::item::csv::csv_writer::CsvRowWriterBuilder;
/// use csv_store::item::csv::row::Row;
/// use csv_store::core::item::ItemWriter;
///
/// let mut buffer = Vec::new();
/// {
///     let writer = CsvRowWriterBuilder::new()
///         .has_headers(false)
///         .delimiter(b'\t')
///         .from_writer(&mut buffer);
///
///     writer.write(&Row::positional(["Alice", "28"])).unwrap();
///     writer.write(&Row::positional(["Bob", "35"])).unwrap();
///     writer.flush().unwrap();
/// } // writer is dropped here, releasing the borrow
///
/// assert_eq!(String::from_utf8(buffer).unwrap(), "Alice\t28\nBob\t35\n");
/// ```

/// Lazy row stream over a file or any reader.
pub mod csv_reader;

/// Row serialization to CSV lines.
pub mod csv_writer;

/// File-level open, save, append and count.
pub mod csv_store;

/// Delimiter guessing from the first line of a file.
pub mod detector;

/// Option sets, partial overrides and process-wide defaults.
pub mod options;

/// Positional and keyed rows.
pub mod row;

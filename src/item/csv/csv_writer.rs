use std::{
    borrow::Cow,
    cell::{Cell, RefCell},
    fs::File,
    io::Write,
    path::Path,
};

use csv::{QuoteStyle, Writer, WriterBuilder};
use log::error;

use crate::{
    core::item::ItemWriter,
    error::{CsvError, CsvResult},
    item::csv::{options::CsvOptions, row::Row},
};

/// Writes [`Row`]s as CSV lines.
///
/// With headers enabled the first row written fixes the header: its field
/// names are emitted as one line before its values. Later keyed rows are
/// written in header order, a missing name becomes an empty field and names
/// outside the header are left out. Positional rows are always written as is.
///
/// Fields containing the delimiter, the enclosure, the escape or a line
/// terminator are quoted. Inside a quoted field the enclosure and the escape
/// are each preceded by the escape, which is what the reader undoes. When the
/// escape equals the enclosure, enclosures are doubled instead.
pub struct CsvRowWriter<W: Write> {
    wrapper: RefCell<Writer<W>>,
    options: CsvOptions,
    has_headers: bool,
    header: RefCell<Option<Vec<String>>>,
    written: Cell<usize>,
}

impl<W: Write> CsvRowWriter<W> {
    /// Number of data rows written so far; the header line is not counted.
    pub fn written(&self) -> usize {
        self.written.get()
    }

    /// Header emitted by this writer, if any.
    pub fn header(&self) -> Option<Vec<String>> {
        self.header.borrow().clone()
    }

    pub fn into_inner(self) -> CsvResult<W> {
        self.wrapper
            .into_inner()
            .into_inner()
            .map_err(|error| CsvError::Io(error.to_string()))
    }

    fn write_fields<'a, I>(&self, fields: I) -> CsvResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let record: Vec<Cow<'a, [u8]>> = match self.options.parser_escape() {
            Some(escape) => {
                let mut record: Vec<_> = fields
                    .into_iter()
                    .map(|field| self.escape_field(field, escape))
                    .collect();
                // a lone empty field would otherwise read back as a blank line
                if record.len() == 1 && record[0].is_empty() {
                    record[0] = Cow::Owned(vec![self.options.enclosure; 2]);
                }
                record
            }
            None => fields
                .into_iter()
                .map(|field| Cow::Borrowed(field.as_bytes()))
                .collect(),
        };

        self.wrapper
            .borrow_mut()
            .write_record(&record)
            .map_err(|error| {
                error!("Failed to write CSV record: {}", error);
                CsvError::from(error)
            })
    }

    /// Quotes `field` if needed, escaping the enclosure and the escape inside.
    fn escape_field<'a>(&self, field: &'a str, escape: u8) -> Cow<'a, [u8]> {
        let CsvOptions {
            delimiter,
            enclosure,
            ..
        } = self.options;
        let bytes = field.as_bytes();
        let needs_quotes = bytes.iter().any(|&b| {
            b == delimiter || b == enclosure || b == escape || b == b'\r' || b == b'\n'
        });
        if !needs_quotes {
            return Cow::Borrowed(bytes);
        }

        let mut quoted = Vec::with_capacity(bytes.len() + 2);
        quoted.push(enclosure);
        for &b in bytes {
            if b == enclosure || b == escape {
                quoted.push(escape);
            }
            quoted.push(b);
        }
        quoted.push(enclosure);
        Cow::Owned(quoted)
    }
}

impl<W: Write> ItemWriter<Row> for CsvRowWriter<W> {
    fn write(&self, item: &Row) -> Result<(), CsvError> {
        if !self.has_headers {
            self.write_fields(item.values())?;
            self.written.set(self.written.get() + 1);
            return Ok(());
        }

        if self.header.borrow().is_none() {
            let names = item.field_names();
            self.write_fields(names.iter().map(String::as_str))?;
            *self.header.borrow_mut() = Some(names);
        }

        match item {
            Row::Keyed(row) => {
                let header = self.header.borrow();
                let names = header.as_deref().unwrap_or_default();
                self.write_fields(names.iter().map(|name| row.get(name).unwrap_or("")))?;
            }
            Row::Positional(fields) => self.write_fields(fields.iter().map(String::as_str))?,
        }

        self.written.set(self.written.get() + 1);
        Ok(())
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    ///
    /// Note that this also flushes the underlying writer.
    fn flush(&self) -> Result<(), CsvError> {
        self.wrapper.borrow_mut().flush().map_err(|error| {
            error!("Failed to flush CSV writer: {}", error);
            CsvError::Io(error.to_string())
        })
    }
}

/// A builder for configuring a [`CsvRowWriter`].
///
/// # Examples
///
/// ```
/// use csv_store::core::item::ItemWriter;
/// use csv_store::item::csv::csv_writer::CsvRowWriterBuilder;
/// use csv_store::item::csv::row::Row;
///
/// let wtr = CsvRowWriterBuilder::new()
///     .has_headers(true)
///     .delimiter(b';')
///     .from_writer(vec![]);
///
/// wtr.write(&Row::keyed([("city", "Boston"), ("pop", "4628910")])).unwrap();
/// wtr.write(&Row::keyed([("pop", "42695"), ("city", "Concord")])).unwrap();
///
/// let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "city;pop\nBoston;4628910\nConcord;42695\n");
/// ```
#[derive(Default)]
pub struct CsvRowWriterBuilder {
    options: CsvOptions,
    existing_header: Option<Vec<String>>,
}

impl CsvRowWriterBuilder {
    pub fn new() -> CsvRowWriterBuilder {
        Self::from_options(CsvOptions::DEFAULT)
    }

    pub fn from_options(options: CsvOptions) -> CsvRowWriterBuilder {
        CsvRowWriterBuilder {
            options,
            existing_header: None,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> CsvRowWriterBuilder {
        self.options.delimiter = delimiter;
        self
    }

    pub fn enclosure(mut self, enclosure: u8) -> CsvRowWriterBuilder {
        self.options.enclosure = enclosure;
        self
    }

    pub fn escape(mut self, escape: u8) -> CsvRowWriterBuilder {
        self.options.escape = escape;
        self
    }

    pub fn has_headers(mut self, yes: bool) -> CsvRowWriterBuilder {
        self.options.header = yes;
        self
    }

    /// Header already present in the destination: no header line is written
    /// and keyed rows are aligned to `names`. Implies headers are enabled.
    pub fn existing_header(mut self, names: Vec<String>) -> CsvRowWriterBuilder {
        self.options.header = true;
        self.existing_header = Some(names);
        self
    }

    /// Creates (or truncates) the file at `path`.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> CsvResult<CsvRowWriter<File>> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| {
            error!("Failed to create CSV file {}: {}", path.display(), e);
            CsvError::file(path, e)
        })?;

        Ok(self.from_writer(file))
    }

    pub fn from_writer<W: Write>(self, wtr: W) -> CsvRowWriter<W> {
        // with an escape in play fields are quoted by `escape_field`
        let quote_style = match self.options.parser_escape() {
            Some(_) => QuoteStyle::Never,
            None => QuoteStyle::Necessary,
        };
        let wtr = WriterBuilder::new()
            .delimiter(self.options.delimiter)
            .quote(self.options.enclosure)
            .double_quote(true)
            .quote_style(quote_style)
            .has_headers(false)
            .flexible(true)
            .from_writer(wtr);

        CsvRowWriter {
            wrapper: RefCell::new(wtr),
            options: self.options,
            has_headers: self.options.header,
            header: RefCell::new(self.existing_header),
            written: Cell::new(0),
        }
    }
}

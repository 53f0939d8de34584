use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::Path,
};

use fs2::FileExt;
use log::{debug, error, info};

use crate::{
    core::item::{ItemReader, ItemWriter},
    error::{CsvError, CsvResult},
    item::csv::{
        csv_reader::RowReader,
        csv_writer::CsvRowWriterBuilder,
        detector,
        options::{self, CsvOptions, OptionsPatch},
        row::Row,
    },
};

/// Entry point for reading, saving and appending CSV files.
///
/// A store carries a snapshot of the process-wide defaults taken when it was
/// created. Every operation takes its own [`OptionsPatch`] which is layered on
/// top of that snapshot for the duration of the call only:
/// defaults → store → call site.
///
/// # Examples
///
/// ```
/// use csv_store::item::csv::csv_store::CsvStore;
/// use csv_store::item::csv::options::OptionsPatch;
/// use csv_store::item::csv::row::Row;
///
/// let dir = std::env::temp_dir().join("csv_store_doc_store");
/// std::fs::create_dir_all(&dir).unwrap();
/// let path = dir.join("people.csv");
///
/// let store = CsvStore::new().with_options(&OptionsPatch::new().delimiter(b';'));
/// store
///     .save(&path, &OptionsPatch::new(), vec![
///         Row::keyed([("first_name", "Wait"), ("last_name", "Blampy")]),
///     ])
///     .unwrap();
///
/// let rows = store.open(&path, &OptionsPatch::new()).unwrap();
/// for row in rows {
///     assert_eq!(row.unwrap().get("last_name"), Some("Blampy"));
/// }
/// # std::fs::remove_dir_all(&dir).unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvStore {
    options: CsvOptions,
}

impl Default for CsvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvStore {
    /// Creates a store from the current process-wide defaults.
    pub fn new() -> Self {
        Self {
            options: options::defaults(),
        }
    }

    /// Creates a store from a complete option set, ignoring the defaults.
    pub fn from_options(options: CsvOptions) -> Self {
        Self { options }
    }

    /// Returns a new store with `patch` merged over this one's options.
    pub fn with_options(&self, patch: &OptionsPatch) -> Self {
        Self {
            options: self.options.merge(patch),
        }
    }

    /// Options snapshot of this store.
    pub fn options(&self) -> CsvOptions {
        self.options
    }

    /// Options in effect for a call made with `patch`.
    pub fn effective(&self, patch: &OptionsPatch) -> CsvOptions {
        self.options.merge(patch)
    }

    /// Guesses the delimiter of a file. See [`detector::detect_delimiter`].
    pub fn detect_delimiter<P: AsRef<Path>>(path: P) -> CsvResult<u8> {
        detector::detect_delimiter(path)
    }

    /// Opens a lazy row stream over `path`.
    ///
    /// # Errors
    ///
    /// [`CsvError::File`] if the path does not exist.
    pub fn open<P: AsRef<Path>>(
        &self,
        path: P,
        patch: &OptionsPatch,
    ) -> CsvResult<RowReader<File>> {
        RowReader::open(path, self.effective(patch))
    }

    /// Reads the whole file and returns its number of data rows.
    pub fn count<P: AsRef<Path>>(&self, path: P, patch: &OptionsPatch) -> CsvResult<usize> {
        let mut count = 0;
        for row in self.open(path, patch)? {
            row?;
            count += 1;
        }
        Ok(count)
    }

    /// Writes `rows` to `path`, replacing its content.
    ///
    /// With headers enabled the header line comes from the first row's field
    /// names; an empty `rows` leaves an empty file. The file is closed on
    /// every path out, and a failed write leaves whatever was already flushed.
    pub fn save<P, I>(&self, path: P, patch: &OptionsPatch, rows: I) -> CsvResult<&Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = Row>,
    {
        let path = path.as_ref();
        let writer = CsvRowWriterBuilder::from_options(self.effective(patch)).from_path(path)?;

        for row in rows {
            writer.write(&row)?;
        }
        writer.flush()?;

        info!("Saved {} rows to {}", writer.written(), path.display());
        Ok(self)
    }

    /// Appends one row to `path` under an exclusive advisory lock and returns
    /// a fresh stream over the updated file.
    ///
    /// The file is created if missing. With headers enabled a header line
    /// derived from `row` is written first when the file holds no data rows;
    /// otherwise a keyed `row` is written in the order of the existing header.
    /// A last line lacking its terminator is terminated before the new row.
    ///
    /// The lock is attempted once; if another holder has it the call fails
    /// with [`CsvError::Lock`] before anything is written. The file is opened
    /// (and so created when missing) before locking, so a lock failure on a
    /// missing path can leave an empty file behind. Locks are advisory and
    /// only exclude other cooperating writers; readers are not blocked.
    pub fn append<P: AsRef<Path>>(
        &self,
        path: P,
        row: &Row,
        patch: &OptionsPatch,
    ) -> CsvResult<RowReader<File>> {
        let path = path.as_ref();
        let options = self.effective(patch);

        {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .map_err(|e| {
                    error!("Failed to open CSV file {} for append: {}", path.display(), e);
                    CsvError::file(path, e)
                })?;

            let _lock = ExclusiveLock::acquire(&file, path)?;

            terminate_last_line(&file, path)?;

            let mut builder = CsvRowWriterBuilder::from_options(options);
            let mut needs_header = false;
            if options.header {
                let existing = RowReader::open(path, options)?;
                let mut count = 0;
                while existing.read()?.is_some() {
                    count += 1;
                }
                match existing.header() {
                    Some(names) if count > 0 => builder = builder.existing_header(names),
                    _ => needs_header = true,
                }
            }

            let writer = builder.has_headers(options.header).from_writer(&file);
            writer.write(row)?;
            writer.flush()?;

            debug!(
                "Appended row to {} (header written: {})",
                path.display(),
                needs_header
            );
        }

        self.open(path, patch)
    }
}

/// Writes a line terminator if the file is non-empty and does not end with one.
fn terminate_last_line(mut file: &File, path: &Path) -> CsvResult<()> {
    let io_error = |e: io::Error| {
        error!("Failed to inspect end of {}: {}", path.display(), e);
        CsvError::Io(format!("{}: {}", path.display(), e))
    };

    let mut reader = File::open(path).map_err(|e| CsvError::file(path, e))?;
    if reader.metadata().map_err(io_error)?.len() == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    reader.seek(SeekFrom::End(-1)).map_err(io_error)?;
    reader.read_exact(&mut last).map_err(io_error)?;
    if last[0] != b'\n' && last[0] != b'\r' {
        debug!("Terminating unfinished last line of {}", path.display());
        file.write_all(b"\n").map_err(io_error)?;
    }
    Ok(())
}

/// Exclusive advisory lock held on an open file until dropped.
struct ExclusiveLock<'a> {
    file: &'a File,
}

impl<'a> ExclusiveLock<'a> {
    /// Single non-blocking attempt.
    fn acquire(file: &'a File, path: &Path) -> CsvResult<Self> {
        file.try_lock_exclusive().map_err(|err| {
            error!("Failed to lock {}: {}", path.display(), err);
            CsvError::Lock(format!("{}: {}", path.display(), lock_error_message(&err)))
        })?;
        Ok(ExclusiveLock { file })
    }
}

impl Drop for ExclusiveLock<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(self.file);
    }
}

fn lock_error_message(err: &io::Error) -> String {
    if err.kind() == fs2::lock_contended_error().kind() {
        "already locked by another holder".to_string()
    } else {
        err.to_string()
    }
}

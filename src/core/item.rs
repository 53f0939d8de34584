use crate::error::CsvError;

/// Result of a single pull: `Ok(None)` once the source is exhausted.
pub type ItemReaderResult<R> = Result<Option<R>, CsvError>;

/// A pull-based source producing one item per call.
pub trait ItemReader<R> {
    fn read(&self) -> ItemReaderResult<R>;
}

/// A sink accepting one item per call.
pub trait ItemWriter<W> {
    fn write(&self, item: &W) -> Result<(), CsvError>;
    fn flush(&self) -> Result<(), CsvError>;
}

use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use csv::ReaderBuilder;
use log::{debug, error};

use crate::{
    error::{CsvError, CsvResult},
    item::csv::options::CsvOptions,
};

/// Delimiters tried by [`detect_delimiter`], highest priority first.
pub const CANDIDATES: [u8; 4] = [b';', b',', b'\t', b'|'];

/// Guesses the delimiter of the file at `path` from its first line.
///
/// Every candidate in [`CANDIDATES`] splits the line; the one producing the
/// most fields wins and ties go to the earlier candidate. An empty file yields
/// `;`.
///
/// # Examples
///
/// ```no_run
/// use csv_store::item::csv::detector::detect_delimiter;
///
/// let delimiter = detect_delimiter("export.csv").unwrap();
/// println!("delimiter: {}", delimiter as char);
/// ```
pub fn detect_delimiter<P: AsRef<Path>>(path: P) -> CsvResult<u8> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        error!("Failed to open CSV file {}: {}", path.display(), e);
        CsvError::file(path, e)
    })?;

    let delimiter = detect_delimiter_from_reader(file)?;
    debug!(
        "Detected delimiter {:?} for {}",
        delimiter as char,
        path.display()
    );
    Ok(delimiter)
}

/// Same as [`detect_delimiter`], reading the first line from any reader.
pub fn detect_delimiter_from_reader<R: Read>(rdr: R) -> CsvResult<u8> {
    let mut first_line = Vec::new();
    BufReader::new(rdr)
        .read_until(b'\n', &mut first_line)
        .map_err(|error| CsvError::Io(error.to_string()))?;

    let mut best = CANDIDATES[0];
    let mut best_count = 0;
    for candidate in CANDIDATES {
        let count = count_fields(&first_line, candidate);
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }

    Ok(best)
}

/// Number of fields in `line` when split with `delimiter`; 0 for an empty line.
fn count_fields(line: &[u8], delimiter: u8) -> usize {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .quote(CsvOptions::DEFAULT.enclosure)
        .has_headers(false)
        .flexible(true)
        .from_reader(line);

    let mut record = csv::ByteRecord::new();
    match rdr.read_byte_record(&mut record) {
        Ok(true) => record.len(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{count_fields, detect_delimiter_from_reader};

    #[test]
    fn single_candidate_line() -> Result<(), Box<dyn Error>> {
        assert_eq!(detect_delimiter_from_reader("a;b;c".as_bytes())?, b';');
        assert_eq!(detect_delimiter_from_reader("a\tb\tc\n".as_bytes())?, b'\t');
        assert_eq!(detect_delimiter_from_reader("a|b".as_bytes())?, b'|');
        Ok(())
    }

    #[test]
    fn most_fields_wins() -> Result<(), Box<dyn Error>> {
        assert_eq!(detect_delimiter_from_reader("a,b,c,d;e".as_bytes())?, b',');
        assert_eq!(detect_delimiter_from_reader("a;b,c;d|e".as_bytes())?, b';');
        Ok(())
    }

    #[test]
    fn ties_go_to_higher_priority() -> Result<(), Box<dyn Error>> {
        assert_eq!(detect_delimiter_from_reader("a,b;c".as_bytes())?, b';');
        assert_eq!(detect_delimiter_from_reader("a|b\tc".as_bytes())?, b'\t');
        assert_eq!(detect_delimiter_from_reader("plain".as_bytes())?, b';');
        Ok(())
    }

    #[test]
    fn empty_input_defaults_to_semicolon() -> Result<(), Box<dyn Error>> {
        assert_eq!(detect_delimiter_from_reader("".as_bytes())?, b';');
        Ok(())
    }

    #[test]
    fn only_first_line_counts() -> Result<(), Box<dyn Error>> {
        assert_eq!(
            detect_delimiter_from_reader("a;b\nc,d,e,f,g\n".as_bytes())?,
            b';'
        );
        Ok(())
    }

    #[test]
    fn quoted_delimiters_are_not_counted() {
        assert_eq!(count_fields(b"\"a,b,c\";d\n", b','), 1);
        assert_eq!(count_fields(b"\"a,b,c\";d\n", b';'), 2);
        assert_eq!(count_fields(b"", b','), 0);
    }
}

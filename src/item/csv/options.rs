use std::sync::{PoisonError, RwLock};

use log::debug;
use serde::{Deserialize, Serialize};

/// The four settings controlling how a CSV file is parsed and written.
///
/// A complete option set always has a value for every key. Partial updates
/// are expressed with an [`OptionsPatch`] and applied with [`CsvOptions::merge`].
///
/// # Examples
///
/// ```
/// use csv_store::item::csv::options::{CsvOptions, OptionsPatch};
///
/// let options = CsvOptions::DEFAULT.merge(&OptionsPatch::new().delimiter(b';'));
///
/// assert_eq!(options.delimiter, b';');
/// assert_eq!(options.enclosure, b'"');
/// assert!(options.header);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field separator (default: `,`)
    pub delimiter: u8,
    /// Quote character wrapping fields that need it (default: `"`)
    pub enclosure: u8,
    /// Escape character for the enclosure inside a quoted field (default: `\`)
    pub escape: u8,
    /// Whether the first record holds field names (default: true)
    pub header: bool,
}

impl CsvOptions {
    pub const DEFAULT: CsvOptions = CsvOptions {
        delimiter: b',',
        enclosure: b'"',
        escape: b'\\',
        header: true,
    };

    /// Returns a copy of `self` with every key set in `patch` overridden.
    pub fn merge(&self, patch: &OptionsPatch) -> CsvOptions {
        CsvOptions {
            delimiter: patch.delimiter.unwrap_or(self.delimiter),
            enclosure: patch.enclosure.unwrap_or(self.enclosure),
            escape: patch.escape.unwrap_or(self.escape),
            header: patch.header.unwrap_or(self.header),
        }
    }

    /// Escape byte handed to the csv parser. An escape equal to the
    /// enclosure means doubled quotes, which the parser handles natively.
    pub(crate) fn parser_escape(&self) -> Option<u8> {
        if self.escape == self.enclosure {
            None
        } else {
            Some(self.escape)
        }
    }
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions::DEFAULT
    }
}

/// A partial option set: only the keys that are `Some` override.
///
/// # Examples
///
/// ```
/// use csv_store::item::csv::options::OptionsPatch;
///
/// let patch = OptionsPatch::new().delimiter(b'|').header(false);
///
/// assert_eq!(patch.delimiter, Some(b'|'));
/// assert_eq!(patch.enclosure, None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsPatch {
    pub delimiter: Option<u8>,
    pub enclosure: Option<u8>,
    pub escape: Option<u8>,
    pub header: Option<bool>,
}

impl OptionsPatch {
    /// Creates an empty patch that overrides nothing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn enclosure(mut self, enclosure: u8) -> Self {
        self.enclosure = Some(enclosure);
        self
    }

    pub fn escape(mut self, escape: u8) -> Self {
        self.escape = Some(escape);
        self
    }

    pub fn header(mut self, yes: bool) -> Self {
        self.header = Some(yes);
        self
    }

    /// Returns true when the patch overrides no key.
    pub fn is_empty(&self) -> bool {
        self.delimiter.is_none()
            && self.enclosure.is_none()
            && self.escape.is_none()
            && self.header.is_none()
    }
}

impl From<CsvOptions> for OptionsPatch {
    fn from(options: CsvOptions) -> Self {
        OptionsPatch {
            delimiter: Some(options.delimiter),
            enclosure: Some(options.enclosure),
            escape: Some(options.escape),
            header: Some(options.header),
        }
    }
}

static DEFAULTS: RwLock<CsvOptions> = RwLock::new(CsvOptions::DEFAULT);

/// Snapshot of the process-wide default options.
pub fn defaults() -> CsvOptions {
    *DEFAULTS.read().unwrap_or_else(PoisonError::into_inner)
}

/// Merges `patch` into the process-wide defaults.
///
/// Only stores created afterwards see the change; existing stores keep the
/// snapshot they took at construction.
pub fn set_defaults(patch: &OptionsPatch) {
    let mut current = DEFAULTS.write().unwrap_or_else(PoisonError::into_inner);
    *current = current.merge(patch);
    debug!("CSV defaults updated: {:?}", *current);
}

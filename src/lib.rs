#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # CSV Store

 Lazily streamed CSV files: rows are read one record at a time without loading
 the file into memory, optionally keyed by the header line, and written back or
 appended with consistent header and delimiter handling.

 ## Core Concepts

- **Row:** one logical CSV record, either positional (`Vec<String>`) or keyed by
  the header's field names. Values are always text.
- **RowReader:** a forward-only, single-use stream of rows over one file handle.
  The handle is opened on the first pull and released when the stream ends or is
  dropped.
- **CsvRowWriter:** writes rows as CSV lines, deriving the header from the first row.
- **CsvStore:** `open`, `save`, `append` and `count` on paths, plus delimiter
  detection. `append` takes an exclusive advisory lock on the file.
- **Options:** delimiter, enclosure, escape and header flag, layered as
  process defaults → store → call site.

 ## Getting Started

```rust
# use csv_store::{
#     error::CsvError,
#     item::csv::{csv_store::CsvStore, options::OptionsPatch, row::Row},
# };
# use std::env::temp_dir;
fn main() -> Result<(), CsvError> {
    let path = temp_dir().join("csv_store_getting_started.csv");
    let store = CsvStore::new();

    store.save(&path, &OptionsPatch::new(), vec![
        Row::keyed([("year", "1948"), ("make", "Porsche")]),
        Row::keyed([("year", "1995"), ("make", "Peugeot")]),
    ])?;

    let rows = store.append(&path, &Row::keyed([("year", "2021"), ("make", "Mazda")]), &OptionsPatch::new())?;

    let makes = rows
        .map(|row| row.map(|row| row.get("make").unwrap_or_default().to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(makes, vec!["Porsche", "Peugeot", "Mazda"]);

    # std::fs::remove_file(&path).ok();
    Ok(())
}
```

 ## Concurrency

 Nothing here spawns threads. Readers never lock; concurrent `append` calls on
 the same path serialize through the advisory lock, and a contended lock fails
 immediately with [`CsvError::Lock`]. Advisory locks only exclude cooperating
 processes and their strength varies by platform and filesystem.
 */

/// Core reader and writer traits
pub mod core;

/// Error types for CSV operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// CSV readers, writers and the file store
pub mod item;

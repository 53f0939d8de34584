/// This module provides the lazy CSV row reader, writer and store.
pub mod csv;

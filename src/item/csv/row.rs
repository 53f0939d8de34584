use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};

/// Field name to value mapping that keeps insertion order.
///
/// Names are unique: inserting an existing name replaces its value in place.
///
/// # Examples
///
/// ```
/// use csv_store::item::csv::row::KeyedRow;
///
/// let row: KeyedRow = [("id", "1"), ("name", "Alice"), ("id", "2")]
///     .into_iter()
///     .collect();
///
/// assert_eq!(row.names().collect::<Vec<_>>(), vec!["id", "name"]);
/// assert_eq!(row.get("id"), Some("2"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedRow {
    entries: Vec<(String, String)>,
}

impl KeyedRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, keeping the position of an existing name.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeyedRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = KeyedRow::new();
        for (name, value) in iter {
            row.insert(name, value);
        }
        row
    }
}

impl IntoIterator for KeyedRow {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// One logical CSV record.
///
/// Streams opened with headers yield [`Row::Keyed`], streams without headers
/// yield [`Row::Positional`]. Values are always text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Positional(Vec<String>),
    Keyed(KeyedRow),
}

impl Row {
    /// Builds a positional row from any list of text fields.
    pub fn positional<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Row::Positional(fields.into_iter().map(Into::into).collect())
    }

    /// Builds a keyed row from `(name, value)` pairs.
    pub fn keyed<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Row::Keyed(pairs.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Row::Positional(fields) => fields.len(),
            Row::Keyed(row) => row.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names used for a header line: the keys of a keyed row, or the column
    /// indices (`"0"`, `"1"`, ...) of a positional one.
    pub fn field_names(&self) -> Vec<String> {
        match self {
            Row::Positional(fields) => (0..fields.len()).map(|i| i.to_string()).collect(),
            Row::Keyed(row) => row.names().map(str::to_owned).collect(),
        }
    }

    /// Values in row order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Row::Positional(fields) => fields.iter().map(String::as_str).collect(),
            Row::Keyed(row) => row.values().collect(),
        }
    }

    /// Value of the named field; positional rows are addressed by index.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            Row::Positional(fields) => name
                .parse::<usize>()
                .ok()
                .and_then(|index| fields.get(index))
                .map(String::as_str),
            Row::Keyed(row) => row.get(name),
        }
    }

    pub fn as_keyed(&self) -> Option<&KeyedRow> {
        match self {
            Row::Keyed(row) => Some(row),
            Row::Positional(_) => None,
        }
    }

    pub fn as_positional(&self) -> Option<&[String]> {
        match self {
            Row::Positional(fields) => Some(fields),
            Row::Keyed(_) => None,
        }
    }
}

impl Serialize for KeyedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Row::Positional(fields) => {
                let mut seq = serializer.serialize_seq(Some(fields.len()))?;
                for field in fields {
                    seq.serialize_element(field)?;
                }
                seq.end()
            }
            Row::Keyed(row) => row.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{KeyedRow, Row};

    #[test]
    fn keyed_row_replaces_duplicate_names_in_place() {
        let mut row = KeyedRow::new();
        row.insert("a", "1");
        row.insert("b", "2");
        row.insert("a", "3");

        assert_eq!(row.len(), 2);
        assert_eq!(row.iter().collect::<Vec<_>>(), vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn positional_field_names_are_indices() {
        let row = Row::positional(["x", "y", "z"]);

        assert_eq!(row.field_names(), vec!["0", "1", "2"]);
        assert_eq!(row.get("1"), Some("y"));
        assert_eq!(row.get("name"), None);
        assert!(row.as_keyed().is_none());
    }

    #[test]
    fn keyed_accessors() {
        let row = Row::keyed([("first_name", "Wait"), ("last_name", "Blampy")]);

        assert_eq!(row.field_names(), vec!["first_name", "last_name"]);
        assert_eq!(row.values(), vec!["Wait", "Blampy"]);
        assert_eq!(row.get("last_name"), Some("Blampy"));
        assert!(row.as_positional().is_none());
        assert!(!row.is_empty());
    }

    #[test]
    fn rows_serialize_to_map_or_sequence() -> Result<(), Box<dyn Error>> {
        let keyed = Row::keyed([("b", "2"), ("a", "1")]);
        let positional = Row::positional(["1", "2"]);

        assert_eq!(serde_json::to_string(&keyed)?, r#"{"b":"2","a":"1"}"#);
        assert_eq!(serde_json::to_string(&positional)?, r#"["1","2"]"#);
        Ok(())
    }
}

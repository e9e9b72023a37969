//! Scalar encoding of detail values in read query results.
//!
//! A read query returns one row per contact and one column per detail. Everything a detail
//! needs travels inside that single string, nested with four separator characters taken
//! from the ASCII information separator range:
//!
//! ```text
//! column  := record (DETAIL record)*          one record per detail instance
//! record  := cell (FIELD cell)*                one cell per field
//! cell    := tagged (LIST tagged)*             one entry per value of the field
//! tagged  := value [GRAPH graph]               the graph the value was read from
//! ```
//!
//! No escaping is performed: values containing one of the separators cannot be encoded,
//! which is why the write path refuses to store them (see [`contains_separator`]). The
//! empty string is likewise reserved for "no value", so the write path never stores empty
//! text and every encoded record carries at least one value.

/// Separates a value from the IRI of the graph holding it.
pub const GRAPH_SEPARATOR: char = '\u{1c}';
/// Separates the values of a multi-valued field.
pub const LIST_SEPARATOR: char = '\u{1d}';
/// Separates the instances of a repeatable detail.
pub const DETAIL_SEPARATOR: char = '\u{1e}';
/// Separates the fields of one detail instance.
pub const FIELD_SEPARATOR: char = '\u{1f}';

const SEPARATORS: [char; 4] = [
    GRAPH_SEPARATOR,
    LIST_SEPARATOR,
    DETAIL_SEPARATOR,
    FIELD_SEPARATOR,
];

/// Whether `text` contains a character reserved by the encoding.
pub fn contains_separator(text: &str) -> bool {
    text.contains(SEPARATORS)
}

/// A value together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tagged {
    /// The value text
    pub value: String,
    /// Graph IRI, `Some("")` for the default graph, `None` when provenance was not queried
    pub graph: Option<String>,
}

impl Tagged {
    /// A value without provenance.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            graph: None,
        }
    }

    /// A value read from `graph`.
    pub fn in_graph(value: impl Into<String>, graph: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            graph: Some(graph.into()),
        }
    }
}

/// One detail instance: the cells of its fields in column order.
pub type Record = Vec<Vec<Tagged>>;

/// Split `text` at the first graph separator.
pub fn split_graph(text: &str) -> (&str, Option<&str>) {
    match text.split_once(GRAPH_SEPARATOR) {
        Some((value, graph)) => (value, Some(graph)),
        None => (text, None),
    }
}

/// Encode one tagged value.
pub fn encode_tagged(tagged: &Tagged) -> String {
    match &tagged.graph {
        Some(graph) => format!("{}{GRAPH_SEPARATOR}{graph}", tagged.value),
        None => tagged.value.clone(),
    }
}

/// Decode one tagged value.
pub fn decode_tagged(text: &str) -> Tagged {
    let (value, graph) = split_graph(text);
    Tagged {
        value: value.to_string(),
        graph: graph.map(str::to_string),
    }
}

/// Encode the values of one field.
pub fn encode_cell(cell: &[Tagged]) -> String {
    join(cell.iter().map(encode_tagged), LIST_SEPARATOR)
}

/// Decode the values of one field; the empty string holds no value.
pub fn decode_cell(text: &str) -> Vec<Tagged> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split(LIST_SEPARATOR).map(decode_tagged).collect()
}

/// Decode the values of one field, dropping empty and repeated entries.
pub fn decode_cell_trimmed(text: &str) -> Vec<Tagged> {
    let mut cell: Vec<Tagged> = Vec::new();

    for tagged in text
        .split(LIST_SEPARATOR)
        .filter(|item| !item.is_empty())
        .map(decode_tagged)
    {
        if !cell.contains(&tagged) {
            cell.push(tagged);
        }
    }

    cell
}

/// Encode one detail instance.
pub fn encode_record(record: &[Vec<Tagged>]) -> String {
    join(record.iter().map(|cell| encode_cell(cell)), FIELD_SEPARATOR)
}

/// Split one detail instance into the raw text of its cells.
pub fn split_record(text: &str) -> Vec<&str> {
    text.split(FIELD_SEPARATOR).collect()
}

/// Decode one detail instance.
pub fn decode_record(text: &str) -> Record {
    split_record(text).into_iter().map(decode_cell).collect()
}

/// Encode every instance of a detail into one column.
pub fn encode_column(records: &[Record]) -> String {
    join(records.iter().map(|record| encode_record(record)), DETAIL_SEPARATOR)
}

/// Split a column into the raw text of its records; an empty column has none.
pub fn split_column(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split(DETAIL_SEPARATOR).collect()
}

/// Decode every instance of a detail from one column.
pub fn decode_column(text: &str) -> Vec<Record> {
    split_column(text).into_iter().map(decode_record).collect()
}

fn join(parts: impl Iterator<Item = String>, separator: char) -> String {
    let mut out = String::new();
    for (index, part) in parts.enumerate() {
        if index > 0 {
            out.push(separator);
        }
        out.push_str(&part);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_graph() {
        assert_eq!(split_graph("Ada"), ("Ada", None));
        assert_eq!(split_graph("Ada\u{1c}urn:g"), ("Ada", Some("urn:g")));
        assert_eq!(split_graph("Ada\u{1c}"), ("Ada", Some("")));
    }

    #[test]
    fn test_decode_nested_column() {
        let column = "a\u{1c}g1\u{1d}b\u{1f}c\u{1e}d\u{1f}";
        let records = decode_column(column);

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            vec![
                vec![Tagged::in_graph("a", "g1"), Tagged::new("b")],
                vec![Tagged::new("c")],
            ]
        );
        assert_eq!(records[1], vec![vec![Tagged::new("d")], vec![]]);
    }

    #[test]
    fn test_empty_column_has_no_records() {
        assert!(decode_column("").is_empty());
        assert!(decode_cell("").is_empty());
    }

    #[test]
    fn test_trimmed_cell_drops_empty_and_duplicates() {
        let cell = decode_cell_trimmed("a\u{1d}\u{1d}a\u{1d}b");
        assert_eq!(cell, vec![Tagged::new("a"), Tagged::new("b")]);
    }

    #[test]
    fn test_contains_separator() {
        assert!(!contains_separator("plain text"));
        assert!(contains_separator("bad\u{1f}value"));
    }

    #[test]
    fn test_empty_text_reads_as_no_value() {
        assert_eq!(decode_column("\u{1f}x"), vec![vec![vec![], vec![Tagged::new("x")]]]);
        assert!(decode_column(&encode_column(&[vec![vec![Tagged::new("")]]])).is_empty());
    }

    #[test]
    fn test_record_with_empty_fields_round_trips() {
        let records = vec![
            vec![vec![], vec![Tagged::new("x")], vec![]],
            vec![vec![Tagged::in_graph("y", "")]],
        ];
        assert_eq!(decode_column(&encode_column(&records)), records);
    }

    fn text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 :/@.-]{1,12}"
    }

    fn tagged() -> impl Strategy<Value = Tagged> {
        (text(), proptest::option::of("[a-z:/0-9-]{0,12}"))
            .prop_map(|(value, graph)| Tagged { value, graph })
    }

    /// A detail instance as the store returns it: some cells may be empty, one is not.
    fn record() -> impl Strategy<Value = Record> {
        (
            proptest::collection::vec(proptest::collection::vec(tagged(), 0..4), 1..5),
            any::<prop::sample::Index>(),
            tagged(),
        )
            .prop_map(|(mut cells, index, value)| {
                let at = index.index(cells.len());
                cells[at].insert(0, value);
                cells
            })
    }

    fn column() -> impl Strategy<Value = Vec<Record>> {
        proptest::collection::vec(record(), 0..4)
    }

    proptest! {
        #[test]
        fn prop_column_round_trip(records in column()) {
            let encoded = encode_column(&records);
            prop_assert_eq!(decode_column(&encoded), records);
        }

        #[test]
        fn prop_encoded_values_never_leak_separators(values in proptest::collection::vec(text(), 1..6)) {
            let cell: Vec<Tagged> = values.iter().map(Tagged::new).collect();
            let decoded = decode_cell(&encode_cell(&cell));
            for (tagged, value) in decoded.iter().zip(&values) {
                prop_assert_eq!(&tagged.value, value);
                prop_assert!(!contains_separator(&tagged.value));
            }
        }
    }
}

//! Submitted form fields, kept in submission order.

use percent_encoding::percent_decode;

/// Form fields of a webhook request.
///
/// Names and values are kept as the raw decoded bytes, since those bytes are
/// what the platform signs, whether or not they are valid UTF-8.
///
/// Pairs are stored in the order they were submitted so that repeated names
/// keep their value order. Sorting by name is an explicit step
/// ([`FormFields::sorted_names`]) rather than a property of the container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pairs: Vec<(Vec<u8>, Vec<u8>)>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes an `application/x-www-form-urlencoded` body.
    ///
    /// `+` decodes to a space and percent escapes decode to the escaped byte.
    /// Empty segments are skipped; a segment without `=` has an empty value.
    pub fn parse(body: &[u8]) -> Self {
        let pairs = body
            .split(|b| *b == b'&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let mut parts = segment.splitn(2, |b| *b == b'=');
                let name = parts.next().unwrap_or_default();
                let value = parts.next().unwrap_or_default();
                (decode_component(name), decode_component(value))
            })
            .collect();

        Self { pairs }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Vec<u8>>,
        V: Into<Vec<u8>>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// All values submitted under `name`, concatenated with no separator.
    ///
    /// Empty when the name was not submitted.
    pub fn joined_bytes(&self, name: &[u8]) -> Vec<u8> {
        self.pairs
            .iter()
            .filter(|(k, _)| k.as_slice() == name)
            .flat_map(|(_, v)| v.iter().copied())
            .collect()
    }

    /// Like [`FormFields::joined_bytes`], with invalid UTF-8 replaced by U+FFFD.
    pub fn joined(&self, name: &str) -> String {
        String::from_utf8_lossy(&self.joined_bytes(name.as_bytes())).into_owned()
    }

    /// Distinct field names in ascending byte order.
    pub fn sorted_names(&self) -> Vec<&[u8]> {
        let mut names: Vec<&[u8]> = self.pairs.iter().map(|(k, _)| k.as_slice()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn decode_component(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|b| if *b == b'+' { b' ' } else { *b })
        .collect();
    percent_decode(&spaced).collect()
}

use std::collections::BTreeMap;

/// Point-in-time copy of the accumulator table, keyed by user ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    counts: BTreeMap<u64, u64>,
}

impl Snapshot {
    #[cfg(test)]
    pub fn new() -> Self {
        Snapshot::default()
    }

    #[cfg(test)]
    pub fn insert(&mut self, key: u64, value: u64) {
        self.counts.insert(key, value);
    }

    /// Count for `key`; never-observed keys read as zero.
    #[cfg(test)]
    pub fn get(&self, key: u64) -> u64 {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub fn contains(&self, key: u64) -> bool {
        self.counts.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.counts.iter().map(|(key, value)| (*key, *value))
    }

    /// One report line: `ID: <key>, <value>\t` per entry, then a newline.
    pub fn render_line(&self) -> String {
        let mut line: String = self
            .iter()
            .map(|(key, value)| format!("ID: {}, {}\t", key, value))
            .collect();
        line.push('\n');
        line
    }
}

impl FromIterator<(u64, u64)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (u64, u64)>>(iter: I) -> Self {
        Snapshot {
            counts: iter.into_iter().collect(),
        }
    }
}

/// Construction parameters of a [MatchTable](crate::MatchTable).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TableConfig {
    /// Upper bound on installed entries; `None` means unbounded.
    pub max_entries: Option<usize>,
    /// Initial capacity of each per-priority bucket.
    pub bucket_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            max_entries: None,
            bucket_capacity: 4,
        }
    }
}

impl TableConfig {
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn bucket_capacity(mut self, bucket_capacity: usize) -> Self {
        self.bucket_capacity = bucket_capacity;
        self
    }
}

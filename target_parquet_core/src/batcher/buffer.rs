use target_parquet_schema::FlatRecord;

/// Records accumulated for one stream since its last flush.
#[derive(Debug)]
pub struct StreamBuffer {
    records: Vec<FlatRecord>,
}

impl StreamBuffer {
    pub fn new(record: FlatRecord) -> Self {
        Self {
            records: vec![record],
        }
    }

    pub fn push(&mut self, record: FlatRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<FlatRecord> {
        self.records
    }
}

//! Streaming record reader.
//!
//! Wraps `csv::Reader` configured for tenant files: custom delimiter, flexible record
//! lengths, no implicit header handling. Records are produced lazily and the input is read
//! once.

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use std::io::Read;

const BOM: char = '\u{feff}';

/// A data record with its 1-based row number (the header is row 1).
#[derive(Debug, Clone)]
pub struct DataRow {
    pub number: usize,
    pub record: StringRecord,
}

impl DataRow {
    /// Cell at `index`; missing trailing cells read as empty.
    pub fn cell(&self, index: usize) -> &str {
        self.record.get(index).unwrap_or("")
    }
}

pub struct TabularReader<R: Read> {
    records: StringRecordsIntoIter<R>,
}

impl<R: Read> TabularReader<R> {
    pub fn new(input: R, delimiter: u8) -> Self {
        let reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        Self {
            records: reader.into_records(),
        }
    }

    /// Read the header record: fields trimmed, leading byte-order mark removed.
    ///
    /// `Ok(None)` when the input has no records at all.
    pub fn read_header(&mut self) -> Result<Option<Vec<String>>, csv::Error> {
        for record in self.records.by_ref() {
            let record = record?;
            if is_blank(&record) {
                continue;
            }
            let header = record
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    let field = if i == 0 {
                        field.trim_start_matches(BOM)
                    } else {
                        field
                    };
                    field.trim().to_string()
                })
                .collect();
            return Ok(Some(header));
        }
        Ok(None)
    }

    /// Remaining records as numbered data rows. Empty lines produce no record and take no
    /// row number; a record of empty cells (`,` or `;;`) is a data row.
    pub fn rows(self) -> impl Iterator<Item = Result<DataRow, csv::Error>> {
        self.records
            .enumerate()
            .map(|(index, record)| {
                record.map(|record| DataRow {
                    number: index + 2,
                    record,
                })
            })
    }
}

/// A record whose every field is empty after trimming. Only skipped before the header.
fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

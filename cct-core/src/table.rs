use crate::error::TableError;
use crate::rules::engine::collapse_whitespace;
use crate::types::ClauseRecord;
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Column headers, in output order.
pub const HEADER: [&str; 5] = [
    "Sindicato",
    "Convenção",
    "Título da Cláusula",
    "Resumo",
    "Cláusula Completa",
];

/// Ordered set of clause rows ready for export.
///
/// Every field is a single line: newlines and control characters never
/// reach the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClauseTable {
    records: Vec<ClauseRecord>,
}

/// Outcome of merging new rows into a table on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub existing_rows: usize,
    pub new_rows: usize,
    pub total_rows: usize,
    pub backup: Option<PathBuf>,
}

impl ClauseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = ClauseRecord>) -> Self {
        Self {
            records: records.into_iter().map(sanitize_record).collect(),
        }
    }

    pub fn records(&self) -> &[ClauseRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ClauseRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Concatenate, then keep only the last row for each
    /// `(union, period, title)`. Survivors stay in concatenation order.
    pub fn merge(self, new_records: impl IntoIterator<Item = ClauseRecord>) -> Self {
        let combined: Vec<ClauseRecord> = self
            .records
            .into_iter()
            .chain(new_records.into_iter().map(sanitize_record))
            .collect();

        let keep: Vec<bool> = {
            let mut last_index: HashMap<(&str, &str, &str), usize> = HashMap::new();
            for (index, record) in combined.iter().enumerate() {
                last_index.insert(record.key(), index);
            }
            combined
                .iter()
                .enumerate()
                .map(|(index, record)| last_index.get(&record.key()) == Some(&index))
                .collect()
        };

        let records = combined
            .into_iter()
            .zip(keep)
            .filter_map(|(record, kept)| kept.then_some(record))
            .collect();
        Self { records }
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut csv_writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .has_headers(false)
            .from_writer(writer);

        csv_writer.write_record(HEADER)?;
        for record in &self.records {
            csv_writer.write_record(record.fields().map(sanitize_field))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn read_csv<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        if headers != HEADER {
            return Err(TableError::UnexpectedHeader(headers));
        }

        let records = csv_reader
            .records()
            .map(|row| -> Result<ClauseRecord, TableError> {
                let row = row?;
                let field = |i: usize| row.get(i).unwrap_or_default().to_string();
                Ok(ClauseRecord {
                    union_name: field(0),
                    period: field(1),
                    title: field(2),
                    summary: field(3),
                    body: field(4),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_records(records))
    }

    pub fn save(&self, path: &Path) -> Result<(), TableError> {
        self.write_csv(File::create(path)?)
    }

    pub fn load(path: &Path) -> Result<Self, TableError> {
        Self::read_csv(File::open(path)?)
    }

    pub fn to_json(&self) -> Result<String, TableError> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    /// Merge `new_records` into the master table at `path`.
    ///
    /// An existing master is first copied to `<stem>.backup.csv`; a missing
    /// one is created.
    pub fn merge_into_file(
        path: &Path,
        new_records: impl IntoIterator<Item = ClauseRecord>,
    ) -> Result<MergeSummary, TableError> {
        let new_records: Vec<ClauseRecord> = new_records.into_iter().collect();
        let new_rows = new_records.len();

        let (existing, backup) = if path.exists() {
            let existing = Self::load(path)?;
            let backup = backup_path(path);
            std::fs::copy(path, &backup)?;
            tracing::info!(backup = %backup.display(), "backed up master table");
            (existing, Some(backup))
        } else {
            (Self::new(), None)
        };

        let existing_rows = existing.len();
        let merged = existing.merge(new_records);
        merged.save(path)?;

        Ok(MergeSummary {
            existing_rows,
            new_rows,
            total_rows: merged.len(),
            backup,
        })
    }
}

/// `planilha.csv` -> `planilha.backup.csv`
pub fn backup_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    path.with_file_name(format!("{stem}.backup.csv"))
}

/// One line, no control characters, single spaces.
pub fn sanitize_field(field: &str) -> String {
    let cleaned: String = field
        .chars()
        .map(|c| if matches!(c, '\r' | '\n' | '\t') { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();
    collapse_whitespace(&cleaned)
}

fn sanitize_record(record: ClauseRecord) -> ClauseRecord {
    ClauseRecord {
        union_name: sanitize_field(&record.union_name),
        period: sanitize_field(&record.period),
        title: sanitize_field(&record.title),
        summary: sanitize_field(&record.summary),
        body: sanitize_field(&record.body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(union: &str, title: &str, summary: &str) -> ClauseRecord {
        ClauseRecord {
            union_name: union.into(),
            period: "2025-2026".into(),
            title: title.into(),
            summary: summary.into(),
            body: format!("{summary} corpo"),
        }
    }

    #[test]
    fn export_quotes_every_field_and_flattens_lines() {
        let table = ClauseTable::from_records(vec![ClauseRecord {
            body: "linha um\r\nlinha\ndois\u{7}".into(),
            ..record("SIND", "CLÁUSULA PRIMEIRA", "Resumo.")
        }]);
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();

        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("\"Sindicato\",\"Convenção\",\"Título da Cláusula\",\"Resumo\",\"Cláusula Completa\"")
        );
        assert_eq!(
            lines.next(),
            Some("\"SIND\",\"2025-2026\",\"CLÁUSULA PRIMEIRA\",\"Resumo.\",\"linha um linha dois\"")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn merge_keeps_last_occurrence_in_order() {
        let existing = ClauseTable::from_records(vec![
            record("A", "CLÁUSULA PRIMEIRA", "velho"),
            record("A", "CLÁUSULA SEGUNDA", "mantido"),
        ]);
        let merged = existing.merge(vec![
            record("A", "CLÁUSULA PRIMEIRA", "novo"),
            record("B", "CLÁUSULA PRIMEIRA", "outro sindicato"),
        ]);

        let summaries: Vec<&str> = merged.records().iter().map(|r| r.summary.as_str()).collect();
        assert_eq!(summaries, vec!["mantido", "novo", "outro sindicato"]);
    }

    #[test]
    fn merge_dedupes_within_new_records() {
        let merged = ClauseTable::new().merge(vec![
            record("A", "CLÁUSULA PRIMEIRA", "um"),
            record("A", "CLÁUSULA PRIMEIRA", "dois"),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.records()[0].summary, "dois");
    }

    #[test]
    fn csv_reads_back_what_it_writes() {
        let table = ClauseTable::from_records(vec![record("A, B", "CLÁUSULA \"X\"", "Resumo.")]);
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(ClauseTable::read_csv(out.as_slice()).unwrap(), table);
    }

    #[test]
    fn foreign_header_is_rejected() {
        let err = ClauseTable::read_csv("a,b,c\n1,2,3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::UnexpectedHeader(_)));
    }

    #[test]
    fn merge_into_file_backs_up_existing_master() {
        let dir = tempfile::tempdir().unwrap();
        let master = dir.path().join("planilha.csv");

        let first = ClauseTable::merge_into_file(&master, vec![record("A", "CLÁUSULA PRIMEIRA", "velho")]).unwrap();
        assert_eq!(first.backup, None);
        assert_eq!(first.total_rows, 1);

        let second = ClauseTable::merge_into_file(
            &master,
            vec![record("A", "CLÁUSULA PRIMEIRA", "novo"), record("A", "CLÁUSULA SEGUNDA", "extra")],
        )
        .unwrap();
        assert_eq!(second.existing_rows, 1);
        assert_eq!(second.total_rows, 2);
        assert_eq!(second.backup, Some(dir.path().join("planilha.backup.csv")));

        let backup = ClauseTable::load(&dir.path().join("planilha.backup.csv")).unwrap();
        assert_eq!(backup.records()[0].summary, "velho");
        let current = ClauseTable::load(&master).unwrap();
        assert_eq!(current.records()[0].summary, "novo");
    }

    #[test]
    fn json_uses_column_names() {
        let json = ClauseTable::from_records(vec![record("A", "T", "R")]).to_json().unwrap();
        assert!(json.contains("\"Título da Cláusula\": \"T\""));
    }
}

//! Source file discovery and column sampling.
//!
//! The hint generator only sees the header and the first few rows of each
//! column; the bulk load reads the whole file server-side.

use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::{Encoding, UTF_8};

/// Header name plus the sampled values of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSample {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSample {
    pub path: PathBuf,
    pub columns: Vec<ColumnSample>,
    pub rows_sampled: usize,
}

impl FileSample {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

fn decode_field(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        bail!("Failed to decode text with encoding {}", encoding.name());
    }
    Ok(text.into_owned())
}

fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_field(field, encoding))
        .collect()
}

/// `.csv` files directly inside `dir`, sorted by file name.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Reading input directory {dir:?}"))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Listing input directory {dir:?}"))?
            .path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads the header and up to `rows` records of `path`.
///
/// Short records contribute empty strings so every column has the same number
/// of sampled values.
pub fn sample_columns(
    path: &Path,
    rows: usize,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<FileSample> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(BufReader::new(file));
    let headers = reader
        .byte_headers()
        .with_context(|| format!("Reading header of {path:?}"))?
        .clone();
    let names = decode_record(&headers, encoding)
        .with_context(|| format!("Decoding header of {path:?}"))?;
    if names.is_empty() || names.iter().all(|n| n.trim().is_empty()) {
        bail!("{path:?} has no header row");
    }

    let mut columns: Vec<ColumnSample> = names
        .into_iter()
        .map(|name| ColumnSample {
            name: name.trim().to_string(),
            values: Vec::with_capacity(rows),
        })
        .collect();
    let mut record = csv::ByteRecord::new();
    let mut sampled = 0usize;
    while sampled < rows
        && reader
            .read_byte_record(&mut record)
            .with_context(|| format!("Reading row {} of {path:?}", sampled + 2))?
    {
        let values = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {} of {path:?}", sampled + 2))?;
        for (idx, column) in columns.iter_mut().enumerate() {
            column
                .values
                .push(values.get(idx).cloned().unwrap_or_default());
        }
        sampled += 1;
    }

    Ok(FileSample {
        path: path.to_path_buf(),
        columns,
        rows_sampled: sampled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;
    use tempfile::tempdir;

    #[test]
    fn samples_limited_rows_per_column() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("stops.csv");
        fs::write(&path, "id,name\n1,Alpha\n2,Beta\n3,Gamma\n").expect("write csv");

        let sample = sample_columns(&path, 2, b',', UTF_8).expect("sample");
        assert_eq!(sample.rows_sampled, 2);
        assert_eq!(sample.column_names(), vec!["id", "name"]);
        assert_eq!(sample.columns[1].values, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn short_rows_pad_with_empty_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("ragged.csv");
        fs::write(&path, "a,b,c\n1,2\n").expect("write csv");

        let sample = sample_columns(&path, 20, b',', UTF_8).expect("sample");
        assert_eq!(sample.columns[2].values, vec![""]);
    }

    #[test]
    fn decodes_declared_encoding() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("encoded.csv");
        let (encoded, _, _) = WINDOWS_1252.encode("name\nCaf\u{e9}\n");
        fs::write(&path, &encoded).expect("write csv");

        let encoding = resolve_encoding(Some("windows-1252")).expect("encoding");
        let sample = sample_columns(&path, 5, b',', encoding).expect("sample");
        assert_eq!(sample.columns[0].values, vec!["Caf\u{e9}"]);
    }

    #[test]
    fn lists_only_csv_files_sorted() {
        let dir = tempdir().expect("temp dir");
        fs::write(dir.path().join("b.CSV"), "x\n").unwrap();
        fs::write(dir.path().join("a.csv"), "x\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "x\n").unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let files = list_csv_files(dir.path()).expect("list");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.CSV"]);
    }

    #[test]
    fn unknown_encoding_is_an_error() {
        assert!(resolve_encoding(Some("not-a-charset")).is_err());
    }
}

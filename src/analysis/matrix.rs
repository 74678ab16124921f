use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use ndarray::Array2;
use crate::analysis::AnalysisError;
/// How fields are separated on a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Delimiter {
    /// Any run of whitespace separates two fields.
    Whitespace,
    /// Every single space separates two fields; an empty field is a missing value.
    SingleSpace,
}
/// Read a whitespace-delimited numeric matrix (rows x columns).
///
/// Blank lines and `#` comments are skipped, `nan` tokens become NaN. Every data
/// row must have the same number of columns.
pub fn read_matrix(path: &Path) -> Result<Array2<f64>, AnalysisError> {
    read_delimited(path, Delimiter::Whitespace)
}
/// Read a single-space delimited table where an empty field (two adjacent
/// spaces) is a missing value and becomes NaN.
pub fn read_table(path: &Path) -> Result<Array2<f64>, AnalysisError> {
    read_delimited(path, Delimiter::SingleSpace)
}
fn read_delimited(path: &Path, delimiter: Delimiter) -> Result<Array2<f64>, AnalysisError> {
    let file = File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => AnalysisError::FileNotFound(path.to_path_buf()),
        _ => AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let reader = BufReader::new(file);
    let mut values = Vec::new();
    let mut rows = 0usize;
    let mut columns = 0usize;
    for (line_idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let line_no = line_idx + 1;
        let Some(row) = parse_row(&line, delimiter, path, line_no)? else {
            continue;
        };
        if rows == 0 {
            columns = row.len();
        } else if row.len() != columns {
            return Err(AnalysisError::MalformedData {
                path: path.to_path_buf(),
                line: line_no,
                reason: format!("expected {columns} columns, found {}", row.len()),
            });
        }
        values.extend(row);
        rows += 1;
    }
    if rows == 0 {
        return Err(AnalysisError::MalformedData {
            path: path.to_path_buf(),
            line: 0,
            reason: "no numeric rows".into(),
        });
    }
    Array2::from_shape_vec((rows, columns), values).map_err(|e| AnalysisError::MalformedData {
        path: path.to_path_buf(),
        line: 0,
        reason: e.to_string(),
    })
}
fn parse_row(
    line: &str,
    delimiter: Delimiter,
    path: &Path,
    line_no: usize,
) -> Result<Option<Vec<f64>>, AnalysisError> {
    let line = line.split('#').next().unwrap_or_default();
    let fields: Vec<&str> = match delimiter {
        Delimiter::Whitespace => line.split_whitespace().collect(),
        Delimiter::SingleSpace => {
            let line = line.trim_matches(|c: char| matches!(c, ' ' | '\r' | '\n'));
            if line.is_empty() {
                Vec::new()
            } else {
                line.split(' ').map(str::trim).collect()
            }
        }
    };
    if fields.is_empty() {
        return Ok(None);
    }
    fields
        .into_iter()
        .map(|token| {
            parse_value(token).ok_or_else(|| AnalysisError::MalformedData {
                path: path.to_path_buf(),
                line: line_no,
                reason: format!("'{token}' is not a number"),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
fn parse_value(token: &str) -> Option<f64> {
    if token.is_empty() || token.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    token.parse::<f64>().ok()
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }
    #[test]
    fn reads_rows_and_columns() {
        let file = write_temp("1.0 2.0 3.0\n4 5e-1 -6\n");
        let m = read_matrix(file.path()).unwrap();
        assert_eq!(m.dim(), (2, 3));
        assert_eq!(m[[1, 1]], 0.5);
        assert_eq!(m[[1, 2]], -6.0);
    }
    #[test]
    fn nan_tokens_and_comments() {
        let file = write_temp("# header\n1 nan\n\n2 3\n");
        let m = read_matrix(file.path()).unwrap();
        assert_eq!(m.dim(), (2, 2));
        assert!(m[[0, 1]].is_nan());
    }
    #[test]
    fn table_blank_fields_are_missing_values() {
        let file = write_temp("1 2 3\n4  6\n");
        let m = read_table(file.path()).unwrap();
        assert_eq!(m.dim(), (2, 3));
        assert_eq!(m[[1, 0]], 4.0);
        assert!(m[[1, 1]].is_nan());
        assert_eq!(m[[1, 2]], 6.0);
    }
    #[test]
    fn table_ignores_surrounding_spaces() {
        let file = write_temp(" 1 2\r\n3 nan \n");
        let m = read_table(file.path()).unwrap();
        assert_eq!(m.dim(), (2, 2));
        assert!(m[[1, 1]].is_nan());
    }
    #[test]
    fn matrix_keeps_strict_column_count() {
        let file = write_temp("1 2 3\n4  6\n");
        assert!(matches!(
            read_matrix(file.path()),
            Err(AnalysisError::MalformedData { line: 2, .. })
        ));
    }
    #[test]
    fn ragged_rows_are_malformed() {
        let file = write_temp("1 2 3\n4 5\n");
        match read_matrix(file.path()) {
            Err(AnalysisError::MalformedData { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }
    #[test]
    fn non_numeric_tokens_are_malformed() {
        let file = write_temp("1 2\n3 abc\n");
        assert!(matches!(
            read_matrix(file.path()),
            Err(AnalysisError::MalformedData { line: 2, .. })
        ));
    }
    #[test]
    fn empty_file_is_malformed() {
        let file = write_temp("\n# nothing\n");
        assert!(matches!(
            read_matrix(file.path()),
            Err(AnalysisError::MalformedData { .. })
        ));
    }
    #[test]
    fn missing_file_is_not_found() {
        assert!(matches!(
            read_matrix(Path::new("does/not/exist.txt")),
            Err(AnalysisError::FileNotFound(_))
        ));
    }
}

//! Metadata row parsing.
//!
//! Hierarchy and duplicate information arrive as rows of string fields, one
//! row per element. A bad row never aborts ingestion: it is skipped, counted
//! in the returned [`RowReport`] and logged.

use crate::errors::{Result, TimelineError};
use crate::ids::ElementId;

/// Outcome of ingesting a batch of metadata rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowReport {
    pub accepted: usize,
    pub skipped: usize,
}

/// `[element, parent]`.
pub fn parse_parent_row<S: AsRef<str>>(row: &[S]) -> Result<(ElementId, ElementId)> {
    let [element, parent] = row else {
        return Err(TimelineError::MalformedRow {
            expected: 2,
            found: row.len(),
        });
    };
    Ok((
        ElementId::parse(element.as_ref())?,
        ElementId::parse(parent.as_ref())?,
    ))
}

/// `[element, source identity]`. Elements sharing a source identity are
/// duplicates of one another.
pub fn parse_source_row<S: AsRef<str>>(row: &[S]) -> Result<(ElementId, String)> {
    let [element, source] = row else {
        return Err(TimelineError::MalformedRow {
            expected: 2,
            found: row.len(),
        });
    };
    let source = source.as_ref().trim();
    if source.is_empty() {
        return Err(TimelineError::InvalidIdentifier(String::new()));
    }
    Ok((ElementId::parse(element.as_ref())?, source.to_owned()))
}

/// Parses every row with `parse`, keeping the good ones.
pub(crate) fn parse_rows<R, S, T>(
    rows: &[R],
    what: &str,
    parse: impl Fn(&[S]) -> Result<T>,
) -> (Vec<T>, RowReport)
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut report = RowReport::default();
    let mut parsed = Vec::with_capacity(rows.len());
    for (line, row) in rows.iter().enumerate() {
        match parse(row.as_ref()) {
            Ok(value) => {
                parsed.push(value);
                report.accepted += 1;
            }
            Err(err) => {
                report.skipped += 1;
                log::warn!("Skipping {what} row #{line}: {err}");
            }
        }
    }
    if report.skipped > 0 {
        log::warn!(
            "{} of {} {what} rows were skipped",
            report.skipped,
            rows.len()
        );
    }
    (parsed, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_row_needs_two_fields() {
        assert!(matches!(
            parse_parent_row(&["0x1"]),
            Err(TimelineError::MalformedRow { expected: 2, found: 1 })
        ));
        assert_eq!(
            parse_parent_row(&["0x2", "0x1"]).unwrap(),
            (ElementId(2), ElementId(1))
        );
    }

    #[test]
    fn source_row_rejects_blank_identity() {
        assert!(parse_source_row(&["0x2", "  "]).is_err());
    }

    #[test]
    fn parse_rows_counts_skips() {
        let rows = vec![vec!["0x1", "0x2"], vec!["oops", "0x2"], vec!["0x3"]];
        let (parsed, report) = parse_rows(&rows, "parent", parse_parent_row);
        assert_eq!(parsed.len(), 1);
        assert_eq!(report, RowReport { accepted: 1, skipped: 2 });
    }
}

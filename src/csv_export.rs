// CSV serialization of the merged dataset

use crate::config::QuerySettings;
use crate::error::ScrapeError;
use crate::models::MergedRow;
use chrono::NaiveDate;
use csv::{QuoteStyle, Writer, WriterBuilder};
use indexmap::IndexSet;

/// Union of all row keys, in first-seen order scanning rows front to back.
pub fn header_for(rows: &[MergedRow]) -> Vec<&str> {
    let mut header = IndexSet::new();
    for row in rows {
        header.extend(row.keys());
    }
    header.into_iter().collect()
}

/// Renders the dataset as comma-separated text.
///
/// Fields are quoted only when they contain a comma, a quote or a line break,
/// with inner quotes doubled. Rows missing a header column get an empty field.
/// Lines are joined with `\n` and there is no trailing newline.
pub fn to_csv(rows: &[MergedRow]) -> Result<String, ScrapeError> {
    let header = header_for(rows);
    match header[..] {
        [] => Ok(String::new()),
        [key] => single_column(key, rows),
        _ => {
            let mut writer = csv_writer();
            writer.write_record(&header)?;
            for row in rows {
                writer.write_record(header.iter().map(|key| row.get(key).unwrap_or("")))?;
            }
            finish(writer)
        }
    }
}

// The csv writer quotes a record made of one empty field so the line is not
// blank; a single-column table must keep those fields bare.
fn single_column(key: &str, rows: &[MergedRow]) -> Result<String, ScrapeError> {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(single_field(key)?);
    for row in rows {
        lines.push(single_field(row.get(key).unwrap_or(""))?);
    }
    Ok(lines.join("\n"))
}

fn single_field(value: &str) -> Result<String, ScrapeError> {
    if value.is_empty() {
        return Ok(String::new());
    }
    let mut writer = csv_writer();
    writer.write_record([value])?;
    finish(writer)
}

fn csv_writer() -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new())
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String, ScrapeError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ScrapeError::Csv(csv::Error::from(e.into_error())))?;
    // Every field written was a Rust string, so the bytes are UTF-8.
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// `TAF_<accId>_C<code1>_<code2>_full_<date>.csv`
///
/// The identifiers come from the caller, so anything outside ASCII letters,
/// digits, `-` and `_` is replaced with `_`. The name can then be used as a
/// single path component and inside a quoted header value.
pub fn export_filename(query: &QuerySettings, date: NaiveDate) -> String {
    format!(
        "TAF_{}_C{}_{}_full_{}.csv",
        filename_part(&query.acc_id),
        filename_part(&query.code1),
        filename_part(&query.code2),
        date.format("%Y-%m-%d")
    )
}

fn filename_part(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> MergedRow {
        pairs.iter().copied().collect()
    }

    #[test]
    fn header_is_the_union_of_keys_in_first_seen_order() {
        let rows = vec![
            row(&[("uuid", "a"), ("name", "A")]),
            row(&[("uuid", "b"), ("scope_en", "X"), ("name", "B")]),
            row(&[("extra", "1")]),
        ];
        assert_eq!(header_for(&rows), vec!["uuid", "name", "scope_en", "extra"]);
    }

    #[test]
    fn missing_keys_serialize_as_empty_fields() {
        let rows = vec![row(&[("uuid", "a"), ("name", "A")]), row(&[("uuid", "b"), ("scope", "S")])];
        assert_eq!(to_csv(&rows).unwrap(), "uuid,name,scope\na,A,\nb,,S");
    }

    #[test]
    fn quotes_only_when_needed() {
        let rows = vec![row(&[
            ("quote", r#"He said, "hi""#),
            ("plain", "plain"),
            ("multi", "line one\nline two"),
            ("comma", "a,b"),
        ])];

        let csv = to_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.splitn(2, '\n').collect();
        assert_eq!(lines[0], "quote,plain,multi,comma");
        assert_eq!(lines[1], "\"He said, \"\"hi\"\"\",plain,\"line one\nline two\",\"a,b\"");
    }

    #[test]
    fn empty_dataset_is_empty_text() {
        assert_eq!(to_csv(&[]).unwrap(), "");
    }

    #[test]
    fn round_trips_through_a_csv_reader() {
        let rows = vec![
            row(&[("uuid", "a"), ("name_zh_TW", "台灣認證"), ("note", "x, \"y\"\nz")]),
            row(&[("uuid", "b"), ("other", "o")]),
        ];
        let csv = to_csv(&rows).unwrap();

        let mut reader = csv::ReaderBuilder::new().from_reader(csv.as_bytes());
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, vec!["uuid", "name_zh_TW", "note", "other"]);

        let parsed: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        for (source, record) in rows.iter().zip(&parsed) {
            for (key, value) in header.iter().zip(record) {
                assert_eq!(source.get(key).unwrap_or(""), value);
            }
        }
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn single_column_empty_values_stay_bare() {
        let rows = vec![row(&[("note", "x")]), row(&[("note", "")]), row(&[("note", "a,b")])];
        assert_eq!(to_csv(&rows).unwrap(), "note\nx\n\n\"a,b\"");
        assert_eq!(to_csv(&rows[..2]).unwrap(), "note\nx\n");
    }

    fn query_for(acc_id: &str, code1: &str, code2: &str) -> QuerySettings {
        QuerySettings {
            acc_id: acc_id.into(),
            code1: code1.into(),
            code2: code2.into(),
            cust_name: String::new(),
            lang: "zh_TW".into(),
            page_size: 50,
        }
    }

    #[test]
    fn filename_embeds_query_and_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(
            export_filename(&query_for("CBA_MS_ID", "05", "01"), date),
            "TAF_CBA_MS_ID_C05_01_full_2026-10-19.csv"
        );
    }

    #[test]
    fn filename_replaces_path_and_quote_characters() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let name = export_filename(&query_for("../../etc", "0\"5", "a\\b c"), date);

        assert_eq!(name, "TAF_______etc_C0_5_a_b_c_full_2026-10-19.csv");
        assert!(!name.contains(".."));
        assert!(!name.contains(['/', '\\', '"']));
    }
}

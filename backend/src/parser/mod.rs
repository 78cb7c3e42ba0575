//! Tabular input decoding with encoding and delimiter auto-detection.
//!
//! Turns delimited text or a spreadsheet workbook into a [`Table`].
//! No question-specific logic here.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::Timelike;
use std::io::Cursor;
use std::path::Path;

use crate::error::{ParseError, ParseResult};
use crate::models::{RawRow, Table};

/// Cell contents read as *not available*.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Container format of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// CSV and friends.
    Delimited,
    /// xlsx / xlsm / xls / ods workbook.
    Spreadsheet,
}

impl SourceFormat {
    /// Pick the format from a file name's extension.
    pub fn from_file_name(name: &str) -> ParseResult<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(SourceFormat::Delimited),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SourceFormat::Spreadsheet),
            _ => Err(ParseError::UnsupportedFormat(name.to_string())),
        }
    }
}

/// A decoded table with detection metadata
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub table: Table,
    pub format: SourceFormat,
    /// Detected encoding (delimited text only)
    pub encoding: Option<String>,
    /// Detected delimiter (delimited text only)
    pub delimiter: Option<char>,
}

/// Whether a raw cell counts as *not available*.
pub fn is_missing(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw)
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> ParseResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);

    let content = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(codec) => codec.decode(bytes).0.into_owned(),
            // Fallback: UTF-8 with lossy conversion
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    Ok(content)
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Give blank headers a placeholder and suffix repeated ones (`a`, `a.1`, ...).
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for (i, header) in raw.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            header
        };
        let mut name = base.clone();
        let mut n = 1;
        while out.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        out.push(name);
    }
    out
}

/// Parse delimited text with an explicit delimiter.
///
/// Quoted fields may span lines. Blank lines are skipped, short rows are
/// padded with NA, extra fields are ignored.
///
/// # Example
/// ```ignore
/// use exambundle::parser::parse_delimited;
///
/// let table = parse_delimited("name;age\nAlice;30", ';').unwrap();
/// assert_eq!(table.rows[0].text("name"), "Alice");
/// ```
pub fn parse_delimited(content: &str, delimiter: char) -> ParseResult<Table> {
    let delimiter = u8::try_from(delimiter)
        .map_err(|_| ParseError::Encoding(format!("delimiter '{}' is not ASCII", delimiter)))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut records = reader.records();

    let header = records.next().ok_or(ParseError::EmptyFile)??;
    let headers: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::NoHeaders);
    }
    let headers = dedupe_headers(headers);

    let mut table = Table::new(headers);
    for record in records {
        let record = record?;
        // Whitespace-only line. A delimiter-only line is an all-NA row and stays.
        if record.len() <= 1 && record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let mut row = RawRow::new();
        for (i, header) in table.headers.iter().enumerate() {
            let value = record
                .get(i)
                .filter(|raw| !is_missing(raw))
                .map(str::to_string);
            row.push(header.clone(), value);
        }
        table.rows.push(row);
    }

    Ok(table)
}

/// Parse delimited bytes with auto-detection of encoding and delimiter.
pub fn parse_delimited_auto(bytes: &[u8]) -> ParseResult<ParsedTable> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let table = parse_delimited(&content, delimiter)?;

    Ok(ParsedTable {
        table,
        format: SourceFormat::Delimited,
        encoding: Some(encoding),
        delimiter: Some(delimiter),
    })
}

/// Render a workbook cell as text, `None` for empty or error cells.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if is_missing(s) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_float(*f)),
        Data::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => Some(match dt.as_datetime() {
            Some(ts) if ts.num_seconds_from_midnight() == 0 => ts.date().to_string(),
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format_float(dt.as_f64()),
        }),
        other => Some(other.to_string()),
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Parse the first sheet of a workbook. Row 1 is the header.
pub fn parse_spreadsheet(bytes: &[u8]) -> ParseResult<Table> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::EmptyFile)??;

    table_from_range(&range)
}

/// Cell text anchored at A1.
///
/// calamine starts a range at its first used cell, so leading blank rows
/// and columns are put back before the header is read.
fn sheet_grid(range: &Range<Data>) -> Vec<Vec<Option<String>>> {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut grid: Vec<Vec<Option<String>>> = vec![Vec::new(); row_offset];
    for cells in range.rows() {
        let mut values: Vec<Option<String>> = vec![None; col_offset];
        values.extend(cells.iter().map(cell_text));
        grid.push(values);
    }
    grid
}

/// Build a table from a sheet range. Blank rows inside the sheet are kept
/// as all-NA rows so row positions match the sheet.
pub fn table_from_range(range: &Range<Data>) -> ParseResult<Table> {
    let mut rows = sheet_grid(range).into_iter();
    let header = rows.next().ok_or(ParseError::NoHeaders)?;
    let headers: Vec<String> = header
        .into_iter()
        .map(|h| h.map(|h| h.trim().to_string()).unwrap_or_default())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::NoHeaders);
    }
    let headers = dedupe_headers(headers);

    let mut table = Table::new(headers);
    for values in rows {
        let mut row = RawRow::new();
        for (i, header) in table.headers.iter().enumerate() {
            row.push(header.clone(), values.get(i).cloned().flatten());
        }
        table.rows.push(row);
    }

    Ok(table)
}

/// Decode an uploaded file, choosing the format from its name.
pub fn parse_table_bytes(file_name: &str, bytes: &[u8]) -> ParseResult<ParsedTable> {
    match SourceFormat::from_file_name(file_name)? {
        SourceFormat::Delimited => parse_delimited_auto(bytes),
        SourceFormat::Spreadsheet => Ok(ParsedTable {
            table: parse_spreadsheet(bytes)?,
            format: SourceFormat::Spreadsheet,
            encoding: None,
            delimiter: None,
        }),
    }
}

/// Decode a file on disk, choosing the format from its extension.
///
/// # Example
/// ```ignore
/// let parsed = parse_table_file("/path/to/questions.xlsx")?;
/// println!("Columns: {:?}", parsed.table.headers);
/// ```
pub fn parse_table_file<P: AsRef<Path>>(path: P) -> ParseResult<ParsedTable> {
    let path = path.as_ref();
    let name = path.to_string_lossy();
    SourceFormat::from_file_name(&name)?;
    let bytes = std::fs::read(path)?;
    parse_table_bytes(&name, &bytes)
}

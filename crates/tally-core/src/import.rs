//! Bank statement parsers (CSV and OFX/QFX)
//!
//! Both parsers produce staged rows in file order. Row-level failures are
//! logged and the row is dropped; only file-level problems (unreadable
//! header, unsupported extension) abort the import.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{NewStagedTransaction, StatementFormat};

/// Minimum columns the supported bank's CSV export carries.
/// Layout: date, amount, two unused columns, description.
const CSV_MIN_COLUMNS: usize = 5;
const CSV_DATE_COLUMN: usize = 0;
const CSV_AMOUNT_COLUMN: usize = 1;
const CSV_DESCRIPTION_COLUMN: usize = 4;

/// Determine the statement format from the uploaded filename's extension.
///
/// Unrecognized extensions are rejected before any parsing happens.
pub fn detect_format(filename: &str) -> Result<StatementFormat> {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => Ok(StatementFormat::Csv),
        "qfx" | "ofx" => Ok(StatementFormat::Ofx),
        _ => Err(Error::UnsupportedFormat(filename.to_string())),
    }
}

/// Parse an uploaded statement into staged rows
pub fn parse_statement(data: &[u8], format: StatementFormat) -> Result<Vec<NewStagedTransaction>> {
    match format {
        StatementFormat::Csv => parse_csv(data),
        StatementFormat::Ofx => parse_ofx(data),
    }
}

/// Convert a CSV record to a JSON object using headers as keys
fn record_to_json(headers: &StringRecord, record: &StringRecord) -> String {
    let mut map = serde_json::Map::new();
    for (i, header) in headers.iter().enumerate() {
        if let Some(value) = record.get(i) {
            map.insert(header.to_string(), Value::String(value.to_string()));
        }
    }
    json!(map).to_string()
}

/// Parse the bank's CSV export
///
/// The first line is a header and discarded. Records with fewer than five
/// columns, or whose date or amount fails to parse, are skipped with a
/// warning.
fn parse_csv(data: &[u8]) -> Result<Vec<NewStagedTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable CSV record: {}", e);
                continue;
            }
        };

        if record.len() < CSV_MIN_COLUMNS {
            warn!(
                "Skipping CSV record with {} columns (expected at least {})",
                record.len(),
                CSV_MIN_COLUMNS
            );
            continue;
        }

        let date = match parse_date(record.get(CSV_DATE_COLUMN).unwrap_or("")) {
            Ok(date) => date,
            Err(e) => {
                warn!("Skipping CSV record: {}", e);
                continue;
            }
        };

        let amount = match parse_amount(record.get(CSV_AMOUNT_COLUMN).unwrap_or("")) {
            Ok(amount) => amount,
            Err(e) => {
                warn!("Skipping CSV record: {}", e);
                continue;
            }
        };

        let description = record
            .get(CSV_DESCRIPTION_COLUMN)
            .unwrap_or("")
            .trim()
            .to_string();

        rows.push(NewStagedTransaction {
            date,
            amount,
            payee: derive_payee(&description),
            description,
            check_number: None,
            external_id: None,
            raw_data: Some(record_to_json(&headers, &record)),
        });
    }

    debug!("Parsed {} CSV rows", rows.len());
    Ok(rows)
}

/// Parse an OFX/QFX (SGML) statement
///
/// `<STMTTRN>` blocks are located with a tolerant scanner that handles
/// missing closing tags; blocks without a parseable DTPOSTED or TRNAMT are
/// skipped with a warning.
fn parse_ofx(data: &[u8]) -> Result<Vec<NewStagedTransaction>> {
    let text = String::from_utf8_lossy(data);
    let mut rows = Vec::new();

    for block in stmttrn_blocks(&text) {
        let date = extract_tag(block, "DTPOSTED").and_then(|v| parse_ofx_date(&v));
        let amount = extract_tag(block, "TRNAMT").and_then(|v| parse_amount(&v).ok());

        let (date, amount) = match (date, amount) {
            (Some(date), Some(amount)) => (date, amount),
            _ => {
                warn!("Skipping STMTTRN block missing DTPOSTED or TRNAMT");
                continue;
            }
        };

        let mut description = extract_tag(block, "NAME").unwrap_or_default();
        if let Some(memo) = extract_tag(block, "MEMO") {
            // Merge the memo unless the name already covers it
            if description.is_empty() {
                description = memo;
            } else if !description.to_uppercase().contains(&memo.to_uppercase()) {
                description = format!("{} {}", description, memo);
            }
        }

        rows.push(NewStagedTransaction {
            date,
            amount,
            payee: derive_payee(&description),
            description,
            check_number: extract_tag(block, "CHECKNUM"),
            external_id: extract_tag(block, "FITID"),
            raw_data: Some(block.trim().to_string()),
        });
    }

    debug!("Parsed {} OFX transactions", rows.len());
    Ok(rows)
}

/// Locate `<STMTTRN>` block bodies, case-insensitively.
///
/// A block runs from just past `<STMTTRN>` to the first of `</STMTTRN>`,
/// the next `<STMTTRN>`, `</BANKTRANLIST>`, or end of input. These are the
/// same terminating conditions as a non-greedy regex with those
/// alternatives, so unterminated blocks still parse.
fn stmttrn_blocks(text: &str) -> Vec<&str> {
    const OPEN: &str = "<STMTTRN>";
    const TERMINATORS: [&str; 3] = ["</STMTTRN>", "<STMTTRN>", "</BANKTRANLIST>"];

    // ASCII uppercasing preserves byte offsets, so positions found in the
    // uppercased copy index directly into the original text.
    let upper = text.to_ascii_uppercase();
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(found) = upper[cursor..].find(OPEN) {
        let start = cursor + found + OPEN.len();
        let rest = &upper[start..];
        let end = TERMINATORS
            .iter()
            .filter_map(|t| rest.find(t))
            .min()
            .unwrap_or(rest.len());
        blocks.push(&text[start..start + end]);
        cursor = start + end;
    }

    blocks
}

/// Extract the value of a simple `<TAG>value` SGML element from a block.
/// The value runs to the next tag or end of line.
fn extract_tag(block: &str, tag: &str) -> Option<String> {
    let upper = block.to_ascii_uppercase();
    let open = format!("<{}>", tag);
    let start = upper.find(&open)? + open.len();
    let rest = &block[start..];
    let end = rest
        .find(|c| c == '<' || c == '\r' || c == '\n')
        .unwrap_or(rest.len());
    let value = rest[..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse an OFX datetime: the first 8 digits are yyyyMMdd; any time or
/// timezone suffix (e.g. `120000[0:GMT]`) is ignored.
fn parse_ofx_date(value: &str) -> Option<NaiveDate> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .take(8)
        .collect();
    if digits.len() < 8 {
        return None;
    }
    NaiveDate::parse_from_str(&digits, "%Y%m%d").ok()
}

fn whitespace_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn trailing_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,2}/\d{1,2}(/\d{2,4})?$").expect("static regex"))
}

fn trailing_store_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#?\d{3,}$").expect("static regex"))
}

/// Guess a payee from a statement description.
///
/// Cuts at the earliest of a double space, `" - "`, or `" * "`, collapses
/// whitespace runs, then strips trailing date-like and store-number-like
/// tokens the bank appends after the merchant name.
pub(crate) fn derive_payee(description: &str) -> Option<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cut = ["  ", " - ", " * "]
        .iter()
        .filter_map(|sep| trimmed.find(sep))
        .min()
        .unwrap_or(trimmed.len());
    let head = whitespace_run_re().replace_all(&trimmed[..cut], " ");

    let mut tokens: Vec<&str> = head.split(' ').collect();
    while let Some(last) = tokens.last() {
        if trailing_date_re().is_match(last) || trailing_store_number_re().is_match(last) {
            tokens.pop();
        } else {
            break;
        }
    }

    let payee = tokens.join(" ").trim().to_string();
    if payee.is_empty() {
        None
    } else {
        Some(payee)
    }
}

/// Parse a date string in the formats the bank's exports use
fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%Y-%m-%d", // 2024-01-15
        "%m-%d-%Y", // 01-15-2024
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols, thousands commas,
/// and accounting parentheses
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))
}

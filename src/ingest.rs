use std::io::Cursor;

use calamine::{Data, Reader};
use chrono::NaiveDate;

use crate::error::IngestError;
use crate::schema::{self, Field, ResolvedSchema};

/// Bucket for claims whose payer/provider cell is empty.
pub const UNKNOWN_BUCKET: &str = "Unknown";

/// How many leading rows to scan for the header row. Billing exports often
/// carry a banner/title row above the real header.
const HEADER_SCAN_ROWS: usize = 20;

#[derive(Debug, Clone)]
pub struct ClaimRecord {
    pub cpt: String,
    pub payer: String,
    pub provider: String,
    pub billed: f64,
    pub paid: Option<f64>,
    pub denied: bool,
    pub denial_reason: Option<String>,
    pub denial_date: Option<NaiveDate>,
}

#[derive(Debug)]
pub struct NormalizedClaims {
    pub claims: Vec<ClaimRecord>,
    pub schema: ResolvedSchema,
    pub skipped_rows: u64,
}

/// Raw table as parsed from the file, headers already split off.
#[derive(Debug)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn load_and_normalize(name: &str, bytes: &[u8]) -> Result<NormalizedClaims, IngestError> {
    let table = load_bytes(name, bytes)?;
    normalize(&table)
}

pub fn load_bytes(name: &str, bytes: &[u8]) -> Result<RawTable, IngestError> {
    if is_spreadsheet(name, bytes) {
        load_workbook(bytes)
    } else {
        load_csv(bytes)
    }
}

fn is_spreadsheet(name: &str, bytes: &[u8]) -> bool {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
        return true;
    }
    // XLSX is a ZIP container; sniff the magic when the name is unhelpful.
    !lower.ends_with(".csv") && bytes.starts_with(b"PK")
}

fn load_csv(bytes: &[u8]) -> Result<RawTable, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| IngestError::Parse(format!("bad CSV record: {e}")))?;
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    table_from_rows(rows)
}

fn load_workbook(bytes: &[u8]) -> Result<RawTable, IngestError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
        .map_err(|e| IngestError::Parse(format!("unreadable workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Parse("workbook has no sheets".to_string()))?
        .map_err(|e| IngestError::Parse(format!("unreadable sheet: {e}")))?;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    table_from_rows(rows)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        // Spreadsheets hand CPT codes back as floats; keep them integral.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.date().format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Split the header row off the raw rows. The header is the first row with
/// at least two non-empty cells; when nothing qualifies, row 0 is assumed
/// and schema resolution reports what is actually missing.
fn table_from_rows(rows: Vec<Vec<String>>) -> Result<RawTable, IngestError> {
    if rows.is_empty() {
        return Err(IngestError::EmptyDataset);
    }
    let header_idx = rows
        .iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| row.iter().filter(|cell| !cell.is_empty()).count() >= 2)
        .unwrap_or(0);

    let headers = rows[header_idx].clone();
    let rows = rows[header_idx + 1..].to_vec();
    Ok(RawTable { headers, rows })
}

pub fn normalize(table: &RawTable) -> Result<NormalizedClaims, IngestError> {
    let schema = schema::resolve(&table.headers)?;

    let mut claims = Vec::with_capacity(table.rows.len());
    let mut skipped: u64 = 0;
    for row in &table.rows {
        let cell = |field: Field| field_cell(&schema, row, field);

        let Some(cpt) = cell(Field::CptCode) else {
            skipped += 1;
            continue;
        };

        let paid = cell(Field::PaidAmount).map(parse_money);
        let denial_reason = cell(Field::DenialReason).map(str::to_string);
        let denied = match cell(Field::DeniedFlag) {
            Some(flag) => parse_flag(flag),
            None => match (&denial_reason, paid) {
                (Some(_), _) => true,
                (None, Some(p)) => p == 0.0,
                (None, None) => false,
            },
        };

        claims.push(ClaimRecord {
            cpt: cpt.to_string(),
            payer: cell(Field::Payer)
                .map(str::to_string)
                .unwrap_or_else(|| UNKNOWN_BUCKET.to_string()),
            provider: cell(Field::Provider)
                .map(str::to_string)
                .unwrap_or_else(|| UNKNOWN_BUCKET.to_string()),
            billed: cell(Field::BilledAmount).map(parse_money).unwrap_or(0.0),
            paid,
            denied,
            denial_reason,
            denial_date: cell(Field::DenialDate).and_then(parse_date),
        });
    }

    if claims.is_empty() {
        return Err(IngestError::EmptyDataset);
    }
    if skipped > 0 {
        tracing::info!("Skipped {} rows with an empty CPT code", skipped);
    }

    Ok(NormalizedClaims {
        claims,
        schema,
        skipped_rows: skipped,
    })
}

fn field_cell<'r>(schema: &ResolvedSchema, row: &'r [String], field: Field) -> Option<&'r str> {
    schema
        .column(field)
        .and_then(|i| row.get(i))
        .map(String::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Strip `$`, thousands separators, and stray spaces. Empty or garbage
/// cells count as zero, matching how billing exports leave blanks.
fn parse_money(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse().unwrap_or(0.0)
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "y" | "yes" | "true" | "1" | "d" | "denied"
    )
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

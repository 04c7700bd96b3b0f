//! Header and item extraction from the first worksheet of an uploaded workbook.
//!
//! Cells are addressed absolutely (row 0 / column 0 is A1) regardless of where the
//! sheet's used range begins.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use serde::Serialize;
use tracing::debug;

use crate::intake::IntakeError;

/// Rows searched for the client name and tax year labels.
const HEADER_SCAN_ROWS: usize = 10;
/// Rows whose free text may stand in for a missing client-name label.
const NAME_FALLBACK_ROWS: usize = 3;
/// First row (0-based) of the item list.
const ITEM_START_ROW: usize = 3;
/// Consecutive blank cells that end the item list once it has started.
const MAX_EMPTY_GAP: usize = 3;
const PLACEHOLDER: &str = "paste here";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    /// Whitespace-normalized, never empty.
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(value: &str) -> Self {
        let normalized = normalize(value);
        if normalized.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(normalized)
        }
    }

    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::String(s) => Cell::text(s),
            other => Cell::text(&other.to_string()),
        }
    }

    /// Display text, `None` for empty cells.
    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(format!("{n:.0}")),
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    fn is_placeholder(&self) -> bool {
        matches!(self, Cell::Text(s) if s.eq_ignore_ascii_case(PLACEHOLDER))
    }
}

fn normalize(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rectangular view of a sheet. Out-of-range reads are empty.
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    rows: Vec<Vec<Cell>>,
    width: usize,
}

impl SheetGrid {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self { rows, width }
    }

    fn from_range(range: &Range<Data>) -> Self {
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let mut rows = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; col_offset];
            cells.extend(row.iter().map(Cell::from_data));
            rows.push(cells);
        }
        Self::from_rows(rows)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn get(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Empty)
    }

    fn is_blank(&self) -> bool {
        self.rows.iter().flatten().all(|c| *c == Cell::Empty)
    }
}

/// What the worksheet builder needs from a spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetExtract {
    pub client_name: String,
    pub tax_year: Option<String>,
    pub items: Vec<String>,
}

/// Parses `.xlsx`/`.xls`/`.ods` bytes and extracts from the first sheet.
pub fn parse_workbook(bytes: &[u8]) -> Result<SheetExtract, IntakeError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| IntakeError::Unreadable(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(IntakeError::Empty)?
        .map_err(|e| IntakeError::Unreadable(e.to_string()))?;
    extract(&SheetGrid::from_range(&range))
}

pub fn extract(grid: &SheetGrid) -> Result<SheetExtract, IntakeError> {
    if grid.is_blank() {
        return Err(IntakeError::Empty);
    }
    let client_name = find_client_name(grid)?;
    let tax_year = find_tax_year(grid);
    let items = collect_items(grid)?;
    debug!(
        client = %client_name,
        tax_year = ?tax_year,
        items = items.len(),
        "Spreadsheet parsed"
    );
    Ok(SheetExtract {
        client_name,
        tax_year,
        items,
    })
}

fn is_client_name_label(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("client") && lowered.contains("name")
}

fn is_tax_year_label(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("tax") && lowered.contains("year")
}

/// Label, then its right-hand neighbour, then the cells below it; failing all labels,
/// the last free text seen near the top of the sheet.
pub fn find_client_name(grid: &SheetGrid) -> Result<String, IntakeError> {
    let scan_rows = grid.height().min(HEADER_SCAN_ROWS);
    let mut fallback: Option<String> = None;

    for row in 0..scan_rows {
        for col in 0..grid.width() {
            let Some(text) = grid.get(row, col).as_text() else {
                continue;
            };

            if is_client_name_label(&text) {
                let right = (col + 1..grid.width()).find_map(|c| grid.get(row, c).as_text());
                if let Some(name) = right {
                    return Ok(name);
                }
                let below = (row + 1..scan_rows).find_map(|r| grid.get(r, col).as_text());
                if let Some(name) = below {
                    return Ok(name);
                }
            }

            // An unanswered label is itself a candidate unless it reads "name of client".

            if row < NAME_FALLBACK_ROWS && !text.to_lowercase().contains("name of client") {
                fallback = Some(text);
            }
        }
    }

    fallback.ok_or(IntakeError::ClientNameNotFound)
}

/// Checks the conventional A2/B2 pair first, then scans for a "tax year" label and
/// tries cells to its right followed by cells below it.
pub fn find_tax_year(grid: &SheetGrid) -> Option<String> {
    let scan_rows = grid.height().min(HEADER_SCAN_ROWS);

    if scan_rows > 1 && grid.width() > 1 {
        let label_is_year = grid
            .get(1, 0)
            .as_text()
            .map(|t| is_tax_year_label(&t))
            .unwrap_or(false);
        if label_is_year {
            if let Some(year) = coerce_tax_year(grid.get(1, 1)) {
                return Some(year);
            }
        }
    }

    for row in 0..scan_rows {
        for col in 0..grid.width() {
            let is_label = matches!(grid.get(row, col), Cell::Text(t) if is_tax_year_label(t));
            if !is_label {
                continue;
            }
            let found = (col + 1..grid.width())
                .find_map(|c| coerce_tax_year(grid.get(row, c)))
                .or_else(|| (row + 1..scan_rows).find_map(|r| coerce_tax_year(grid.get(r, col))));
            if found.is_some() {
                return found;
            }
        }
    }

    None
}

/// Accepts four-digit years given as numbers (truncated) or text ("2024", "2024.0").
pub fn coerce_tax_year(cell: &Cell) -> Option<String> {
    let year = match cell {
        Cell::Empty => return None,
        Cell::Number(n) => format_year(*n)?,
        Cell::Text(text) if is_four_digits(text) => text.clone(),
        Cell::Text(text) => format_year(text.parse::<f64>().ok()?)?,
    };
    is_four_digits(&year).then_some(year)
}

fn format_year(value: f64) -> Option<String> {
    value.is_finite().then(|| format!("{:04}", value.trunc() as i64))
}

fn is_four_digits(text: &str) -> bool {
    text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit())
}

/// Picks the densest column below the header and walks it until a gap.
pub fn collect_items(grid: &SheetGrid) -> Result<Vec<String>, IntakeError> {
    if grid.height() <= ITEM_START_ROW {
        return Err(IntakeError::NoItemRows);
    }
    let is_item = |cell: &Cell| *cell != Cell::Empty && !cell.is_placeholder();

    let mut best: Option<(usize, usize)> = None;
    for col in 0..grid.width() {
        let count = (ITEM_START_ROW..grid.height())
            .filter(|&row| is_item(grid.get(row, col)))
            .count();
        if count > best.map(|(_, c)| c).unwrap_or(0) {
            best = Some((col, count));
        }
    }
    let (col, _) = best.ok_or(IntakeError::NoItems)?;

    let mut items = Vec::new();
    let mut consecutive_empty = 0;
    for row in ITEM_START_ROW..grid.height() {
        let cell = grid.get(row, col);
        match cell.as_text() {
            Some(text) if is_item(cell) => {
                consecutive_empty = 0;
                items.push(text);
            }
            _ => {
                consecutive_empty += 1;
                if consecutive_empty >= MAX_EMPTY_GAP && !items.is_empty() {
                    break;
                }
            }
        }
    }

    if items.is_empty() {
        return Err(IntakeError::NoItems);
    }
    Ok(items)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn e() -> Cell {
        Cell::Empty
    }

    fn sample_sheet() -> SheetGrid {
        SheetGrid::from_rows(vec![
            vec![t("Client Name:"), t("  Jane   Doe ")],
            vec![t("Tax Year"), n(2024.0)],
            vec![t("Documents")],
            vec![t("Upload your W2.")],
            vec![t("Paste here")],
            vec![t("Upload your 1099-INT.")],
            vec![e()],
            vec![e()],
            vec![e()],
            vec![t("Notes for preparer")],
        ])
    }

    #[test]
    fn test_extract_sample_sheet() {
        let extract = extract(&sample_sheet()).unwrap();
        assert_eq!(extract.client_name, "Jane Doe");
        assert_eq!(extract.tax_year.as_deref(), Some("2024"));
        assert_eq!(
            extract.items,
            vec!["Upload your W2.".to_string(), "Upload your 1099-INT.".to_string()]
        );
    }

    #[test]
    fn test_blank_sheet_is_empty_error() {
        let grid = SheetGrid::from_rows(vec![vec![e(), t("   ")]]);
        assert!(matches!(extract(&grid), Err(IntakeError::Empty)));
    }

    // ── client name ─────────────────────────────────────────────────────────

    #[test]
    fn test_client_name_below_label() {
        let grid = SheetGrid::from_rows(vec![
            vec![t("Worksheet")],
            vec![t("Name of Client"), e()],
            vec![e()],
            vec![t("Acme Holdings")],
        ]);
        assert_eq!(find_client_name(&grid).unwrap(), "Acme Holdings");
    }

    #[test]
    fn test_right_of_label_wins_over_below() {
        let grid = SheetGrid::from_rows(vec![
            vec![t("client name"), e(), t("Right Side")],
            vec![t("Below Side")],
        ]);
        assert_eq!(find_client_name(&grid).unwrap(), "Right Side");
    }

    #[test]
    fn test_numeric_client_name_is_rendered_as_text() {
        let grid = SheetGrid::from_rows(vec![vec![t("Client name"), n(1042.0)]]);
        assert_eq!(find_client_name(&grid).unwrap(), "1042");
    }

    #[test]
    fn test_client_name_falls_back_to_last_header_text() {
        let grid = SheetGrid::from_rows(vec![
            vec![t("2024 Organizer")],
            vec![t("Tax Year"), n(2024.0)],
            vec![t("Smith Family")],
            vec![t("Not in header rows")],
        ]);
        assert_eq!(find_client_name(&grid).unwrap(), "Smith Family");
    }

    #[test]
    fn test_unanswered_label_is_last_fallback() {
        let grid = SheetGrid::from_rows(vec![
            vec![t("Smith Family")],
            vec![t("Client Name:")],
        ]);
        assert_eq!(find_client_name(&grid).unwrap(), "Client Name:");
    }

    #[test]
    fn test_name_of_client_label_is_never_fallback() {
        let grid = SheetGrid::from_rows(vec![
            vec![t("Smith Family")],
            vec![t("Name of Client")],
        ]);
        assert_eq!(find_client_name(&grid).unwrap(), "Smith Family");

        let lone = SheetGrid::from_rows(vec![vec![t("Name of Client")]]);
        assert!(matches!(
            find_client_name(&lone),
            Err(IntakeError::ClientNameNotFound)
        ));
    }

    #[test]
    fn test_client_name_missing() {
        let grid = SheetGrid::from_rows(vec![
            vec![e()],
            vec![e()],
            vec![e()],
            vec![t("Only an item")],
        ]);
        assert!(matches!(
            find_client_name(&grid),
            Err(IntakeError::ClientNameNotFound)
        ));
    }

    // ── tax year ────────────────────────────────────────────────────────────

    #[test]
    fn test_coerce_tax_year() {
        assert_eq!(coerce_tax_year(&n(2024.0)).as_deref(), Some("2024"));
        assert_eq!(coerce_tax_year(&n(2023.9)).as_deref(), Some("2023"));
        assert_eq!(coerce_tax_year(&n(999.0)).as_deref(), Some("0999"));
        assert_eq!(coerce_tax_year(&t("2022")).as_deref(), Some("2022"));
        assert_eq!(coerce_tax_year(&t("2021.0")).as_deref(), Some("2021"));
        assert_eq!(coerce_tax_year(&n(12345.0)), None);
        assert_eq!(coerce_tax_year(&n(-2024.0)), None);
        assert_eq!(coerce_tax_year(&n(f64::NAN)), None);
        assert_eq!(coerce_tax_year(&t("FY 2024")), None);
        assert_eq!(coerce_tax_year(&t("NaN")), None);
        assert_eq!(coerce_tax_year(&e()), None);
    }

    #[test]
    fn test_tax_year_scans_right_then_below() {
        let grid = SheetGrid::from_rows(vec![
            vec![t("Client"), t("Jane")],
            vec![t("Prepared"), t("yes")],
            vec![e(), t("Tax year:"), t("n/a"), t("2023")],
        ]);
        assert_eq!(find_tax_year(&grid).as_deref(), Some("2023"));

        let below = SheetGrid::from_rows(vec![
            vec![t("Tax Year")],
            vec![t("pending")],
            vec![n(2021.0)],
        ]);
        assert_eq!(find_tax_year(&below).as_deref(), Some("2021"));
    }

    #[test]
    fn test_tax_year_absent() {
        let grid = SheetGrid::from_rows(vec![vec![t("Tax Year"), t("TBD")]]);
        assert_eq!(find_tax_year(&grid), None);
    }

    // ── items ───────────────────────────────────────────────────────────────

    #[test]
    fn test_densest_column_is_chosen() {
        let grid = SheetGrid::from_rows(vec![
            vec![t("Client Name"), t("Jane")],
            vec![e()],
            vec![e()],
            vec![t("1"), t("W2")],
            vec![e(), t("1099-INT")],
            vec![e(), t("1098")],
        ]);
        assert_eq!(collect_items(&grid).unwrap(), vec!["W2", "1099-INT", "1098"]);
    }

    #[test]
    fn test_first_column_wins_ties() {
        let grid = SheetGrid::from_rows(vec![
            vec![e()],
            vec![e()],
            vec![e()],
            vec![t("left"), t("right")],
        ]);
        assert_eq!(collect_items(&grid).unwrap(), vec!["left"]);
    }

    #[test]
    fn test_leading_gap_does_not_stop_collection() {
        let grid = SheetGrid::from_rows(vec![
            vec![e()],
            vec![e()],
            vec![e()],
            vec![e()],
            vec![t("paste here")],
            vec![e()],
            vec![e()],
            vec![t("late item")],
        ]);
        assert_eq!(collect_items(&grid).unwrap(), vec!["late item"]);
    }

    #[test]
    fn test_no_item_rows() {
        let grid = SheetGrid::from_rows(vec![vec![t("Client Name"), t("Jane")]]);
        assert!(matches!(collect_items(&grid), Err(IntakeError::NoItemRows)));

        let placeholders = SheetGrid::from_rows(vec![
            vec![e()],
            vec![e()],
            vec![e()],
            vec![t("PASTE HERE")],
        ]);
        assert!(matches!(collect_items(&placeholders), Err(IntakeError::NoItems)));
    }

    #[test]
    fn test_garbage_bytes_are_unreadable() {
        assert!(matches!(
            parse_workbook(b"not a spreadsheet"),
            Err(IntakeError::Unreadable(_))
        ));
    }
}

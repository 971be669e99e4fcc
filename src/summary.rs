//! Summary Generator: Raw sheet -> batch summary sheet.
//!
//! Three stages, all rerunnable wholesale:
//! - Stage A: delete and recreate the summary sheet sized to the raw sheet,
//!   write the fixed status-label column.
//! - Stage B: per raw data column, hour aggregations via modular row-offset
//!   SUMPRODUCT formulas, plus a "# of Hours" rollup column.
//! - Stage C: per-district rollup with hour formulas, exceed-threshold
//!   checks, and column sums.
//!
//! The raw sheet repeats in fixed-size row blocks (one QC cycle per block,
//! eight rows by default); every offset below is derived from that block
//! size.

use std::time::Duration;

use serde_json::{json, Value};

use crate::google_api::sheets::{SheetsClient, ValueInput, ValueRange, ValueRender};
use crate::google_api::GoogleApiError;
use crate::grid::col_letter;

/// QC pipeline stage names, written verbatim as the summary's first column.
pub const STATUS_LABELS: [&str; 9] = [
    "Raw Delivered",
    "Delivered greater than acceptance threshold",
    "Raw Redelivery",
    "Redelivered greater than acceptance threshold",
    "Accepted post Initial Check (file level)",
    "Accepted post Initial check (chunk level)",
    "Accepted post automated single audio check (chunk level)",
    "Delivered for manual QC",
    "Accepted post final single Audio Manual QC (chunk level)",
];

/// Raw columns A-D hold batch metadata; data columns start at E.
const RAW_METADATA_COLUMNS: usize = 4;
/// Raw column holding per-chunk durations, read by the district rollup.
const RAW_DURATION_COLUMN: &str = "D";
/// District table layout in the summary sheet.
const DISTRICT_HEADER_ROW: usize = 12;
const DISTRICT_SUM_ROW: usize = 13;
const DISTRICT_TABLE_START_ROW: usize = 14;
/// Hours above this are flagged "Exceeded" in the check columns.
const EXCEED_THRESHOLD: u32 = 100;

/// One run's parameters.
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub raw_sheet: String,
    pub target_sheet: String,
    /// Blocking pause after each write batch, to stay under the API quota.
    pub rate_limit_delay: Duration,
    /// Rows per QC cycle in the raw sheet layout.
    pub block_size: usize,
}

impl SummaryConfig {
    pub const DEFAULT_BLOCK_SIZE: usize = 8;
}

// ============================================================================
// Stage A: frame construction
// ============================================================================

/// The summary sheet's initial content: "Status" header plus the nine labels.
pub fn status_column() -> Vec<Vec<Value>> {
    let mut rows = vec![vec![json!("Status")]];
    rows.extend(STATUS_LABELS.iter().map(|label| vec![json!(label)]));
    rows
}

/// Delete any pre-existing summary sheet, recreate it sized to the raw
/// sheet's probed dimensions, and write the status column.
async fn rebuild_frame(
    client: &SheetsClient,
    cfg: &SummaryConfig,
) -> Result<(usize, usize), GoogleApiError> {
    let raw_rows = client.occupied_rows(&cfg.raw_sheet).await?;
    let raw_cols = client.row_width(&cfg.raw_sheet, 2).await?;
    log::info!(
        "Raw sheet {} probed at {} rows x {} columns",
        cfg.raw_sheet,
        raw_rows,
        raw_cols
    );

    if let Some(sheet_id) = client.sheet_id(&cfg.target_sheet).await? {
        log::info!("Deleting existing sheet {}", cfg.target_sheet);
        client.delete_sheet(sheet_id).await?;
    }
    client
        .add_sheet(&cfg.target_sheet, Some((raw_rows, raw_cols)))
        .await?;

    client
        .values_update(
            &format!("{}!A1", cfg.target_sheet),
            ValueInput::Raw,
            status_column(),
        )
        .await?;
    tokio::time::sleep(cfg.rate_limit_delay).await;

    Ok((raw_rows, raw_cols))
}

// ============================================================================
// Stage B: per-column aggregation formulas
// ============================================================================

/// Every-Nth-row sum over one raw column, minutes -> hours.
///
/// Selects the rows congruent to `anchor_row` modulo the block size, from the
/// anchor down to the last raw row.
fn stage_hours_formula(
    raw_sheet: &str,
    raw_col: &str,
    anchor_row: usize,
    num_rows: usize,
    block_size: usize,
) -> String {
    format!(
        "=SUMPRODUCT((MOD(ROW({raw}!{col}{a}:{col}{r})-ROW({raw}!{col}{a}),{b})=0)*{raw}!{col}{a}:{col}{r})/60",
        raw = raw_sheet,
        col = raw_col,
        a = anchor_row,
        r = num_rows,
        b = block_size,
    )
}

/// Build the full Stage B update list: one header cell and nine formula rows
/// per raw data column, then the "# of Hours" rollup column.
///
/// `raw_header_row` is the raw sheet's header row (row 2); columns beyond the
/// four metadata columns become summary columns starting at C. Returns an
/// empty list when the raw sheet has no data columns.
pub fn stage_formulas(
    raw_sheet: &str,
    target_sheet: &str,
    raw_header_row: &[String],
    num_rows: usize,
    block_size: usize,
) -> Vec<ValueRange> {
    let data_columns = raw_header_row.len().saturating_sub(RAW_METADATA_COLUMNS);
    if data_columns == 0 {
        return Vec::new();
    }

    let mut updates = Vec::new();

    for col_offset in 0..data_columns {
        // Raw data column (E onward) and its summary destination (C onward).
        let raw_col = col_letter((RAW_METADATA_COLUMNS + 1 + col_offset) as u32);
        let target_col = col_letter((3 + col_offset) as u32);

        let header = raw_header_row
            .get(RAW_METADATA_COLUMNS + col_offset)
            .cloned()
            .unwrap_or_default();
        updates.push(ValueRange::rows(
            format!("{}!{}1", target_sheet, target_col),
            vec![vec![json!(header)]],
        ));

        for i in 2..=10 {
            let formula = if i == 9 {
                // Delivered-for-QC minus accepted: derived metric.
                format!("={col}7-{col}8", col = target_col)
            } else if i == 10 {
                stage_hours_formula(raw_sheet, &raw_col, i, num_rows, block_size)
            } else {
                stage_hours_formula(raw_sheet, &raw_col, i + 1, num_rows, block_size)
            };
            updates.push(ValueRange::rows(
                format!("{}!{}{}", target_sheet, target_col, i),
                vec![vec![json!(formula)]],
            ));
        }
    }

    // Rollup column: sum of every generated column, per status row.
    updates.push(ValueRange::rows(
        format!("{}!B1", target_sheet),
        vec![vec![json!("# of Hours")]],
    ));
    let last_col = col_letter((2 + data_columns) as u32);
    for i in 2..=10 {
        updates.push(ValueRange::rows(
            format!("{}!B{}", target_sheet, i),
            vec![vec![json!(format!(
                "=SUM({}!C{}:{}{})",
                target_sheet, i, last_col, i
            ))]],
        ));
    }

    updates
}

async fn write_stage_formulas(
    client: &SheetsClient,
    cfg: &SummaryConfig,
    raw_rows: usize,
) -> Result<(), GoogleApiError> {
    let header_rows = client
        .values_get(&format!("{}!2:2", cfg.raw_sheet), ValueRender::FormattedValue)
        .await?;
    let raw_header_row = header_rows.into_iter().next().unwrap_or_default();

    let updates = stage_formulas(
        &cfg.raw_sheet,
        &cfg.target_sheet,
        &raw_header_row,
        raw_rows,
        cfg.block_size,
    );
    if updates.is_empty() {
        log::warn!(
            "Raw sheet {} has no data columns beyond the metadata columns",
            cfg.raw_sheet
        );
        return Ok(());
    }

    log::info!("Writing {} aggregation cells", updates.len());
    client
        .values_batch_update(ValueInput::UserEntered, updates)
        .await?;
    tokio::time::sleep(cfg.rate_limit_delay).await;

    Ok(())
}

// ============================================================================
// Stage C: district rollup
// ============================================================================

/// Scan (state, district) rows and retain the first-seen state per district,
/// in encounter order. Rows with fewer than two cells are skipped.
pub fn district_state_pairs(rows: &[Vec<String>]) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for row in rows {
        let (Some(state), Some(district)) = (row.first(), row.get(1)) else {
            continue;
        };
        if !pairs.iter().any(|(_, d)| d == district) {
            pairs.push((state.clone(), district.clone()));
        }
    }
    pairs
}

/// Per-district hour column: `=ROUND({raw}!D{r}/60,2)` for every block,
/// starting at `start_row` and stepping by the block size.
fn hour_column_formulas(
    raw_sheet: &str,
    start_row: usize,
    count: usize,
    block_size: usize,
) -> Vec<Vec<Value>> {
    (0..count)
        .map(|i| {
            vec![json!(format!(
                "=ROUND({}!{}{}/60,2)",
                raw_sheet,
                RAW_DURATION_COLUMN,
                start_row + i * block_size
            ))]
        })
        .collect()
}

/// Threshold-check column: values over the acceptance threshold are replaced
/// with the literal string "Exceeded".
fn exceed_column_formulas(source_col: &str, count: usize) -> Vec<Vec<Value>> {
    (0..count)
        .map(|i| {
            let cell = format!("{}{}", source_col, DISTRICT_TABLE_START_ROW + i);
            vec![json!(format!(
                "=IF({cell} > {threshold}, \"Exceeded\", {cell})",
                cell = cell,
                threshold = EXCEED_THRESHOLD,
            ))]
        })
        .collect()
}

/// Build the full Stage C update list: acceptance headers, the district
/// table, hour columns C/D/E, exceed checks G/H/I, and the row-13 sums.
///
/// Each entry carries its write mode: literal content (headers, district
/// names) is written RAW, formulas USER_ENTERED. `scanned_rows` is the raw
/// (state, district) row count; the formula columns emit one row per scanned
/// raw row. When no rows were scanned only the header entry is returned.
pub fn district_rollup_updates(
    raw_sheet: &str,
    target_sheet: &str,
    pairs: &[(String, String)],
    scanned_rows: usize,
    block_size: usize,
) -> Vec<(ValueInput, ValueRange)> {
    // Acceptance-stage headers over the three hour columns.
    let mut updates = vec![(
        ValueInput::Raw,
        ValueRange::rows(
            format!("{}!C{row}:E{row}", target_sheet, row = DISTRICT_HEADER_ROW),
            vec![vec![
                json!(STATUS_LABELS[5]),
                json!(STATUS_LABELS[6]),
                json!(STATUS_LABELS[8]),
            ]],
        ),
    )];
    if scanned_rows == 0 {
        return updates;
    }

    let district_rows: Vec<Vec<Value>> = pairs
        .iter()
        .map(|(state, district)| vec![json!(state), json!(district)])
        .collect();
    updates.push((
        ValueInput::Raw,
        ValueRange::rows(
            format!("{}!A{}:B", target_sheet, DISTRICT_TABLE_START_ROW),
            district_rows,
        ),
    ));

    // Hour columns C/D/E read successive rows of each raw block.
    for (offset, col) in ["C", "D", "E"].iter().enumerate() {
        updates.push((
            ValueInput::UserEntered,
            ValueRange::rows(
                format!("{}!{col}{}:{col}", target_sheet, DISTRICT_TABLE_START_ROW),
                hour_column_formulas(raw_sheet, block_size + offset, scanned_rows, block_size),
            ),
        ));
    }

    // Exceed-threshold checks G/H/I mirror C/D/E.
    for (source, check) in [("C", "G"), ("D", "H"), ("E", "I")] {
        updates.push((
            ValueInput::UserEntered,
            ValueRange::rows(
                format!(
                    "{}!{check}{}:{check}{}",
                    target_sheet,
                    DISTRICT_TABLE_START_ROW,
                    DISTRICT_TABLE_START_ROW + scanned_rows - 1,
                ),
                exceed_column_formulas(source, scanned_rows),
            ),
        ));
    }

    // Column totals above the district table.
    updates.push((
        ValueInput::UserEntered,
        ValueRange::rows(
            format!("{}!C{row}:E{row}", target_sheet, row = DISTRICT_SUM_ROW),
            vec![vec![
                json!(format!("=SUM(C{}:C)", DISTRICT_TABLE_START_ROW)),
                json!(format!("=SUM(D{}:D)", DISTRICT_TABLE_START_ROW)),
                json!(format!("=SUM(E{}:E)", DISTRICT_TABLE_START_ROW)),
            ]],
        ),
    ));

    updates
}

async fn district_rollup(client: &SheetsClient, cfg: &SummaryConfig) -> Result<(), GoogleApiError> {
    // (state, district) pairs start below the raw header block.
    let scanned = client
        .values_get(&format!("{}!A3:B", cfg.raw_sheet), ValueRender::FormattedValue)
        .await?;
    if scanned.is_empty() {
        log::warn!("Raw sheet {} has no district rows", cfg.raw_sheet);
    }
    let pairs = district_state_pairs(&scanned);
    log::info!(
        "District rollup: {} districts from {} raw rows",
        pairs.len(),
        scanned.len()
    );

    let updates = district_rollup_updates(
        &cfg.raw_sheet,
        &cfg.target_sheet,
        &pairs,
        scanned.len(),
        cfg.block_size,
    );
    for (input, update) in updates {
        client
            .values_update(&update.range, input, update.values)
            .await?;
    }

    Ok(())
}

// ============================================================================
// Entry point
// ============================================================================

/// Run all three stages against the spreadsheet.
pub async fn run(client: &SheetsClient, cfg: &SummaryConfig) -> Result<(), GoogleApiError> {
    let (raw_rows, _raw_cols) = rebuild_frame(client, cfg).await?;
    write_stage_formulas(client, cfg, raw_rows).await?;
    district_rollup(client, cfg).await?;
    Ok(())
}

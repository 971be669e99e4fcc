//! Column Projector: Audio sheet -> Raw working sheet.
//!
//! The first four columns (state, district, batch, chunk metadata) pass
//! through verbatim. Every column from E onward is rewritten: the header row
//! is copied, and each data cell becomes a formula that strips the "RE-"
//! prefix and coerces the remainder to a number, or a literal 0 when blank.

use serde_json::{json, Value};

use crate::google_api::sheets::{SheetsClient, ValueInput, ValueRender};
use crate::google_api::GoogleApiError;
use crate::grid::col_letter;

/// Columns A-D are copied as-is.
const PASSTHROUGH_COLUMNS: usize = 4;

/// Build the Raw sheet's rows from the Audio sheet's rows.
///
/// `audio_values` is the full FORMULA-rendered range; `num_columns` is the
/// width probed from the Audio sheet's first row. Row index 0 gets empty
/// strings in the transformed columns (the upstream layout reserves that row;
/// intentional, mirror of the original tool).
pub fn project_rows(
    audio_sheet: &str,
    audio_values: &[Vec<String>],
    num_columns: usize,
) -> Vec<Vec<Value>> {
    let mut raw_values = Vec::with_capacity(audio_values.len());

    for (idx, row) in audio_values.iter().enumerate() {
        let mut new_row: Vec<Value> = row
            .iter()
            .take(PASSTHROUGH_COLUMNS)
            .map(|cell| json!(cell))
            .collect();

        for col in PASSTHROUGH_COLUMNS..num_columns {
            if idx == 1 {
                // Header row: copy the literal value, preserving hyperlinks.
                new_row.push(json!(row.get(col).cloned().unwrap_or_default()));
            } else if idx == 0 {
                new_row.push(json!(""));
            } else if row.get(col).is_some_and(|cell| !cell.trim().is_empty()) {
                let letter = col_letter(col as u32 + 1);
                new_row.push(json!(format!(
                    "=SUBSTITUTE({}!{}{}, \"RE-\", \"\", 1)*1",
                    audio_sheet,
                    letter,
                    idx + 1
                )));
            } else {
                new_row.push(json!(0));
            }
        }

        raw_values.push(new_row);
    }

    raw_values
}

/// Run the projection: create the Raw sheet if absent, read the Audio sheet
/// with formulas preserved, write the projected rows at `{raw}!A1`.
pub async fn run(
    client: &SheetsClient,
    audio_sheet: &str,
    raw_sheet: &str,
) -> Result<(), GoogleApiError> {
    if !client.sheet_exists(raw_sheet).await? {
        client.add_sheet(raw_sheet, None).await?;
        log::info!("Created sheet {}", raw_sheet);
    }

    let num_columns = client.row_width(audio_sheet, 1).await?;
    if num_columns == 0 {
        log::warn!("No data found in the {} sheet", audio_sheet);
        return Ok(());
    }

    let range = format!("{}!A1:{}", audio_sheet, col_letter(num_columns as u32));
    let audio_values = client.values_get(&range, ValueRender::Formula).await?;
    if audio_values.is_empty() {
        log::warn!("No data found in the {} sheet", audio_sheet);
        return Ok(());
    }

    let raw_values = project_rows(audio_sheet, &audio_values, num_columns);
    log::info!(
        "Projecting {} rows x {} columns into {}",
        raw_values.len(),
        num_columns,
        raw_sheet
    );

    client
        .values_update(
            &format!("{}!A1", raw_sheet),
            ValueInput::UserEntered,
            raw_values,
        )
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_header_row_passes_through() {
        let values = vec![
            row(&["", "", "", "", ""]),
            row(&["ID", "Name", "Date", "Notes", "RE-50"]),
        ];
        let out = project_rows("Audio", &values, 5);
        assert_eq!(out[1][4], json!("RE-50"));
    }

    #[test]
    fn test_row_zero_yields_empty_strings() {
        let values = vec![row(&["a", "b", "c", "d", "RE-1", "RE-2"])];
        let out = project_rows("Audio", &values, 6);
        assert_eq!(out[0][0], json!("a"));
        assert_eq!(out[0][4], json!(""));
        assert_eq!(out[0][5], json!(""));
    }

    #[test]
    fn test_data_cell_becomes_substitute_formula() {
        let values = vec![
            row(&["", "", "", "", ""]),
            row(&["ID", "Name", "Date", "Notes", "Stage"]),
            row(&["1", "A", "2024", "n", "RE-123"]),
        ];
        let out = project_rows("Audio", &values, 5);
        assert_eq!(
            out[2][4],
            json!("=SUBSTITUTE(Audio!E3, \"RE-\", \"\", 1)*1")
        );
    }

    #[test]
    fn test_blank_data_cell_becomes_zero() {
        let values = vec![
            row(&["", "", "", "", ""]),
            row(&["ID", "Name", "Date", "Notes", "Stage"]),
            row(&["1", "A", "2024", "n", "  "]),
            row(&["2", "B", "2024", "n"]),
        ];
        let out = project_rows("Audio", &values, 5);
        assert_eq!(out[2][4], json!(0));
        // Short row: missing cell also coerces to 0
        assert_eq!(out[3][4], json!(0));
    }

    #[test]
    fn test_end_to_end_scenario() {
        // Raw sheet "Audio": reserved row, header row, one data row.
        let values = vec![
            row(&["", "", "", "", "", "", ""]),
            row(&["ID", "Name", "Date", "Notes", "RE-50", "", "RE-10"]),
            row(&["1", "A", "2024", "n", "RE-40", "", "RE-5"]),
        ];
        let out = project_rows("Audio", &values, 7);

        // Header row copied verbatim
        assert_eq!(out[1][4], json!("RE-50"));
        assert_eq!(out[1][5], json!(""));
        assert_eq!(out[1][6], json!("RE-10"));

        // Row 0: empty strings for transformed columns
        assert_eq!(out[0][4], json!(""));
        assert_eq!(out[0][6], json!(""));

        // Data row: formulas in E and G, literal 0 in F
        assert_eq!(
            out[2][4],
            json!("=SUBSTITUTE(Audio!E3, \"RE-\", \"\", 1)*1")
        );
        assert_eq!(out[2][5], json!(0));
        assert_eq!(
            out[2][6],
            json!("=SUBSTITUTE(Audio!G3, \"RE-\", \"\", 1)*1")
        );
    }

    #[test]
    fn test_first_four_columns_always_verbatim() {
        let values = vec![
            row(&["MH", "Pune", "B1", "RE-7", "RE-7"]),
            row(&["ID", "Name", "Date", "Notes", "Stage"]),
        ];
        let out = project_rows("Audio", &values, 5);
        // Even a "RE-" value in the passthrough region is untouched
        assert_eq!(out[0][3], json!("RE-7"));
    }
}

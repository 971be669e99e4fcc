//! Copy the Audio sheet into the Raw working sheet.
//!
//! Usage:
//!   audio-to-raw --credentials credentials.json --token token.json \
//!       --spreadsheet-id <ID> --audio-sheet-name Audio --raw-sheet-name RawAuto

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use audio_qc_sheets::google_api::sheets::SheetsClient;
use audio_qc_sheets::google_api::Authenticator;
use audio_qc_sheets::projector;

#[derive(Parser)]
#[command(about = "Copy Audio sheet columns into the Raw sheet, rewriting data cells as numeric coercion formulas.")]
struct Args {
    /// Path to the OAuth client credentials JSON file.
    #[arg(long)]
    credentials: PathBuf,

    /// Path to the cached token JSON file.
    #[arg(long, default_value = "token.json")]
    token: PathBuf,

    /// ID of the spreadsheet.
    #[arg(long)]
    spreadsheet_id: String,

    /// Name of the Audio source sheet.
    #[arg(long, default_value = "Audio")]
    audio_sheet_name: String,

    /// Name of the Raw destination sheet.
    #[arg(long, default_value = "RawAuto")]
    raw_sheet_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let auth = Authenticator::new(&args.credentials, &args.token);
    let access_token = auth
        .access_token()
        .await
        .context("Google authorization failed")?;
    let client = SheetsClient::new(access_token, &args.spreadsheet_id);

    projector::run(&client, &args.audio_sheet_name, &args.raw_sheet_name)
        .await
        .context("column projection failed")?;

    println!("Columns copied with formula applied.");
    Ok(())
}

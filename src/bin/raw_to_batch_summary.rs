//! Rebuild the batch audio summary sheet from the Raw sheet.
//!
//! Usage:
//!   raw-to-batch-summary --credentials credentials.json --token token.json \
//!       --spreadsheet-id <ID> --raw-sheet-name RawAuto \
//!       --target-sheet-name BatchAudioSummaryAuto

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use audio_qc_sheets::google_api::sheets::SheetsClient;
use audio_qc_sheets::google_api::Authenticator;
use audio_qc_sheets::summary::{self, SummaryConfig};

#[derive(Parser)]
#[command(about = "Generate the batch audio summary sheet: per-stage hour aggregations and the district rollup.")]
struct Args {
    /// Path to the OAuth client credentials JSON file.
    #[arg(long)]
    credentials: PathBuf,

    /// Path to the cached token JSON file.
    #[arg(long)]
    token: PathBuf,

    /// ID of the spreadsheet.
    #[arg(long)]
    spreadsheet_id: String,

    /// Name of the raw sheet in the spreadsheet.
    #[arg(long)]
    raw_sheet_name: String,

    /// Name of the target summary sheet. Deleted and recreated on each run.
    #[arg(long)]
    target_sheet_name: String,

    /// Rate limit delay between API calls in seconds.
    #[arg(long, default_value_t = 0.5, value_parser = parse_rate_limit_delay)]
    rate_limit_delay: f64,

    /// Rows per QC cycle in the raw sheet layout.
    #[arg(long, default_value_t = SummaryConfig::DEFAULT_BLOCK_SIZE)]
    block_size: usize,
}

/// Duration::from_secs_f64 panics on negative or non-finite input, so reject
/// those at argument parse time.
fn parse_rate_limit_delay(s: &str) -> std::result::Result<f64, String> {
    let seconds: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err("must be a non-negative number of seconds".to_string());
    }
    Ok(seconds)
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

    let cfg = SummaryConfig {
        raw_sheet: args.raw_sheet_name,
        target_sheet: args.target_sheet_name,
        rate_limit_delay: Duration::from_secs_f64(args.rate_limit_delay),
        block_size: args.block_size,
    };

    summary::run(&client, &cfg)
        .await
        .context("summary generation failed")?;

    println!("Batch summary sheet rebuilt.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_limit_delay_accepts_non_negative() {
        assert_eq!(parse_rate_limit_delay("0.5").unwrap(), 0.5);
        assert_eq!(parse_rate_limit_delay("0").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_rate_limit_delay_rejects_bad_input() {
        assert!(parse_rate_limit_delay("-1").is_err());
        assert!(parse_rate_limit_delay("NaN").is_err());
        assert!(parse_rate_limit_delay("inf").is_err());
        assert!(parse_rate_limit_delay("soon").is_err());
    }

    #[test]
    fn test_args_reject_negative_delay() {
        let result = Args::try_parse_from([
            "raw-to-batch-summary",
            "--credentials",
            "credentials.json",
            "--token",
            "token.json",
            "--spreadsheet-id",
            "abc",
            "--raw-sheet-name",
            "RawAuto",
            "--target-sheet-name",
            "Summary",
            "--rate-limit-delay",
            "-0.5",
        ]);
        assert!(result.is_err());
    }
}

//! Option listing commands

use super::{batch_config, print_banner, RequestArgs};
use anyhow::Result;
use dp_api_client::endpoints::{DimensionOption, DimensionRef, FilterOption};
use dp_api_client::DpClient;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::time::Instant;
use tracing::debug;

/// JSON output for an option listing
#[derive(Debug, Serialize)]
struct JsonOptionsOutput<'a, T> {
    total: usize,
    etag: Option<&'a str>,
    elapsed_ms: u128,
    options: &'a [T],
}

/// List every option of a dataset dimension
pub async fn run_dataset(
    request: &RequestArgs,
    dimension: &DimensionRef,
    page_size: Option<NonZeroUsize>,
    workers: Option<NonZeroUsize>,
    format: &str,
) -> Result<()> {
    let client = DpClient::new()?;
    let batch = batch_config(&client, page_size, workers);
    debug!(?dimension, ?batch, "listing dataset options");

    let start = Instant::now();
    let page = client
        .datasets()
        .get_options_in_batches(&request.headers(), dimension, &batch)
        .await?;
    let elapsed = start.elapsed();

    if format == "json" {
        let output = JsonOptionsOutput {
            total: page.total_count,
            etag: None,
            elapsed_ms: elapsed.as_millis(),
            options: &page.items,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_banner(&format!(
        "{} / {} / {} / {}",
        dimension.dataset_id, dimension.edition, dimension.version, dimension.dimension
    ));

    println!("  {:<30} {}", "Option".dimmed(), "Label".dimmed());
    println!("  {}", "─".repeat(60).dimmed());
    for DimensionOption { option, label, .. } in &page.items {
        println!("  {:<30} {}", option.green(), label);
    }

    print_summary(page.total_count, None, elapsed.as_millis());
    Ok(())
}

/// List the options selected for a filter dimension
pub async fn run_filter(
    request: &RequestArgs,
    filter_id: &str,
    dimension: &str,
    page_size: Option<NonZeroUsize>,
    workers: Option<NonZeroUsize>,
    validate_etag: bool,
    format: &str,
) -> Result<()> {
    let client = DpClient::new()?;
    let mut batch = batch_config(&client, page_size, workers);
    if validate_etag {
        batch = batch.with_token_validation(true);
    }
    debug!(filter_id, dimension, ?batch, "listing filter options");

    let start = Instant::now();
    let result = client
        .filters()
        .get_dimension_options_in_batches(&request.headers(), filter_id, dimension, &batch)
        .await?;
    let elapsed = start.elapsed();

    if format == "json" {
        let output = JsonOptionsOutput {
            total: result.body.total_count,
            etag: result.etag.as_deref(),
            elapsed_ms: elapsed.as_millis(),
            options: &result.body.items,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_banner(&format!("filter {filter_id} / {dimension}"));

    for FilterOption { option, .. } in &result.body.items {
        println!("  {}", option.green());
    }

    print_summary(
        result.body.total_count,
        result.etag.as_deref(),
        elapsed.as_millis(),
    );
    Ok(())
}

fn print_summary(total: usize, etag: Option<&str>, elapsed_ms: u128) {
    println!();
    println!(
        "  Total: {} options ({}ms)",
        total.to_string().green(),
        elapsed_ms.to_string().dimmed()
    );
    if let Some(etag) = etag {
        println!("  ETag: {}", etag.cyan());
    }
    println!();
}

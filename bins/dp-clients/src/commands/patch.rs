//! Filter patch command

use super::{print_banner, RequestArgs};
use anyhow::{bail, Result};
use dp_api_client::{ApiError, DpClient};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::num::NonZeroUsize;

/// Options to add to and remove from a filter dimension
#[derive(Debug, Default)]
pub struct Change {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl Change {
    fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// Number of PATCH requests needed at `batch_size` options per request
    fn request_count(&self, batch_size: NonZeroUsize) -> usize {
        self.add.len().div_ceil(batch_size.get()) + self.remove.len().div_ceil(batch_size.get())
    }
}

/// JSON output for a patch
#[derive(Debug, Serialize)]
struct JsonPatchOutput<'a> {
    filter_id: &'a str,
    dimension: &'a str,
    added: usize,
    removed: usize,
    requests: usize,
    etag: Option<String>,
}

/// Apply a change to a filter dimension
pub async fn run(
    request: &RequestArgs,
    filter_id: &str,
    dimension: &str,
    change: &Change,
    batch_size: NonZeroUsize,
    if_match: Option<String>,
    format: &str,
) -> Result<()> {
    if change.is_empty() {
        bail!("nothing to change, pass --add or --remove");
    }

    let client = DpClient::new()?;
    if client.config().service_auth_token.is_none() {
        return Err(ApiError::missing_env("DP_SERVICE_AUTH_TOKEN").into());
    }

    let headers = request.headers().expecting(if_match);
    let requests = change.request_count(batch_size);

    if format != "json" {
        print_banner(&format!("Patching filter {filter_id} / {dimension}"));
        println!(
            "  Adding {}, removing {} in {} requests",
            change.add.len().to_string().green(),
            change.remove.len().to_string().yellow(),
            requests
        );
    }

    let etag = client
        .filters()
        .patch_dimension_values(
            &headers,
            filter_id,
            dimension,
            &change.add,
            &change.remove,
            batch_size,
        )
        .await?;

    if format == "json" {
        let output = JsonPatchOutput {
            filter_id,
            dimension,
            added: change.add.len(),
            removed: change.remove.len(),
            requests,
            etag,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("  {}", "✓ Done".green());
    if let Some(etag) = etag {
        println!("  ETag: {}", etag.cyan());
    }
    println!();
    Ok(())
}

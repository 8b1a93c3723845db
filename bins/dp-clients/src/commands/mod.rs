//! CLI command implementations

pub mod options;
pub mod patch;

use dp_api_client::{DpClient, RequestHeaders};
use dp_core::BatchConfig;
use owo_colors::OwoColorize;
use std::num::NonZeroUsize;

const RULE: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Identity headers given on the command line
pub struct RequestArgs {
    pub user_token: Option<String>,
    pub collection_id: Option<String>,
}

impl RequestArgs {
    /// Headers for a request made on behalf of the caller
    pub fn headers(&self) -> RequestHeaders {
        let mut headers = RequestHeaders::new();
        if let Some(ref token) = self.user_token {
            headers = headers.with_user_auth_token(token);
        }
        if let Some(ref collection_id) = self.collection_id {
            headers = headers.with_collection_id(collection_id);
        }
        headers
    }
}

/// Overlay command line paging flags on the configured batch settings
pub fn batch_config(
    client: &DpClient,
    page_size: Option<NonZeroUsize>,
    workers: Option<NonZeroUsize>,
) -> BatchConfig {
    let mut batch = client.config().batch;
    if let Some(page_size) = page_size {
        batch = batch.with_page_size(page_size);
    }
    if let Some(workers) = workers {
        batch = batch.with_max_workers(workers);
    }
    batch
}

/// Print a section banner
pub fn print_banner(title: &str) {
    println!();
    println!("{}", RULE.blue());
    println!("  {}", title.blue().bold());
    println!("{}", RULE.blue());
    println!();
}

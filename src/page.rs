// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use log::info;

use crate::{markup::Document, prelude::*, transport::Transport};

/// Load a page from a local JSON file, or fetch it through `transport` if
/// `source` is not an existing file.
pub fn load_page(source: &str, transport: &dyn Transport) -> Result<Document> {
    try_forward(
        || {
            let path = Path::new(source);
            let json = if path.is_file() {
                info!("Loading page from {}", path.display());
                std::fs::read_to_string(path)?
            } else {
                transport.get(source)?.into_success()?
            };
            Document::from_json(&json)
        },
        || format!("Error loading page {source}"),
    )
}

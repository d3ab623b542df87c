// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use log::{debug, info};
use reqwest::{header, Url};

use crate::{error::ActionError, prelude::*};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}
impl HttpReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body of a 2xx reply, or a `Server` error for any other status.
    pub fn into_success(self) -> std::result::Result<String, ActionError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(ActionError::Server {
                status: self.status,
            })
        }
    }
}

/// Way of talking to the listing backend.
///
/// Implementations block; the controller calls them from worker threads.
pub trait Transport: std::fmt::Debug + Send + Sync {
    fn post(&self, url: &str) -> std::result::Result<HttpReply, ActionError>;
    fn get(&self, url: &str) -> std::result::Result<HttpReply, ActionError>;
}

/// Transport that talks HTTP to a real server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: Url,
}
impl HttpTransport {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self> {
        let base_url = try_forward(|| Ok(Url::parse(base_url)?), || {
            format!("Invalid base URL {base_url}")
        })?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, "application/json".parse()?);

        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .default_headers(default_headers)
            .timeout(None)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, url: &str) -> std::result::Result<Url, ActionError> {
        self.base_url
            .join(url)
            .map_err(|err| ActionError::Network(format!("invalid URL {url}: {err}")))
    }

    fn send(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> std::result::Result<HttpReply, ActionError> {
        let response = request
            .send()
            .map_err(|err| ActionError::Network(err.to_string()))?;
        debug!("Response: {:?}", &response);

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| ActionError::Network(err.to_string()))?;
        Ok(HttpReply { status, body })
    }
}
impl Transport for HttpTransport {
    fn post(&self, url: &str) -> std::result::Result<HttpReply, ActionError> {
        let url = self.resolve(url)?;
        info!("POST {}", url);
        self.send(self.client.post(url))
    }

    fn get(&self, url: &str) -> std::result::Result<HttpReply, ActionError> {
        let url = self.resolve(url)?;
        info!("GET {}", url);
        self.send(self.client.get(url))
    }
}

/// Transport that answers from canned files.
///
/// Each reply lives in a file named after the method and URL with all `/`
/// removed, e.g. `POST listing7star` for a `POST` to `/listing/7/star`. An
/// optional `<name>.status` file holds a non-200 status code.
#[derive(Debug, Clone)]
pub struct MockTransport {
    pub mock_data_path: PathBuf,
}
impl MockTransport {
    pub fn new(mock_data_path: impl Into<PathBuf>) -> Self {
        Self {
            mock_data_path: mock_data_path.into(),
        }
    }

    fn reply(&self, method: &str, url: &str) -> std::result::Result<HttpReply, ActionError> {
        let mut name = format!("{method} {url}");
        name.retain(|c| c != '/');

        let path = self.mock_data_path.join(&name);
        let body = std::fs::read_to_string(&path).map_err(|err| {
            ActionError::Network(format!(
                "failed to read mock data file {name} for `{method} {url}`: {err}"
            ))
        })?;

        let status_path = self.mock_data_path.join(format!("{name}.status"));
        let status = match std::fs::read_to_string(&status_path) {
            Ok(status) => status.trim().parse().map_err(|err| {
                ActionError::Network(format!("bad status in {}: {err}", status_path.display()))
            })?,
            Err(_) => 200,
        };

        Ok(HttpReply { status, body })
    }
}
impl Transport for MockTransport {
    fn post(&self, url: &str) -> std::result::Result<HttpReply, ActionError> {
        self.reply("POST", url)
    }

    fn get(&self, url: &str) -> std::result::Result<HttpReply, ActionError> {
        self.reply("GET", url)
    }
}

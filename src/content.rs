use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, info, instrument, warn};

/// Confirms that an asset's content can actually be fetched before it is stored.
#[async_trait]
pub trait ContentChecker: Send + Sync {
    async fn check(&self, uri: &str) -> bool;
}

/// Reachability over HTTP for URLs, existence for local files.
#[derive(Clone)]
pub struct HttpContentChecker {
    client: Client,
}

const USER_AGENT: &str = concat!("signage/", env!("CARGO_PKG_VERSION"));

impl HttpContentChecker {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    async fn check_url(&self, url: Url) -> bool {
        match self.client.head(url.clone()).send().await {
            Ok(response) if ok_status(response.status()) => return true,
            Ok(response) => debug!(status = %response.status(), "HEAD refused, retrying with GET"),
            Err(e) => debug!(error = %e, "HEAD failed, retrying with GET"),
        }

        // Some servers reject HEAD outright. Only the status line is needed, the body
        // is dropped unread.
        match self.client.get(url).send().await {
            Ok(response) => ok_status(response.status()),
            Err(e) => {
                warn!(error = %e, "content check failed");
                false
            }
        }
    }
}

fn ok_status(status: reqwest::StatusCode) -> bool {
    status.is_success() || status.is_redirection()
}

#[async_trait]
impl ContentChecker for HttpContentChecker {
    #[instrument(skip(self))]
    async fn check(&self, uri: &str) -> bool {
        if uri.starts_with('/') {
            return tokio::fs::metadata(uri)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
        }

        let Ok(url) = Url::parse(uri) else {
            return false;
        };

        match url.scheme() {
            "http" | "https" => self.check_url(url).await,
            "file" => match url.to_file_path() {
                Ok(path) => tokio::fs::metadata(path)
                    .await
                    .map(|meta| meta.is_file())
                    .unwrap_or(false),
                Err(()) => false,
            },
            scheme => {
                // Streams (rtsp, rtmp, ...) can only be probed by a player.
                info!(scheme, "cannot probe scheme, assuming reachable");
                true
            }
        }
    }
}

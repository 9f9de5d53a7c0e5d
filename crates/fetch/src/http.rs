//! `HttpFetcher`: tries an ordered list of upstream mirrors with bounded
//! retries and inter-attempt sleep, observing a HEAD precheck before
//! downloading a subset.

use crate::error::FetchError;
use crate::trait_def::{GribDecoder, VariableFetcher};
use crate::types::{FetchRequest, RawGrid};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Builds a download URL for one `(mirror, request)` pair from a
/// `{bucket}/{prefix_template}/{file_pattern}`-style template.
#[derive(Debug, Clone)]
pub struct MirrorTemplate {
    pub name: String,
    pub bucket_url: String,
    pub prefix_template: String,
    pub file_pattern: String,
}

impl MirrorTemplate {
    pub fn build_url(&self, req: &FetchRequest) -> String {
        let date = req.run_time.format("%Y%m%d").to_string();
        let cycle = req.run_time.format("%H").to_string();
        let prefix = self
            .prefix_template
            .replace("{date}", &date)
            .replace("{cycle:02}", &cycle)
            .replace("{product}", &req.product);
        let file = self
            .file_pattern
            .replace("{cycle:02}", &cycle)
            .replace("{forecast:03}", &format!("{:03}", req.fh))
            .replace("{product}", &req.product);
        format!("{}/{}/{}", self.bucket_url.trim_end_matches('/'), prefix, file)
    }
}

pub struct HttpFetcherConfig {
    pub mirrors: Vec<MirrorTemplate>,
    pub retries_per_mirror: u32,
    pub retry_sleep: Duration,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self { mirrors: Vec::new(), retries_per_mirror: 2, retry_sleep: Duration::from_millis(600) }
    }
}

pub struct HttpFetcher {
    client: Client,
    config: HttpFetcherConfig,
    decoder: Arc<dyn GribDecoder>,
}

impl HttpFetcher {
    pub fn new(config: HttpFetcherConfig, decoder: Arc<dyn GribDecoder>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { client, config, decoder }
    }

    async fn head_exists(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(url = %url, error = %e, "HEAD precheck failed");
                false
            }
        }
    }
}

#[async_trait]
impl VariableFetcher for HttpFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<RawGrid, FetchError> {
        let mirror_names: Vec<String> = self.config.mirrors.iter().map(|m| m.name.clone()).collect();
        let mut saw_transient = false;
        let mut last_hard_reason: Option<String> = None;

        for mirror in &self.config.mirrors {
            let url = mirror.build_url(req);
            for attempt in 1..=self.config.retries_per_mirror {
                if !self.head_exists(&url).await {
                    saw_transient = true;
                    warn!(url = %url, mirror = %mirror.name, attempt, "subset not yet available");
                    if attempt < self.config.retries_per_mirror {
                        tokio::time::sleep(self.config.retry_sleep).await;
                    }
                    continue;
                }

                let bytes = match self.client.get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                        Ok(b) if !b.is_empty() => b,
                        Ok(_) => {
                            saw_transient = true;
                            warn!(url = %url, "download returned empty body");
                            if attempt < self.config.retries_per_mirror {
                                tokio::time::sleep(self.config.retry_sleep).await;
                            }
                            continue;
                        }
                        Err(e) => {
                            last_hard_reason = Some(format!("body read failed: {e}"));
                            continue;
                        }
                    },
                    Ok(resp) if resp.status().as_u16() == 404 => {
                        saw_transient = true;
                        warn!(url = %url, "subset not found (404)");
                        if attempt < self.config.retries_per_mirror {
                            tokio::time::sleep(self.config.retry_sleep).await;
                        }
                        continue;
                    }
                    Ok(resp) => {
                        last_hard_reason = Some(format!("unexpected status {}", resp.status()));
                        continue;
                    }
                    Err(e) => {
                        last_hard_reason = Some(format!("request failed: {e}"));
                        continue;
                    }
                };

                return self.decoder.decode(&bytes).map_err(|reason| FetchError::HardFailure {
                    model: req.model_id.clone(),
                    fh: req.fh,
                    search_pattern: req.search_pattern.clone(),
                    reason,
                });
            }
        }

        if let Some(reason) = last_hard_reason {
            if !saw_transient {
                return Err(FetchError::HardFailure {
                    model: req.model_id.clone(),
                    fh: req.fh,
                    search_pattern: req.search_pattern.clone(),
                    reason,
                });
            }
        }

        Err(FetchError::TransientUnavailable {
            model: req.model_id.clone(),
            fh: req.fh,
            search_pattern: req.search_pattern.clone(),
            mirrors: mirror_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn builds_url_from_template() {
        let mirror = MirrorTemplate {
            name: "aws".to_string(),
            bucket_url: "https://noaa-hrrr-bdp-pds.s3.amazonaws.com".to_string(),
            prefix_template: "hrrr.{date}/conus".to_string(),
            file_pattern: "hrrr.t{cycle:02}z.wrfsfcf{forecast:03}.grib2".to_string(),
        };
        let req = FetchRequest {
            model_id: "hrrr".to_string(),
            product: "sfc".to_string(),
            search_pattern: ":TMP:2 m above ground:".to_string(),
            run_time: chrono::Utc.with_ymd_and_hms(2026, 2, 17, 6, 0, 0).unwrap(),
            fh: 3,
        };
        assert_eq!(
            mirror.build_url(&req),
            "https://noaa-hrrr-bdp-pds.s3.amazonaws.com/hrrr.20260217/conus/hrrr.t06z.wrfsfcf003.grib2"
        );
    }
}

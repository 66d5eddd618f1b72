//! HTTP download of the CSSE global time-series CSVs.

use reqwest::blocking::Client;

use crate::error::AppError;

pub const CONFIRMED_GLOBAL_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_global.csv";
pub const DEATHS_GLOBAL_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_deaths_global.csv";

/// The two feeds one ingestion run needs.
#[derive(Debug, Clone)]
pub struct FeedUrls {
    pub confirmed: String,
    pub deaths: String,
}

/// Raw CSV bodies as downloaded.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub confirmed_csv: String,
    pub deaths_csv: String,
}

pub struct FeedClient {
    client: Client,
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedClient {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    /// Download both feeds. Either failing fails the whole fetch; no retries.
    pub fn fetch_snapshot(&self, urls: &FeedUrls) -> Result<FeedSnapshot, AppError> {
        let confirmed_csv = self.fetch_csv(&urls.confirmed)?;
        let deaths_csv = self.fetch_csv(&urls.deaths)?;
        Ok(FeedSnapshot {
            confirmed_csv,
            deaths_csv,
        })
    }

    fn fetch_csv(&self, url: &str) -> Result<String, AppError> {
        log::info!("fetching {url}");
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::runtime(format!("Feed request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::runtime(format!(
                "Feed request to {url} failed with status {}.",
                resp.status()
            )));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::runtime(format!("Failed to read feed body: {e}")))?;
        log::debug!("fetched {} bytes from {url}", body.len());
        Ok(body)
    }
}

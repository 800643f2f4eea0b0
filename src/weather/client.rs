//! OpenWeatherMap client

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::{ForecastSample, WeatherService, WeatherServiceError};
use crate::config::WeatherConfig;

const CURRENT_ENDPOINT: &str = "weather";
const HISTORIC_ENDPOINT: &str = "onecall/timemachine";
const FORECAST_ENDPOINT: &str = "forecast";

/// Weather client for the OpenWeatherMap 2.5 API
pub struct OpenWeatherClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl OpenWeatherClient {
    /// Create a new client from configuration
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("Missing weather API key (weather.api_key)")?;
        let timeout = Duration::from_secs(u64::from(config.timeout_seconds));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("HotelClimate/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create weather HTTP client")?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, endpoint: &str, latitude: f64, longitude: f64, extra: &str) -> String {
        format!(
            "{}/{}?lat={}&lon={}&appid={}{}",
            self.base_url,
            endpoint,
            latitude,
            longitude,
            urlencoding::encode(&self.api_key),
            extra
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: String,
    ) -> Result<T, WeatherServiceError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await.map_err(|err| {
            if matches!(&err, reqwest_middleware::Error::Reqwest(inner) if inner.is_timeout()) {
                WeatherServiceError::Timeout(self.timeout)
            } else {
                WeatherServiceError::Http(err)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Weather {} request failed with HTTP {}", endpoint, status);
            return Err(WeatherServiceError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response
            .json()
            .await
            .map_err(|e| WeatherServiceError::Malformed {
                endpoint,
                message: e.to_string(),
            })?;
        debug!(
            "Weather {} request completed in {:.3}s",
            endpoint,
            start.elapsed().as_secs_f64()
        );
        Ok(body)
    }
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    #[instrument(level = "debug", skip(self))]
    async fn timezone_offset(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<i64, WeatherServiceError> {
        let url = self.url(CURRENT_ENDPOINT, latitude, longitude, "");
        let body: openweather::CurrentResponse = self.get_json(CURRENT_ENDPOINT, url).await?;
        body.timezone_offset()
    }

    #[instrument(level = "debug", skip(self))]
    async fn historic_temperatures(
        &self,
        latitude: f64,
        longitude: f64,
        at: i64,
    ) -> Result<Vec<f64>, WeatherServiceError> {
        let extra = format!("&dt={at}&units=metric");
        let url = self.url(HISTORIC_ENDPOINT, latitude, longitude, &extra);
        let body: openweather::TimeMachineResponse = self.get_json(HISTORIC_ENDPOINT, url).await?;
        body.temperatures()
    }

    #[instrument(level = "debug", skip(self))]
    async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<ForecastSample>, WeatherServiceError> {
        let url = self.url(FORECAST_ENDPOINT, latitude, longitude, "&units=metric");
        let body: openweather::ForecastResponse = self.get_json(FORECAST_ENDPOINT, url).await?;
        body.samples()
    }
}

/// OpenWeatherMap API response structures
mod openweather {
    use serde::Deserialize;

    use super::{
        CURRENT_ENDPOINT, FORECAST_ENDPOINT, ForecastSample, HISTORIC_ENDPOINT,
        WeatherServiceError,
    };

    /// Current weather; only the UTC shift is used
    #[derive(Debug, Deserialize)]
    pub struct CurrentResponse {
        pub timezone: Option<i64>,
    }

    #[derive(Debug, Deserialize)]
    pub struct TimeMachineResponse {
        pub hourly: Option<Vec<HourlyData>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct HourlyData {
        pub temp: Option<f64>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub list: Option<Vec<ForecastEntry>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ForecastEntry {
        pub dt: Option<i64>,
        pub main: Option<MainData>,
    }

    #[derive(Debug, Deserialize)]
    pub struct MainData {
        pub temp: Option<f64>,
    }

    impl CurrentResponse {
        pub fn timezone_offset(self) -> Result<i64, WeatherServiceError> {
            self.timezone.ok_or(WeatherServiceError::MissingField {
                endpoint: CURRENT_ENDPOINT,
                field: "timezone",
            })
        }
    }

    impl TimeMachineResponse {
        pub fn temperatures(self) -> Result<Vec<f64>, WeatherServiceError> {
            let missing = |field: &'static str| WeatherServiceError::MissingField {
                endpoint: HISTORIC_ENDPOINT,
                field,
            };
            self.hourly
                .ok_or_else(|| missing("hourly"))?
                .into_iter()
                .map(|hour| hour.temp.ok_or_else(|| missing("hourly.temp")))
                .collect()
        }
    }

    impl ForecastResponse {
        pub fn samples(self) -> Result<Vec<ForecastSample>, WeatherServiceError> {
            let missing = |field: &'static str| WeatherServiceError::MissingField {
                endpoint: FORECAST_ENDPOINT,
                field,
            };
            self.list
                .ok_or_else(|| missing("list"))?
                .into_iter()
                .map(|entry| -> Result<ForecastSample, WeatherServiceError> {
                    Ok(ForecastSample {
                        timestamp: entry.dt.ok_or_else(|| missing("list.dt"))?,
                        temperature: entry
                            .main
                            .and_then(|main| main.temp)
                            .ok_or_else(|| missing("list.main.temp"))?,
                    })
                })
                .collect()
        }
    }
}

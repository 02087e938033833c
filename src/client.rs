use std::error::Error as StdError;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::{
    config::Settings,
    models::{ChartRow, ChartSeries, SimulationParams, SimulationResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Simulate,
    Charts,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Simulate => "/simulate",
            Self::Charts => "/charts",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Simulate => "simulate",
            Self::Charts => "charts",
        }
    }
}

/// A decoded 2xx response together with what came over the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub status: u16,
    pub body: String,
    pub payload: T,
}

/// Every way a single backend call can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("could not reach the backend: {0}")]
    Transport(String),
    #[error("backend returned HTTP {status}")]
    Status { status: u16, body: String },
    #[error("backend returned {content_type:?} instead of JSON")]
    NotJson {
        status: u16,
        content_type: String,
        body: String,
    },
    #[error("unexpected JSON shape: {message}")]
    Decode {
        status: u16,
        body: String,
        message: String,
    },
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::NotJson { .. } => "not_json",
            Self::Decode { .. } => "decode",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(_) => None,
            Self::Status { status, .. }
            | Self::NotJson { status, .. }
            | Self::Decode { status, .. } => Some(*status),
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Transport(_) => None,
            Self::Status { body, .. } | Self::NotJson { body, .. } | Self::Decode { body, .. } => {
                Some(body.as_str())
            }
        }
    }
}

// reqwest's top-level message hides the cause ("error sending request"), so walk the chain.
fn describe(err: &reqwest::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        msg.push_str(": ");
        msg.push_str(&e.to_string());
        source = e.source();
    }
    msg
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self> {
        // Library defaults: no timeout, no retry.
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build backend http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.backend_base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    pub async fn simulate(
        &self,
        params: &SimulationParams,
    ) -> Result<Fetched<SimulationResult>, FetchError> {
        let fetched = self
            .get_json::<SimulationResult>(Endpoint::Simulate, &params.to_query())
            .await?;
        let bad = fetched.payload.out_of_range_fields();
        if !bad.is_empty() {
            log::warn!("backend.range op=simulate fields={}", bad.join(","));
        }
        Ok(fetched)
    }

    pub async fn charts(&self) -> Result<Fetched<ChartSeries>, FetchError> {
        let fetched = self.get_json::<Vec<ChartRow>>(Endpoint::Charts, &[]).await?;
        let series = ChartSeries::from_rows(fetched.payload).map_err(|e| FetchError::Decode {
            status: fetched.status,
            body: fetched.body.clone(),
            message: e.to_string(),
        })?;
        Ok(Fetched {
            status: fetched.status,
            body: fetched.body,
            payload: series,
        })
    }

    /// One GET, no retry. Status is checked before content-type, content-type before decoding.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        query: &[(&'static str, String)],
    ) -> Result<Fetched<T>, FetchError> {
        let op = endpoint.name();
        let url = self.url(endpoint);
        log::info!("backend.request op={} url={} params={}", op, url, query.len());

        let mut req = self.http.get(&url);
        if !query.is_empty() {
            req = req.query(query);
        }

        let res = req.send().await.map_err(|e| {
            let err = FetchError::Transport(describe(&e));
            log::warn!("backend.error op={} kind={} {}", op, err.kind(), err);
            err
        })?;

        let status = res.status();
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = res
            .text()
            .await
            .map_err(|e| FetchError::Transport(describe(&e)))?;

        log::info!(
            "backend.response op={} status={} content_type={} bytes={}",
            op,
            status.as_u16(),
            content_type,
            body.len()
        );

        let status = status.as_u16();
        let result = if !(200..300).contains(&status) {
            Err(FetchError::Status { status, body })
        } else if !content_type
            .to_ascii_lowercase()
            .starts_with("application/json")
        {
            Err(FetchError::NotJson {
                status,
                content_type,
                body,
            })
        } else {
            match serde_json::from_str::<T>(&body) {
                Ok(payload) => Ok(Fetched {
                    status,
                    body,
                    payload,
                }),
                Err(e) => Err(FetchError::Decode {
                    status,
                    message: e.to_string(),
                    body,
                }),
            }
        };

        if let Err(e) = &result {
            log::warn!("backend.error op={} kind={} {}", op, e.kind(), e);
        }
        result
    }
}

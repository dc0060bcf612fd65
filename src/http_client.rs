use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use crate::error::FetchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// The network seam of the fetch client. Tests script it; production uses reqwest.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(&str, &str)],
    ) -> Result<TransportResponse, FetchError>;
}

pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build http client")
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(&str, &str)],
    ) -> Result<TransportResponse, FetchError> {
        let mut req = self
            .client
            .get(url)
            .query(query)
            .header(USER_AGENT, "fc-descansa/0.1");
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let resp = req.send()?;
        let status = resp.status().as_u16();
        let body = resp.text()?;
        Ok(TransportResponse { status, body })
    }
}

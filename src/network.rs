/*
 * SPDX-License-Identifier: MIT
 *
 * Permission is hereby granted, free of charge, to any person obtaining a
 * copy of this software and associated documentation files (the "Software"),
 * to deal in the Software without restriction, including without limitation
 * the rights to use, copy, modify, merge, publish, distribute, sublicense,
 * and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in
 * all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
 * THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
 * FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
 * DEALINGS IN THE SOFTWARE.
 */
use std::time::Duration;

use reqwest::{
    blocking::Client as HttpClient, blocking::ClientBuilder as HttpClientBuilder,
    header::HeaderValue, header::ACCEPT, header::CONTENT_TYPE, Method, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

pub use crate::RedfishError;

pub const REDFISH_ENDPOINT: &str = "redfish/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug)]
pub struct RedfishClientPoolBuilder {
    timeout: Duration,
    accept_invalid_certs: bool,
}

impl RedfishClientPoolBuilder {
    /// Prevents the pool from accepting self signed certificates and other
    /// invalid certificates.
    ///
    /// By default self signed certificates will be accepted, since BMCs
    /// usually use those.
    pub fn reject_invalid_certs(mut self) -> RedfishClientPoolBuilder {
        self.accept_invalid_certs = false;
        self
    }

    /// Overwrites the timeout that will be applied to every request
    pub fn timeout(mut self, timeout: Duration) -> RedfishClientPoolBuilder {
        self.timeout = timeout;
        self
    }

    /// Builds the shared HTTP connection pool
    pub fn build(&self) -> Result<RedfishClientPool, RedfishError> {
        let http_client = HttpClientBuilder::new()
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .timeout(self.timeout)
            .build()
            .map_err(RedfishError::ClientBuild)?;
        Ok(RedfishClientPool { http_client })
    }
}

/// The BMC endpoint a client talks to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    /// Hostname or IP address of BMC
    pub host: String,
    /// BMC port. If absent the default HTTPS port 443 will be used
    pub port: Option<u16>,
    /// BMC username
    pub user: Option<String>,
    /// BMC password
    pub password: Option<String>,
}

/// Shared HTTP connection pool for all BMCs the conductor manages. Cheap
/// to clone; per-node clients borrow its underlying reqwest client.
#[derive(Debug, Clone)]
pub struct RedfishClientPool {
    http_client: HttpClient,
}

impl RedfishClientPool {
    /// Returns Builder for configuring the Redfish HTTP connection pool
    pub fn builder() -> RedfishClientPoolBuilder {
        RedfishClientPoolBuilder {
            timeout: DEFAULT_TIMEOUT,
            // BMCs often have a self-signed cert, so usually this has to be true
            accept_invalid_certs: true,
        }
    }

    /// Creates a HTTP client targeting a single BMC endpoint
    pub fn client_for(&self, endpoint: Endpoint) -> RedfishHttpClient {
        RedfishHttpClient {
            endpoint,
            http_client: self.http_client.clone(),
        }
    }
}

/// A HTTP client which targets a single Redfish endpoint
#[derive(Debug, Clone)]
pub struct RedfishHttpClient {
    endpoint: Endpoint,
    http_client: HttpClient,
}

impl RedfishHttpClient {
    pub fn get<T>(&self, api: &str) -> Result<T, RedfishError>
    where
        T: DeserializeOwned + ::std::fmt::Debug,
    {
        let (_status_code, resp_opt) = self.req::<T, String>(Method::GET, api, None)?;
        match resp_opt {
            Some(response_body) => Ok(response_body),
            None => Err(RedfishError::NoContent),
        }
    }

    pub fn post<B>(&self, api: &str, data: B) -> Result<StatusCode, RedfishError>
    where
        B: Serialize + ::std::fmt::Debug,
    {
        let (status_code, _resp_body): (_, Option<serde_json::Value>) =
            self.req(Method::POST, api, Some(data))?;
        Ok(status_code)
    }

    pub fn patch<B>(&self, api: &str, data: B) -> Result<StatusCode, RedfishError>
    where
        B: Serialize + ::std::fmt::Debug,
    {
        let (status_code, _resp_body): (_, Option<serde_json::Value>) =
            self.req(Method::PATCH, api, Some(data))?;
        Ok(status_code)
    }

    // All the HTTP requests happen from here.
    fn req<T, B>(
        &self,
        method: Method,
        api: &str,
        body: Option<B>,
    ) -> Result<(StatusCode, Option<T>), RedfishError>
    where
        T: DeserializeOwned + ::std::fmt::Debug,
        B: Serialize + ::std::fmt::Debug,
    {
        let url = match self.endpoint.port {
            Some(p) => format!(
                "https://{}:{}/{}/{}",
                self.endpoint.host, p, REDFISH_ENDPOINT, api
            ),
            None => format!(
                "https://{}/{}/{}",
                self.endpoint.host, REDFISH_ENDPOINT, api
            ),
        };
        let body_enc = match body {
            Some(b) => Some(serde_json::to_string(&b).map_err(|e| {
                RedfishError::JsonSerializeError {
                    url: url.clone(),
                    object_debug: format!("{b:?}"),
                    source: e,
                }
            })?),
            None => None,
        };
        debug!(
            "TX {} {} {}",
            method,
            url,
            body_enc.as_deref().unwrap_or_default()
        );

        let mut req_b = match method {
            Method::GET => self.http_client.get(&url),
            Method::POST => self.http_client.post(&url),
            Method::PATCH => self.http_client.patch(&url),
            _ => unreachable!("Only GET, POST and PATCH http methods are used."),
        };
        req_b = req_b
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(user) = &self.endpoint.user {
            req_b = req_b.basic_auth(user, self.endpoint.password.as_ref());
        }
        if let Some(b) = body_enc {
            req_b = req_b.body(b);
        }
        let response = req_b.send().map_err(|e| RedfishError::NetworkError {
            url: url.clone(),
            source: e,
        })?;
        let status_code = response.status();
        if status_code == StatusCode::CONFLICT {
            // 409 is how Dell responds if we try to turn off a system that's already off, etc.
            // Note that Lenovo accepts these unnecessary operations and returns '204 No Content'.
            return Err(RedfishError::UnnecessaryOperation);
        }
        // read the body even if not status 2XX, because BMCs give useful error messages as JSON
        let response_body = response.text().map_err(|e| RedfishError::NetworkError {
            url: url.clone(),
            source: e,
        })?;
        let mut res = None;
        if !response_body.is_empty() {
            debug!("RX {status_code} {response_body}");
            match serde_json::from_str(&response_body) {
                Ok(v) => res.insert(v),
                Err(e) => {
                    return Err(RedfishError::JsonDeserializeError {
                        url,
                        body: response_body,
                        source: e,
                    });
                }
            };
        } else {
            debug!("RX {status_code}");
        }

        if !status_code.is_success() {
            return Err(RedfishError::HTTPErrorCode { url, status_code });
        }
        Ok((status_code, res))
    }
}

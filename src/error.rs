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
use reqwest::StatusCode;
use tracing::error;

/// Transport-level failures talking to the BMC. These originate in the
/// HTTP client and the Redfish system handle; the driver surface wraps or
/// forwards them as [`DriverError`].
#[derive(thiserror::Error, Debug)]
pub enum RedfishError {
    #[error("Network error talking to BMC at {url}. {source}")]
    NetworkError { url: String, source: reqwest::Error },

    #[error("HTTP {status_code} at {url}. See debug logs for details.")]
    HTTPErrorCode {
        url: String,
        status_code: StatusCode,
    },

    #[error("Could not deserialize response from {url}. Body: {body}. {source}")]
    JsonDeserializeError {
        url: String,
        body: String,
        source: serde_json::Error,
    },

    #[error("Could not serialize request body for {url}. Obj: {object_debug}. {source}")]
    JsonSerializeError {
        url: String,
        object_debug: String,
        source: serde_json::Error,
    },

    #[error("Remote returned empty body")]
    NoContent,

    #[error("UnnecessaryOperation such as trying to turn on a machine that is already on.")]
    UnnecessaryOperation,

    #[error("Could not build HTTP client. {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Errors the driver raises to the conductor.
#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    /// A required `driver_info` field is absent.
    #[error("Missing required parameter {param} in node driver_info")]
    MissingParameterValue { param: &'static str },

    /// A `driver_info` field is present but malformed.
    #[error("Invalid value for parameter {param}: {reason}")]
    InvalidParameterValue { param: &'static str, reason: String },

    /// The BMC endpoint could not be reached or the system resource could
    /// not be fetched. Raised by the connection helper, never wrapped.
    #[error("Could not connect to Redfish BMC of node {node}. {source}")]
    Connection {
        node: String,
        source: RedfishError,
    },

    /// Normalized form of any BMC protocol failure during a driver
    /// operation. The underlying error has already been logged; only its
    /// rendered message is carried.
    #[error("Redfish {operation} failed for node {node}. Error: {message}")]
    Redfish {
        operation: &'static str,
        node: String,
        message: String,
    },

    /// The BMC reported a power state outside the mapped vocabulary, or
    /// the conductor asked for one.
    #[error("Power state {state} is not supported by the Redfish driver")]
    UnsupportedPowerState { state: String },

    /// The BMC reported a boot source outside the mapped vocabulary, or
    /// the conductor asked for one.
    #[error("Boot device {device} is not supported by the Redfish driver")]
    UnsupportedBootDevice { device: String },

    /// Static capability gap, independent of node state.
    #[error("{0} is not supported by the Redfish driver")]
    NotSupported(&'static str),
}

impl DriverError {
    /// Normalize a BMC failure: log it at error severity, then discard it
    /// in favor of a single [`DriverError::Redfish`] carrying the node id
    /// and the rendered message.
    pub(crate) fn redfish(operation: &'static str, node: &str, source: RedfishError) -> DriverError {
        error!("Redfish {operation} failed for node {node}. Error: {source}");
        DriverError::Redfish {
            operation,
            node: node.to_string(),
            message: source.to_string(),
        }
    }
}

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

//! Connection helper: resolves a node's `driver_info` into a live handle
//! to its ComputerSystem resource.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use crate::network::{Endpoint, RedfishClientPool};
use crate::system::{ManagedSystem, RedfishSystem};
use crate::{DriverError, Node, RedfishError};

/// The per-node configuration keys this driver reads from `driver_info`,
/// with operator-facing descriptions.
pub const COMMON_PROPERTIES: &[(&str, &str)] = &[
    (
        "redfish_address",
        "Hostname, IP address or https:// URL of the BMC. Required.",
    ),
    (
        "redfish_system_id",
        "The canonical path to the ComputerSystem resource that the \
         driver will interact with, e.g. /redfish/v1/Systems/1. Required.",
    ),
    (
        "redfish_username",
        "User account with admin/server-profile access privilege. Optional.",
    ),
    ("redfish_password", "User account password. Optional."),
    (
        "redfish_verify_ca",
        "Whether to verify the TLS certificate presented by the BMC. \
         Defaults to true. Optional.",
    ),
];

/// [`COMMON_PROPERTIES`] as the property map the conductor expects from
/// `get_properties`.
pub fn common_properties() -> HashMap<&'static str, &'static str> {
    COMMON_PROPERTIES.iter().copied().collect()
}

/// Validated connection parameters for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverInfo {
    pub host: String,
    pub port: Option<u16>,
    pub system_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verify_ca: bool,
}

fn required_str(node: &Node, param: &'static str) -> Result<String, DriverError> {
    match node.driver_info.get(param) {
        None | Some(Value::Null) => Err(DriverError::MissingParameterValue { param }),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(DriverError::MissingParameterValue { param }),
        Some(other) => Err(DriverError::InvalidParameterValue {
            param,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

fn optional_str(node: &Node, param: &'static str) -> Result<Option<String>, DriverError> {
    match node.driver_info.get(param) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(DriverError::InvalidParameterValue {
            param,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

fn optional_bool(node: &Node, param: &'static str, default: bool) -> Result<bool, DriverError> {
    match node.driver_info.get(param) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        // Operators routinely set booleans as strings in driver_info.
        Some(Value::String(s)) => match s.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(DriverError::InvalidParameterValue {
                param,
                reason: format!("{s:?} is not a boolean"),
            }),
        },
        Some(other) => Err(DriverError::InvalidParameterValue {
            param,
            reason: format!("expected a boolean, got {other}"),
        }),
    }
}

/// Split `redfish_address` into host and optional port. Accepts a bare
/// host, `host:port`, a bracketed IPv6 literal, or an `https://` URL.
fn parse_address(address: &str) -> Result<(String, Option<u16>), String> {
    if let Some(rest) = address.strip_prefix("http://") {
        return Err(format!("plain http is not supported: {rest}"));
    }
    let hostport = address.strip_prefix("https://").unwrap_or(address);
    let hostport = hostport.trim_end_matches('/');
    if hostport.is_empty() {
        return Err("empty host".to_string());
    }
    if let Some(rest) = hostport.strip_prefix('[') {
        // Bracketed IPv6, possibly with a port: [fe80::1]:443
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| format!("unterminated IPv6 literal in {address:?}"))?;
        let port = match tail.strip_prefix(':') {
            Some(p) => Some(p.parse::<u16>().map_err(|e| format!("bad port {p:?}: {e}"))?),
            None if tail.is_empty() => None,
            None => return Err(format!("trailing garbage after IPv6 literal in {address:?}")),
        };
        return Ok((format!("[{host}]"), port));
    }
    match hostport.split_once(':') {
        // More than one colon means an unbracketed IPv6 literal.
        Some((_, tail)) if tail.contains(':') => Ok((format!("[{hostport}]"), None)),
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|e| format!("bad port {port:?}: {e}"))?;
            Ok((host.to_string(), Some(port)))
        }
        None => Ok((hostport.to_string(), None)),
    }
}

/// Validate the node's `driver_info` and extract the connection
/// parameters.
pub fn parse_driver_info(node: &Node) -> Result<DriverInfo, DriverError> {
    let address = required_str(node, "redfish_address")?;
    let (host, port) =
        parse_address(&address).map_err(|reason| DriverError::InvalidParameterValue {
            param: "redfish_address",
            reason,
        })?;
    Ok(DriverInfo {
        host,
        port,
        system_id: required_str(node, "redfish_system_id")?,
        username: optional_str(node, "redfish_username")?,
        password: optional_str(node, "redfish_password")?,
        verify_ca: optional_bool(node, "redfish_verify_ca", true)?,
    })
}

/// Resolves nodes into live system handles. The driver adapters only see
/// this seam, so tests can substitute a fake BMC.
pub trait Connection: Send + Sync {
    /// Resolve a fresh handle to the node's ComputerSystem resource.
    fn get_system(&self, node: &Node) -> Result<Box<dyn ManagedSystem>, DriverError>;
}

/// Production [`Connection`] backed by the HTTP client pools.
///
/// Certificate verification is a per-node setting while reqwest fixes it
/// per client, so one pool of each flavor is kept.
pub struct RedfishConnection {
    verified: RedfishClientPool,
    lax: RedfishClientPool,
}

impl RedfishConnection {
    pub fn new() -> Result<RedfishConnection, RedfishError> {
        Ok(RedfishConnection {
            verified: RedfishClientPool::builder().reject_invalid_certs().build()?,
            lax: RedfishClientPool::builder().build()?,
        })
    }

    /// Same as [`RedfishConnection::new`] with a non-default request
    /// timeout.
    pub fn with_timeout(timeout: Duration) -> Result<RedfishConnection, RedfishError> {
        Ok(RedfishConnection {
            verified: RedfishClientPool::builder()
                .reject_invalid_certs()
                .timeout(timeout)
                .build()?,
            lax: RedfishClientPool::builder().timeout(timeout).build()?,
        })
    }
}

impl Connection for RedfishConnection {
    fn get_system(&self, node: &Node) -> Result<Box<dyn ManagedSystem>, DriverError> {
        let info = parse_driver_info(node)?;
        let pool = if info.verify_ca {
            &self.verified
        } else {
            &self.lax
        };
        let client = pool.client_for(Endpoint {
            host: info.host,
            port: info.port,
            user: info.username,
            password: info.password,
        });
        let system =
            RedfishSystem::load(client, &info.system_id).map_err(|e| DriverError::Connection {
                node: node.uid.clone(),
                source: e,
            })?;
        Ok(Box::new(system))
    }
}

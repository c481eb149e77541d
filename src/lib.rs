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

//! Redfish power and boot-management driver for a bare-metal conductor.
//!
//! The conductor owns node persistence, task lifecycle, retries and the
//! per-node locks. This crate only translates the conductor's abstract
//! power states and boot devices into Redfish calls against a BMC, and
//! normalizes BMC failures into one error type. Every operation is a
//! stateless single-shot command or query; nothing here waits for the
//! hardware to reach the requested state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod connection;
mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod management;
pub mod model;
mod network;
pub mod power;
pub mod system;

pub use connection::{Connection, DriverInfo, RedfishConnection};
pub use error::{DriverError, RedfishError};
pub use management::RedfishManagement;
pub use model::boot::{Boot, BootSourceOverrideEnabled, BootSourceOverrideTarget};
pub use model::system::{ComputerSystem, SystemPowerControl, SystemPowerState};
pub use network::{Endpoint, RedfishClientPool, RedfishClientPoolBuilder, REDFISH_ENDPOINT};
pub use power::RedfishPower;
pub use system::ManagedSystem;

/// A managed bare-metal node as the conductor hands it to the driver.
///
/// `driver_info` carries the per-node connection parameters; the recognized
/// keys are the ones returned by [`connection::common_properties`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Conductor-assigned node identifier, used in error messages and logs.
    pub uid: String,
    #[serde(default)]
    pub driver_info: HashMap<String, serde_json::Value>,
}

impl Node {
    pub fn new(uid: impl Into<String>) -> Node {
        Node {
            uid: uid.into(),
            driver_info: HashMap::new(),
        }
    }
}

/// Proof that the conductor holds the exclusive per-node lock.
///
/// State-mutating driver calls take this token instead of a bare [`Node`],
/// making the locking precondition visible at the call site. Constructing
/// one is the conductor's assertion that the lock is held for the wrapped
/// node; the driver itself performs no locking.
#[derive(Debug)]
pub struct ExclusiveLock<'n> {
    node: &'n Node,
}

impl<'n> ExclusiveLock<'n> {
    /// Called by the conductor once its exclusive lock on `node` is held.
    pub fn new(node: &'n Node) -> ExclusiveLock<'n> {
        ExclusiveLock { node }
    }

    pub fn node(&self) -> &Node {
        self.node
    }
}

/// The conductor's abstract power vocabulary.
///
/// `Reboot` is only meaningful as a target for
/// [`PowerInterface::set_power_state`]; a node never reports it as its
/// current state.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    On,
    Off,
    Reboot,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The conductor's abstract boot-device vocabulary.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum BootDevice {
    Pxe,
    Disk,
    Cdrom,
    Bios,
}

impl fmt::Display for BootDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Boot override currently configured on a node, as reported by the BMC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootDeviceInfo {
    /// `None` when the BMC reports no boot source override configured.
    pub boot_device: Option<BootDevice>,
    /// Whether the override survives past the next boot.
    pub persistent: bool,
}

/// Power interface exposed to the conductor.
pub trait PowerInterface: Send + Sync {
    /// The per-node configuration keys this driver recognizes.
    fn get_properties(&self) -> HashMap<&'static str, &'static str>;

    /// Check that the node carries well-formed connection parameters.
    fn validate(&self, node: &Node) -> Result<(), DriverError>;

    /// Read the node's current power state from the BMC.
    fn get_power_state(&self, node: &Node) -> Result<PowerState, DriverError>;

    /// Drive the node to `target` with a single reset command.
    fn set_power_state(
        &self,
        lock: &ExclusiveLock<'_>,
        target: PowerState,
    ) -> Result<(), DriverError>;

    /// Hard reboot: force-restart if the node is on, power it on otherwise.
    fn reboot(&self, lock: &ExclusiveLock<'_>) -> Result<(), DriverError>;

    /// The power states this driver can drive a node to.
    fn get_supported_power_states(&self, node: &Node) -> Vec<PowerState>;
}

/// Boot and out-of-band management interface exposed to the conductor.
pub trait ManagementInterface: Send + Sync {
    /// The per-node configuration keys this driver recognizes.
    fn get_properties(&self) -> HashMap<&'static str, &'static str>;

    /// Check that the node carries well-formed connection parameters.
    fn validate(&self, node: &Node) -> Result<(), DriverError>;

    /// The boot devices this driver can select on a node.
    fn get_supported_boot_devices(&self, node: &Node) -> Vec<BootDevice>;

    /// Select the device the node boots from next. A non-persistent
    /// selection applies to one boot only.
    fn set_boot_device(
        &self,
        lock: &ExclusiveLock<'_>,
        device: BootDevice,
        persistent: bool,
    ) -> Result<(), DriverError>;

    /// Read the boot override currently configured on the node.
    fn get_boot_device(&self, node: &Node) -> Result<BootDeviceInfo, DriverError>;

    /// Sensor telemetry. This driver has no sensor path and always fails
    /// with [`DriverError::NotSupported`].
    fn get_sensors_data(
        &self,
        node: &Node,
    ) -> Result<HashMap<String, serde_json::Value>, DriverError>;

    /// Fire a non-maskable interrupt at the node, e.g. to force a crash
    /// dump on an unresponsive system.
    fn inject_nmi(&self, lock: &ExclusiveLock<'_>) -> Result<(), DriverError>;
}

/// Both driver interfaces wired to one shared BMC connection, the way the
/// conductor loads them as a unit.
pub struct RedfishDriver {
    pub power: RedfishPower,
    pub management: RedfishManagement,
}

impl RedfishDriver {
    pub fn new() -> Result<RedfishDriver, RedfishError> {
        let connection = Arc::new(RedfishConnection::new()?);
        Ok(RedfishDriver {
            power: RedfishPower::new(connection.clone()),
            management: RedfishManagement::new(connection),
        })
    }
}

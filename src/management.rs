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

//! Management adapter: boot-device selection and NMI injection.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::connection::{common_properties, parse_driver_info, Connection};
use crate::model::boot::{BootSourceOverrideEnabled, BootSourceOverrideTarget};
use crate::model::system::SystemPowerControl;
use crate::{
    BootDevice, BootDeviceInfo, DriverError, ExclusiveLock, ManagementInterface, Node,
};

/// What each conductor boot device means as a Redfish boot source
/// override. The order of entries is the order
/// `get_supported_boot_devices` advertises.
const BOOT_DEVICE_MAP: &[(BootDevice, BootSourceOverrideTarget)] = &[
    (BootDevice::Pxe, BootSourceOverrideTarget::Pxe),
    (BootDevice::Disk, BootSourceOverrideTarget::Hdd),
    (BootDevice::Cdrom, BootSourceOverrideTarget::Cd),
    (BootDevice::Bios, BootSourceOverrideTarget::BiosSetup),
];

fn to_boot_target(device: BootDevice) -> Result<BootSourceOverrideTarget, DriverError> {
    BOOT_DEVICE_MAP
        .iter()
        .find(|(abstract_device, _)| *abstract_device == device)
        .map(|(_, target)| *target)
        .ok_or_else(|| DriverError::UnsupportedBootDevice {
            device: device.to_string(),
        })
}

fn from_boot_target(target: BootSourceOverrideTarget) -> Result<BootDevice, DriverError> {
    BOOT_DEVICE_MAP
        .iter()
        .find(|(_, vendor_target)| *vendor_target == target)
        .map(|(abstract_device, _)| *abstract_device)
        .ok_or_else(|| DriverError::UnsupportedBootDevice {
            device: target.to_string(),
        })
}

/// Management interface implementation for Redfish BMCs.
pub struct RedfishManagement {
    connection: Arc<dyn Connection>,
}

impl RedfishManagement {
    pub fn new(connection: Arc<dyn Connection>) -> RedfishManagement {
        RedfishManagement { connection }
    }
}

impl ManagementInterface for RedfishManagement {
    fn get_properties(&self) -> HashMap<&'static str, &'static str> {
        common_properties()
    }

    fn validate(&self, node: &Node) -> Result<(), DriverError> {
        parse_driver_info(node).map(|_info| ())
    }

    fn get_supported_boot_devices(&self, _node: &Node) -> Vec<BootDevice> {
        BOOT_DEVICE_MAP
            .iter()
            .map(|(abstract_device, _)| *abstract_device)
            .collect()
    }

    fn set_boot_device(
        &self,
        lock: &ExclusiveLock<'_>,
        device: BootDevice,
        persistent: bool,
    ) -> Result<(), DriverError> {
        let node = lock.node();
        let target = to_boot_target(device)?;
        let enabled = if persistent {
            BootSourceOverrideEnabled::Continuous
        } else {
            BootSourceOverrideEnabled::Once
        };
        let system = self.connection.get_system(node)?;
        debug!(
            "Setting boot device of node {} to {target} ({enabled})",
            node.uid
        );
        system
            .set_system_boot_source(target, enabled)
            .map_err(|e| DriverError::redfish("set boot device", &node.uid, e))
    }

    fn get_boot_device(&self, node: &Node) -> Result<BootDeviceInfo, DriverError> {
        let system = self.connection.get_system(node)?;
        let boot = system.boot();
        let boot_device = match boot.boot_source_override_target {
            // No override configured is a valid answer, not an error.
            None | Some(BootSourceOverrideTarget::None) => None,
            Some(target) => Some(from_boot_target(target)?),
        };
        Ok(BootDeviceInfo {
            boot_device,
            persistent: boot.boot_source_override_enabled
                == Some(BootSourceOverrideEnabled::Continuous),
        })
    }

    fn get_sensors_data(
        &self,
        _node: &Node,
    ) -> Result<HashMap<String, serde_json::Value>, DriverError> {
        Err(DriverError::NotSupported("get_sensors_data"))
    }

    fn inject_nmi(&self, lock: &ExclusiveLock<'_>) -> Result<(), DriverError> {
        let node = lock.node();
        let system = self.connection.get_system(node)?;
        debug!("Injecting NMI into node {}", node.uid);
        system
            .reset_system(SystemPowerControl::Nmi)
            .map_err(|e| DriverError::redfish("inject NMI", &node.uid, e))
    }
}

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
use std::collections::HashMap;

use serde::Serialize;

use crate::model::boot::{Boot, BootSourceOverrideEnabled, BootSourceOverrideTarget};
use crate::model::system::{ComputerSystem, SystemPowerControl, SystemPowerState};
use crate::network::{RedfishHttpClient, REDFISH_ENDPOINT};
use crate::RedfishError;

/// A live handle to one ComputerSystem resource on a BMC.
///
/// Handles are transient: the connection helper resolves a fresh one for
/// every driver call, and its reported attributes are a snapshot taken at
/// resolution time. Nothing is cached across calls.
pub trait ManagedSystem {
    /// Power state the BMC reported when the handle was resolved.
    fn power_state(&self) -> SystemPowerState;

    /// Boot override block the BMC reported when the handle was resolved.
    fn boot(&self) -> &Boot;

    /// Issue a `ComputerSystem.Reset` action.
    fn reset_system(&self, action: SystemPowerControl) -> Result<(), RedfishError>;

    /// Patch the boot source override target and its persistence in one
    /// write.
    fn set_system_boot_source(
        &self,
        target: BootSourceOverrideTarget,
        enabled: BootSourceOverrideEnabled,
    ) -> Result<(), RedfishError>;
}

#[derive(Debug, Serialize)]
struct BootPatch {
    #[serde(rename = "Boot")]
    boot: Boot,
}

/// [`ManagedSystem`] backed by HTTP calls against a real BMC.
pub struct RedfishSystem {
    client: RedfishHttpClient,
    /// Resource path relative to the Redfish service root, e.g.
    /// `Systems/437XR1138R2`.
    system_path: String,
    resource: ComputerSystem,
}

impl RedfishSystem {
    /// Fetch the ComputerSystem resource at `system_id` and wrap it.
    ///
    /// `system_id` is the odata id as configured on the node, with or
    /// without the `/redfish/v1/` prefix.
    pub fn load(client: RedfishHttpClient, system_id: &str) -> Result<RedfishSystem, RedfishError> {
        let system_path = system_id
            .trim_start_matches('/')
            .trim_start_matches(REDFISH_ENDPOINT)
            .trim_start_matches('/')
            .to_string();
        let resource: ComputerSystem = client.get(&system_path)?;
        Ok(RedfishSystem {
            client,
            system_path,
            resource,
        })
    }
}

impl ManagedSystem for RedfishSystem {
    fn power_state(&self) -> SystemPowerState {
        self.resource.power_state
    }

    fn boot(&self) -> &Boot {
        &self.resource.boot
    }

    fn reset_system(&self, action: SystemPowerControl) -> Result<(), RedfishError> {
        let url = format!("{}/Actions/ComputerSystem.Reset", self.system_path);
        let mut arg = HashMap::new();
        arg.insert("ResetType", action.to_string());
        // Lenovo: the expected HTTP response code is 204 No Content
        self.client.post(&url, arg).map(|_status_code| ())
    }

    fn set_system_boot_source(
        &self,
        target: BootSourceOverrideTarget,
        enabled: BootSourceOverrideEnabled,
    ) -> Result<(), RedfishError> {
        let body = BootPatch {
            boot: Boot {
                boot_source_override_target: Some(target),
                boot_source_override_enabled: Some(enabled),
            },
        };
        self.client
            .patch(&self.system_path, body)
            .map(|_status_code| ())
    }
}

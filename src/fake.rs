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

//! Call-recording fake BMC for the adapter unit tests.

use std::sync::{Arc, Mutex};

use reqwest::StatusCode;

use crate::model::boot::{Boot, BootSourceOverrideEnabled, BootSourceOverrideTarget};
use crate::model::system::{SystemPowerControl, SystemPowerState};
use crate::system::ManagedSystem;
use crate::{Connection, DriverError, Node, RedfishError};

/// Every write the fake BMC received, shared between the test and the
/// handles it hands out.
#[derive(Debug, Default)]
pub struct SystemLog {
    pub resets: Mutex<Vec<SystemPowerControl>>,
    pub boot_writes: Mutex<Vec<(BootSourceOverrideTarget, BootSourceOverrideEnabled)>>,
    pub resolved: Mutex<usize>,
}

pub struct FakeSystem {
    power_state: SystemPowerState,
    boot: Boot,
    fail_writes: bool,
    log: Arc<SystemLog>,
}

fn bmc_error() -> RedfishError {
    RedfishError::HTTPErrorCode {
        url: "https://example.com/redfish/v1/Systems/FAKESYSTEM".to_string(),
        status_code: StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ManagedSystem for FakeSystem {
    fn power_state(&self) -> SystemPowerState {
        self.power_state
    }

    fn boot(&self) -> &Boot {
        &self.boot
    }

    fn reset_system(&self, action: SystemPowerControl) -> Result<(), RedfishError> {
        self.log.resets.lock().unwrap().push(action);
        if self.fail_writes {
            return Err(bmc_error());
        }
        Ok(())
    }

    fn set_system_boot_source(
        &self,
        target: BootSourceOverrideTarget,
        enabled: BootSourceOverrideEnabled,
    ) -> Result<(), RedfishError> {
        self.log.boot_writes.lock().unwrap().push((target, enabled));
        if self.fail_writes {
            return Err(bmc_error());
        }
        Ok(())
    }
}

/// [`Connection`] whose handles report a fixed snapshot and record every
/// write into a shared [`SystemLog`].
pub struct FakeConnection {
    power_state: SystemPowerState,
    boot: Boot,
    fail_writes: bool,
    pub log: Arc<SystemLog>,
}

impl FakeConnection {
    pub fn new(power_state: SystemPowerState) -> FakeConnection {
        FakeConnection {
            power_state,
            boot: Boot::default(),
            fail_writes: false,
            log: Arc::new(SystemLog::default()),
        }
    }

    pub fn with_boot(mut self, boot: Boot) -> FakeConnection {
        self.boot = boot;
        self
    }

    /// Writes are still recorded, then fail like a BMC returning HTTP 500.
    pub fn failing_writes(mut self) -> FakeConnection {
        self.fail_writes = true;
        self
    }
}

impl Connection for FakeConnection {
    fn get_system(&self, _node: &Node) -> Result<Box<dyn ManagedSystem>, DriverError> {
        *self.log.resolved.lock().unwrap() += 1;
        Ok(Box::new(FakeSystem {
            power_state: self.power_state,
            boot: self.boot.clone(),
            fail_writes: self.fail_writes,
            log: self.log.clone(),
        }))
    }
}

/// A node with well-formed driver_info, for tests that reach `validate`.
pub fn fake_node() -> Node {
    let mut node = Node::new("1be26c0b-03f2-4d2e-ae87-c02d7f33c123");
    node.driver_info.insert(
        "redfish_address".to_string(),
        "https://example.com".into(),
    );
    node.driver_info.insert(
        "redfish_system_id".to_string(),
        "/redfish/v1/Systems/FAKESYSTEM".into(),
    );
    node
}

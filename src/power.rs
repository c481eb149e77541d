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

//! Power adapter: translates the conductor's power states to
//! `ComputerSystem.Reset` actions and back.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::connection::{common_properties, parse_driver_info, Connection};
use crate::model::system::{SystemPowerControl, SystemPowerState};
use crate::{DriverError, ExclusiveLock, Node, PowerInterface, PowerState};

/// What a reported BMC power state means in the conductor's vocabulary.
/// Transitional states count as the state they are heading towards.
const GET_POWER_STATE_MAP: &[(SystemPowerState, PowerState)] = &[
    (SystemPowerState::On, PowerState::On),
    (SystemPowerState::PoweringOn, PowerState::On),
    (SystemPowerState::Off, PowerState::Off),
    (SystemPowerState::PoweringOff, PowerState::Off),
];

/// The reset action issued for each requested target state. The order of
/// entries is the order `get_supported_power_states` advertises.
const SET_POWER_STATE_MAP: &[(PowerState, SystemPowerControl)] = &[
    (PowerState::On, SystemPowerControl::On),
    (PowerState::Off, SystemPowerControl::ForceOff),
    (PowerState::Reboot, SystemPowerControl::ForceRestart),
];

fn from_system_state(state: SystemPowerState) -> Result<PowerState, DriverError> {
    GET_POWER_STATE_MAP
        .iter()
        .find(|(system, _)| *system == state)
        .map(|(_, abstract_state)| *abstract_state)
        .ok_or_else(|| DriverError::UnsupportedPowerState {
            state: state.to_string(),
        })
}

fn to_reset_action(target: PowerState) -> Result<SystemPowerControl, DriverError> {
    SET_POWER_STATE_MAP
        .iter()
        .find(|(abstract_state, _)| *abstract_state == target)
        .map(|(_, action)| *action)
        .ok_or_else(|| DriverError::UnsupportedPowerState {
            state: target.to_string(),
        })
}

/// Power interface implementation for Redfish BMCs.
pub struct RedfishPower {
    connection: Arc<dyn Connection>,
}

impl RedfishPower {
    pub fn new(connection: Arc<dyn Connection>) -> RedfishPower {
        RedfishPower { connection }
    }
}

impl PowerInterface for RedfishPower {
    fn get_properties(&self) -> HashMap<&'static str, &'static str> {
        common_properties()
    }

    fn validate(&self, node: &Node) -> Result<(), DriverError> {
        parse_driver_info(node).map(|_info| ())
    }

    fn get_power_state(&self, node: &Node) -> Result<PowerState, DriverError> {
        let system = self.connection.get_system(node)?;
        from_system_state(system.power_state())
    }

    fn set_power_state(
        &self,
        lock: &ExclusiveLock<'_>,
        target: PowerState,
    ) -> Result<(), DriverError> {
        let node = lock.node();
        let action = to_reset_action(target)?;
        let system = self.connection.get_system(node)?;
        debug!("Setting power state of node {} to {target}", node.uid);
        system
            .reset_system(action)
            .map_err(|e| DriverError::redfish("set power state", &node.uid, e))
    }

    fn reboot(&self, lock: &ExclusiveLock<'_>) -> Result<(), DriverError> {
        let node = lock.node();
        let system = self.connection.get_system(node)?;
        // A node that is not powered on has nothing to restart, so a
        // reboot from off (or from any unrecognized state) is a cold start.
        let action = match from_system_state(system.power_state()) {
            Ok(PowerState::On) => SystemPowerControl::ForceRestart,
            _ => SystemPowerControl::On,
        };
        debug!("Rebooting node {} via {action}", node.uid);
        system
            .reset_system(action)
            .map_err(|e| DriverError::redfish("reboot", &node.uid, e))
    }

    fn get_supported_power_states(&self, _node: &Node) -> Vec<PowerState> {
        SET_POWER_STATE_MAP
            .iter()
            .map(|(abstract_state, _)| *abstract_state)
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fake::{fake_node, FakeConnection};

    fn make_power(connection: FakeConnection) -> (RedfishPower, Arc<crate::fake::SystemLog>) {
        let log = connection.log.clone();
        (RedfishPower::new(Arc::new(connection)), log)
    }

    #[test]
    fn test_get_power_state() {
        let expected = [
            (SystemPowerState::On, PowerState::On),
            (SystemPowerState::PoweringOn, PowerState::On),
            (SystemPowerState::Off, PowerState::Off),
            (SystemPowerState::PoweringOff, PowerState::Off),
        ];
        for (reported, mapped) in expected {
            let (power, _log) = make_power(FakeConnection::new(reported));
            assert_eq!(power.get_power_state(&fake_node()).unwrap(), mapped);
        }
    }

    #[test]
    fn test_get_power_state_unknown() {
        let (power, _log) = make_power(FakeConnection::new(SystemPowerState::InvalidValue));
        match power.get_power_state(&fake_node()) {
            Err(DriverError::UnsupportedPowerState { state }) => {
                assert_eq!(state, "InvalidValue")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_set_power_state() {
        let expected = [
            (PowerState::On, SystemPowerControl::On),
            (PowerState::Off, SystemPowerControl::ForceOff),
            (PowerState::Reboot, SystemPowerControl::ForceRestart),
        ];
        for (target, action) in expected {
            let (power, log) = make_power(FakeConnection::new(SystemPowerState::Off));
            let node = fake_node();
            power
                .set_power_state(&ExclusiveLock::new(&node), target)
                .unwrap();
            assert_eq!(*log.resets.lock().unwrap(), vec![action]);
        }
    }

    #[test]
    fn test_set_power_state_fail() {
        let (power, log) = make_power(FakeConnection::new(SystemPowerState::Off).failing_writes());
        let node = fake_node();
        let err = power
            .set_power_state(&ExclusiveLock::new(&node), PowerState::On)
            .unwrap_err();
        match err {
            DriverError::Redfish {
                operation, node, ..
            } => {
                assert_eq!(operation, "set power state");
                assert_eq!(node, fake_node().uid);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The reset was attempted exactly once, with no silent retry.
        assert_eq!(log.resets.lock().unwrap().len(), 1);
        assert_eq!(*log.resolved.lock().unwrap(), 1);
    }

    #[test]
    fn test_reboot_when_on() {
        let (power, log) = make_power(FakeConnection::new(SystemPowerState::On));
        let node = fake_node();
        power.reboot(&ExclusiveLock::new(&node)).unwrap();
        assert_eq!(
            *log.resets.lock().unwrap(),
            vec![SystemPowerControl::ForceRestart]
        );
    }

    #[test]
    fn test_reboot_when_not_on() {
        for reported in [
            SystemPowerState::Off,
            SystemPowerState::PoweringOff,
            SystemPowerState::InvalidValue,
        ] {
            let (power, log) = make_power(FakeConnection::new(reported));
            let node = fake_node();
            power.reboot(&ExclusiveLock::new(&node)).unwrap();
            assert_eq!(*log.resets.lock().unwrap(), vec![SystemPowerControl::On]);
        }
    }

    #[test]
    fn test_reboot_fail() {
        let (power, log) = make_power(FakeConnection::new(SystemPowerState::On).failing_writes());
        let node = fake_node();
        match power.reboot(&ExclusiveLock::new(&node)).unwrap_err() {
            DriverError::Redfish { operation, .. } => assert_eq!(operation, "reboot"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(log.resets.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_get_supported_power_states() {
        let (power, _log) = make_power(FakeConnection::new(SystemPowerState::Off));
        assert_eq!(
            power.get_supported_power_states(&fake_node()),
            vec![PowerState::On, PowerState::Off, PowerState::Reboot]
        );
    }

    #[test]
    fn test_validate() {
        let (power, _log) = make_power(FakeConnection::new(SystemPowerState::Off));
        power.validate(&fake_node()).unwrap();

        let mut node = fake_node();
        node.driver_info.remove("redfish_address");
        match power.validate(&node) {
            Err(DriverError::MissingParameterValue { param }) => {
                assert_eq!(param, "redfish_address")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_get_properties() {
        let (power, _log) = make_power(FakeConnection::new(SystemPowerState::Off));
        assert!(power.get_properties().contains_key("redfish_address"));
    }

    // The set table must cover every abstract state and the get table
    // every concrete BMC state, so no value can silently fall through.
    #[test]
    fn test_mapping_tables_are_total() {
        for state in [PowerState::On, PowerState::Off, PowerState::Reboot] {
            to_reset_action(state).unwrap();
        }
        for state in [
            SystemPowerState::On,
            SystemPowerState::PoweringOn,
            SystemPowerState::Off,
            SystemPowerState::PoweringOff,
        ] {
            from_system_state(state).unwrap();
        }
        assert!(from_system_state(SystemPowerState::InvalidValue).is_err());
    }
}

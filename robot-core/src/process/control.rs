//! Control commands and signal actions of the process layer.

use robot::{NodeStatus, Object, Payload, ResetHint};

/// A life-cycle command carried by a control object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    Activate,
    Deactivate,
    Reset(ResetHint),
    Reconfig,
}

impl ControlCommand {
    /// Returns the command carried by `object`, `None` for data objects.
    pub fn from_object(object: &Object) -> Option<Self> {
        match object.get_payload() {
            Payload::Start => Some(ControlCommand::Start),
            Payload::Stop => Some(ControlCommand::Stop),
            Payload::Activate => Some(ControlCommand::Activate),
            Payload::Deactivate => Some(ControlCommand::Deactivate),
            Payload::Reset { hint } => Some(ControlCommand::Reset(*hint)),
            Payload::Reconfig => Some(ControlCommand::Reconfig),
            _ => None,
        }
    }

    pub fn to_object(self) -> Object {
        let payload = match self {
            ControlCommand::Start => Payload::Start,
            ControlCommand::Stop => Payload::Stop,
            ControlCommand::Activate => Payload::Activate,
            ControlCommand::Deactivate => Payload::Deactivate,
            ControlCommand::Reset(hint) => Payload::Reset { hint },
            ControlCommand::Reconfig => Payload::Reconfig,
        };
        Object::control(payload)
    }

    /// Whether the command has any effect on a node in `status`.
    ///
    /// `start` and `activate` skip an active node, `stop` skips an offline
    /// one and `deactivate` only acts on an active one.
    pub fn applies_to(self, status: NodeStatus) -> bool {
        match self {
            ControlCommand::Start | ControlCommand::Activate => status != NodeStatus::Active,
            ControlCommand::Stop => status != NodeStatus::Offline,
            ControlCommand::Deactivate => status == NodeStatus::Active,
            ControlCommand::Reset(_) | ControlCommand::Reconfig => true,
        }
    }

    /// Node status once the command is handled, `None` if it is unchanged.
    pub fn status_after(self) -> Option<NodeStatus> {
        match self {
            ControlCommand::Start | ControlCommand::Activate => Some(NodeStatus::Active),
            ControlCommand::Stop => Some(NodeStatus::Offline),
            ControlCommand::Deactivate => Some(NodeStatus::Inactive),
            ControlCommand::Reset(_) | ControlCommand::Reconfig => None,
        }
    }
}

/// What the process does with a caught signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    Shutdown,
    Reconfigure,
}

impl SignalAction {
    /// Signals the process catches on construction.
    pub const CAUGHT: [i32; 3] = [libc::SIGTERM, libc::SIGINT, libc::SIGHUP];

    pub fn from_signal(signum: i32) -> Option<Self> {
        match signum {
            libc::SIGTERM | libc::SIGINT => Some(SignalAction::Shutdown),
            libc::SIGHUP => Some(SignalAction::Reconfigure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_survive_objects() {
        let reset = ControlCommand::Reset(ResetHint::STATISTIC);
        assert_eq!(ControlCommand::from_object(&reset.to_object()), Some(reset));
        assert_eq!(
            ControlCommand::from_object(&Object::new(
                3,
                Payload::Signal {
                    name: "x".into(),
                    value: 1.0
                }
            )),
            None
        );
        assert_eq!(ControlCommand::Stop.status_after(), Some(NodeStatus::Offline));
        assert_eq!(ControlCommand::Reconfig.status_after(), None);
    }

    #[test]
    fn test_status_guards() {
        assert!(!ControlCommand::Start.applies_to(NodeStatus::Active));
        assert!(ControlCommand::Start.applies_to(NodeStatus::Offline));
        assert!(!ControlCommand::Activate.applies_to(NodeStatus::Active));
        assert!(ControlCommand::Activate.applies_to(NodeStatus::Inactive));
        assert!(!ControlCommand::Stop.applies_to(NodeStatus::Offline));
        assert!(ControlCommand::Stop.applies_to(NodeStatus::Inactive));
        assert!(!ControlCommand::Deactivate.applies_to(NodeStatus::Inactive));
        assert!(!ControlCommand::Deactivate.applies_to(NodeStatus::Offline));
        assert!(ControlCommand::Deactivate.applies_to(NodeStatus::Active));
        assert!(ControlCommand::Reconfig.applies_to(NodeStatus::Offline));
    }

    #[test]
    fn test_signal_actions() {
        assert_eq!(SignalAction::from_signal(libc::SIGINT), Some(SignalAction::Shutdown));
        assert_eq!(SignalAction::from_signal(libc::SIGHUP), Some(SignalAction::Reconfigure));
        assert_eq!(SignalAction::from_signal(libc::SIGUSR2), None);
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node role selection

use serde::{Deserialize, Serialize};

/// Which half of the cluster a node is running as.
///
/// Both roles ship in the same binary; the role picked at startup decides
/// whether the node terminates operator calls (`Controller`) or holds the
/// downstream adapters and reports into a controller (`Worker`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Controller,
    Worker,
}

crate::simple_display! {
    NodeRole {
        Controller => "controller",
        Worker => "worker",
    }
}

impl std::str::FromStr for NodeRole {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "controller" => Ok(Self::Controller),
            "worker" => Ok(Self::Worker),
            other => Err(crate::error::CoreError::InvalidConfig(format!(
                "unknown node role {other:?}, expected \"controller\" or \"worker\""
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!("controller".parse::<NodeRole>().unwrap(), NodeRole::Controller);
        assert_eq!("worker".parse::<NodeRole>().unwrap(), NodeRole::Worker);
    }

    #[test]
    fn rejects_unknown_role() {
        assert!("coordinator".parse::<NodeRole>().is_err());
    }

    #[test]
    fn display_matches_wire_form() {
        assert_eq!(NodeRole::Worker.to_string(), "worker");
    }
}

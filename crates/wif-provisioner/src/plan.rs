use std::fmt;

use serde::Serialize;

use crate::discrepancy::UnsupportedRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Undelete,
    Update,
    Delete,
    NoOp,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Undelete => "undelete",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::NoOp => "no-op",
        })
    }
}

/// One step of a create or delete run, taken or (in dry-run) planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanAction {
    pub resource_type: &'static str,
    pub resource_id: String,
    pub action: ActionType,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.action, self.resource_type, self.resource_id)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub dry_run: bool,
    pub actions: Vec<PlanAction>,
    pub unapplied_roles: Vec<UnsupportedRole>,
}

impl ExecutionReport {
    pub fn has_changes(&self) -> bool {
        self.actions.iter().any(|a| a.action != ActionType::NoOp)
    }

    pub(crate) fn record(&mut self, resource_type: &'static str, resource_id: &str, action: ActionType) {
        if self.dry_run && action != ActionType::NoOp {
            tracing::info!(resource_type, resource_id, %action, "dry run: would apply");
        }
        self.actions.push(PlanAction {
            resource_type,
            resource_id: resource_id.to_string(),
            action,
        });
    }
}

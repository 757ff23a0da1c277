use serde::{Deserialize, Serialize};
use wif_core::names::role_basename;

/// Policy version that can carry conditional bindings. Requested on every
/// read so conditions come back and survive a read-modify-write.
pub const CONDITIONAL_POLICY_VERSION: i32 = 3;

/// IAM policy document for a service account or project.
///
/// `etag` and `version` are echoed back on `setIamPolicy` so the provider
/// can reject a write that raced with another writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub version: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Binding {
    pub role: String,
    pub members: Vec<String>,
    /// IAM condition expression, kept opaque and written back unchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Value>,
}

impl Binding {
    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }
}

/// Membership helpers only read and edit unconditional bindings. A
/// conditional grant does not count as holding the role, and conditional
/// bindings are never modified.
impl Policy {
    pub fn binding(&self, role: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|b| !b.is_conditional() && b.role == role)
    }

    pub fn has_member(&self, role: &str, member: &str) -> bool {
        self.binding(role)
            .is_some_and(|b| b.members.iter().any(|m| m == member))
    }

    /// Grant `role` to `member`, creating the binding if the role has none.
    /// Returns `false` when the member was already bound.
    pub fn add_member(&mut self, role: &str, member: &str) -> bool {
        if self.has_member(role, member) {
            return false;
        }
        match self
            .bindings
            .iter_mut()
            .find(|b| !b.is_conditional() && b.role == role)
        {
            Some(binding) => binding.members.push(member.to_string()),
            None => self.bindings.push(Binding {
                role: role.to_string(),
                members: vec![member.to_string()],
                condition: None,
            }),
        }
        true
    }

    /// Revoke `role` from `member`. Bindings left without members are
    /// dropped, as the provider does. Returns `false` if nothing changed.
    pub fn remove_member(&mut self, role: &str, member: &str) -> bool {
        let mut changed = false;
        for binding in self
            .bindings
            .iter_mut()
            .filter(|b| !b.is_conditional() && b.role == role)
        {
            let before = binding.members.len();
            binding.members.retain(|m| m != member);
            changed |= binding.members.len() != before;
        }
        self.bindings.retain(|b| !b.members.is_empty());
        changed
    }

    /// Whether any binding whose role basename is `role_id` lists `member`.
    pub fn has_member_by_basename(&self, role_id: &str, member: &str) -> bool {
        self.bindings
            .iter()
            .filter(|b| !b.is_conditional() && role_basename(&b.role) == role_id)
            .any(|b| b.members.iter().any(|m| m == member))
    }

    /// Append `member` to the binding whose role basename is `role_id`.
    ///
    /// Only basename-matching bindings are touched; a new binding is never
    /// created. Returns `None` when the policy has no such binding at all,
    /// `Some(false)` when the member is already present.
    pub fn add_member_by_basename(&mut self, role_id: &str, member: &str) -> Option<bool> {
        if self.has_member_by_basename(role_id, member) {
            return Some(false);
        }
        let binding = self
            .bindings
            .iter_mut()
            .find(|b| !b.is_conditional() && role_basename(&b.role) == role_id)?;
        binding.members.push(member.to_string());
        Some(true)
    }

    /// Remove `member` from every binding whose role basename is `role_id`.
    pub fn remove_member_by_basename(&mut self, role_id: &str, member: &str) -> bool {
        let mut changed = false;
        for binding in self
            .bindings
            .iter_mut()
            .filter(|b| !b.is_conditional() && role_basename(&b.role) == role_id)
        {
            let before = binding.members.len();
            binding.members.retain(|m| m != member);
            changed |= binding.members.len() != before;
        }
        changed
    }
}

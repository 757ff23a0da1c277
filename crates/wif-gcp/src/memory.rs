//! In-memory [`GcpClient`] used by tests and dry runs.
//!
//! Mimics the provider behaviors that drift detection depends on:
//! soft-deleted pools, `deleted:serviceAccount:...?uid=` members left in
//! project policies after a service-account delete, and etag-checked
//! policy writes. Every mutating call is recorded so tests can assert on
//! write counts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use wif_core::BoxFuture;
use wif_core::names;

use crate::client::GcpClient;
use crate::error::GcpError;
use crate::policy::Policy;
use crate::types::{
    CreateServiceAccount, Operation, PoolState, ServiceAccount, WorkloadIdentityPool,
    WorkloadIdentityProvider,
};

/// One recorded write against the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub method: &'static str,
    pub resource: String,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.method, self.resource)
    }
}

#[derive(Default)]
struct State {
    projects: BTreeMap<String, String>,
    project_policies: BTreeMap<String, Policy>,
    service_accounts: BTreeMap<String, ServiceAccount>,
    /// Soft-deleted accounts keyed by unique id.
    deleted_service_accounts: BTreeMap<String, ServiceAccount>,
    service_account_policies: BTreeMap<String, Policy>,
    pools: BTreeMap<String, WorkloadIdentityPool>,
    providers: BTreeMap<String, WorkloadIdentityProvider>,
    /// Remaining polls before an operation reports done.
    operations: BTreeMap<String, u32>,
    denied: BTreeSet<String>,
    mutations: Vec<Mutation>,
    etag_seq: u64,
    unique_id_seq: u64,
    operation_seq: u64,
    policy_conflicts: u32,
    pending_polls: u32,
}

impl State {
    fn record(&mut self, method: &'static str, resource: &str) {
        self.mutations.push(Mutation {
            method,
            resource: resource.to_string(),
        });
    }

    fn next_etag(&mut self) -> String {
        self.etag_seq += 1;
        format!("BwY{:08}", self.etag_seq)
    }

    fn check_denied(&self, resource: &str) -> Result<(), GcpError> {
        if self.denied.contains(resource) {
            return Err(GcpError::PermissionDenied(format!(
                "permission denied on resource '{resource}'"
            )));
        }
        Ok(())
    }

    fn check_project(&self, project_id: &str) -> Result<(), GcpError> {
        self.check_denied(project_id)?;
        if !self.projects.contains_key(project_id) {
            return Err(GcpError::NotFound(format!("project '{project_id}' not found")));
        }
        Ok(())
    }

    fn operation(&mut self, resource: &str) -> Operation {
        if self.pending_polls == 0 {
            return Operation::completed(&format!("{resource}/operations/done"));
        }
        self.operation_seq += 1;
        let name = format!("{resource}/operations/op-{}", self.operation_seq);
        self.operations.insert(name.clone(), self.pending_polls);
        Operation {
            name,
            done: false,
            error: None,
        }
    }

    /// Resolve an account by `projects/{p}/serviceAccounts/{email}` or by
    /// unique id in the last segment.
    fn account_key(&self, resource: &str) -> Option<String> {
        if self.service_accounts.contains_key(resource) {
            return Some(resource.to_string());
        }
        let tail = resource.rsplit('/').next()?;
        self.service_accounts
            .iter()
            .find(|(_, sa)| sa.unique_id == tail || sa.email == tail)
            .map(|(key, _)| key.clone())
    }

    fn account_mut(&mut self, resource: &str) -> Result<&mut ServiceAccount, GcpError> {
        let key = self
            .account_key(resource)
            .ok_or_else(|| GcpError::NotFound(format!("service account '{resource}' not found")))?;
        self.service_accounts
            .get_mut(&key)
            .ok_or_else(|| GcpError::NotFound(format!("service account '{resource}' not found")))
    }

    /// Check the caller's etag and any injected conflict, then store.
    fn write_policy(
        &mut self,
        current: Option<Policy>,
        incoming: &Policy,
    ) -> Result<Policy, GcpError> {
        let current = current.unwrap_or_default();
        if self.policy_conflicts > 0 {
            self.policy_conflicts -= 1;
            return Err(GcpError::Conflict(
                "There were concurrent policy changes. Please retry the whole read-modify-write with exponential backoff.".into(),
            ));
        }
        if let Some(etag) = &incoming.etag
            && current.etag.as_ref().is_some_and(|c| c != etag)
        {
            return Err(GcpError::Conflict(format!(
                "etag mismatch: policy is at {:?}, write was based on {etag}",
                current.etag
            )));
        }
        let mut stored = incoming.clone();
        stored.bindings.retain(|b| !b.members.is_empty());
        stored.etag = Some(self.next_etag());
        Ok(stored)
    }

    fn rewrite_members(&mut self, from: &str, to: &str) {
        for policy in self.project_policies.values_mut() {
            for binding in &mut policy.bindings {
                for member in &mut binding.members {
                    if member == from {
                        *member = to.to_string();
                    }
                }
            }
        }
    }
}

/// In-memory stand-in for GCP.
#[derive(Default)]
pub struct MemoryGcp {
    state: Mutex<State>,
}

impl MemoryGcp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project with an empty IAM policy.
    pub fn with_project(self, project_id: &str, project_number: &str) -> Self {
        {
            let mut st = self.lock();
            st.projects
                .insert(project_id.to_string(), project_number.to_string());
            let etag = st.next_etag();
            st.project_policies.insert(
                project_id.to_string(),
                Policy {
                    version: 1,
                    etag: Some(etag),
                    bindings: vec![],
                },
            );
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> Result<T, GcpError>) -> Result<T, GcpError> {
        f(&mut self.lock())
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().mutations.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().mutations.len()
    }

    pub fn reset_mutations(&self) {
        self.lock().mutations.clear();
    }

    /// Fail the next `n` policy writes with a conflict.
    pub fn inject_policy_conflicts(&self, n: u32) {
        self.lock().policy_conflicts = n;
    }

    /// Pool and provider operations created from now on stay pending for
    /// `n` polls.
    pub fn set_pending_polls(&self, n: u32) {
        self.lock().pending_polls = n;
    }

    /// Any call addressing `resource` fails with permission denied.
    pub fn deny(&self, resource: &str) {
        self.lock().denied.insert(resource.to_string());
    }

    pub fn service_account(&self, resource: &str) -> Option<ServiceAccount> {
        let st = self.lock();
        st.account_key(resource)
            .and_then(|key| st.service_accounts.get(&key).cloned())
    }

    pub fn project_policy(&self, project_id: &str) -> Policy {
        self.lock()
            .project_policies
            .get(project_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn service_account_policy(&self, resource: &str) -> Policy {
        self.lock()
            .service_account_policies
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }

    pub fn pool(&self, resource: &str) -> Option<WorkloadIdentityPool> {
        self.lock().pools.get(resource).cloned()
    }

    pub fn provider(&self, resource: &str) -> Option<WorkloadIdentityProvider> {
        self.lock().providers.get(resource).cloned()
    }

    /// Out-of-band edit of a project policy. Bumps the etag, not recorded.
    pub fn edit_project_policy(&self, project_id: &str, edit: impl FnOnce(&mut Policy)) {
        let mut st = self.lock();
        let etag = st.next_etag();
        let policy = st
            .project_policies
            .entry(project_id.to_string())
            .or_default();
        edit(policy);
        policy.bindings.retain(|b| !b.members.is_empty());
        policy.etag = Some(etag);
    }

    /// Out-of-band edit of a service-account policy. Bumps the etag, not recorded.
    pub fn edit_service_account_policy(&self, resource: &str, edit: impl FnOnce(&mut Policy)) {
        let mut st = self.lock();
        let etag = st.next_etag();
        let policy = st
            .service_account_policies
            .entry(resource.to_string())
            .or_default();
        edit(policy);
        policy.bindings.retain(|b| !b.members.is_empty());
        policy.etag = Some(etag);
    }
}

impl GcpClient for MemoryGcp {
    fn create_workload_identity_pool<'a>(
        &'a self,
        parent: &'a str,
        pool_id: &'a str,
        pool: &'a WorkloadIdentityPool,
    ) -> BoxFuture<'a, Result<Operation, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(parent)?;
                let resource = format!("{parent}/workloadIdentityPools/{pool_id}");
                if st.pools.contains_key(&resource) {
                    return Err(GcpError::AlreadyExists(format!(
                        "workload identity pool '{resource}' already exists"
                    )));
                }
                let mut created = pool.clone();
                created.name = resource.clone();
                created.state = PoolState::Active;
                st.pools.insert(resource.clone(), created);
                st.record("createWorkloadIdentityPool", &resource);
                Ok(st.operation(&resource))
            })
        })
    }

    fn get_workload_identity_pool<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<WorkloadIdentityPool, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(resource)?;
                st.pools.get(resource).cloned().ok_or_else(|| {
                    GcpError::NotFound(format!("workload identity pool '{resource}' not found"))
                })
            })
        })
    }

    fn delete_workload_identity_pool<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<Operation, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(resource)?;
                let pool = st
                    .pools
                    .get_mut(resource)
                    .filter(|p| p.state != PoolState::Deleted)
                    .ok_or_else(|| {
                        GcpError::NotFound(format!("workload identity pool '{resource}' not found"))
                    })?;
                pool.state = PoolState::Deleted;
                st.record("deleteWorkloadIdentityPool", resource);
                Ok(st.operation(resource))
            })
        })
    }

    fn undelete_workload_identity_pool<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<Operation, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(resource)?;
                let pool = st.pools.get_mut(resource).ok_or_else(|| {
                    GcpError::NotFound(format!("workload identity pool '{resource}' not found"))
                })?;
                if pool.state != PoolState::Deleted {
                    return Err(GcpError::InvalidArgument(format!(
                        "workload identity pool '{resource}' is not deleted"
                    )));
                }
                pool.state = PoolState::Active;
                st.record("undeleteWorkloadIdentityPool", resource);
                Ok(st.operation(resource))
            })
        })
    }

    fn create_workload_identity_provider<'a>(
        &'a self,
        pool: &'a str,
        provider_id: &'a str,
        provider: &'a WorkloadIdentityProvider,
    ) -> BoxFuture<'a, Result<Operation, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(pool)?;
                if !st
                    .pools
                    .get(pool)
                    .is_some_and(|p| p.state == PoolState::Active)
                {
                    return Err(GcpError::NotFound(format!(
                        "workload identity pool '{pool}' not found"
                    )));
                }
                let resource = format!("{pool}/providers/{provider_id}");
                if st.providers.contains_key(&resource) {
                    return Err(GcpError::AlreadyExists(format!(
                        "provider '{resource}' already exists"
                    )));
                }
                let mut created = provider.clone();
                created.name = resource.clone();
                created.state = PoolState::Active;
                st.providers.insert(resource.clone(), created);
                st.record("createWorkloadIdentityPoolProvider", &resource);
                Ok(st.operation(&resource))
            })
        })
    }

    fn get_workload_identity_provider<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<WorkloadIdentityProvider, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(resource)?;
                st.providers
                    .get(resource)
                    .cloned()
                    .ok_or_else(|| GcpError::NotFound(format!("provider '{resource}' not found")))
            })
        })
    }

    fn get_operation<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Operation, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                if name.ends_with("/operations/done") {
                    return Ok(Operation::completed(name));
                }
                let remaining = st
                    .operations
                    .get_mut(name)
                    .ok_or_else(|| GcpError::NotFound(format!("operation '{name}' not found")))?;
                *remaining = remaining.saturating_sub(1);
                Ok(Operation {
                    name: name.to_string(),
                    done: *remaining == 0,
                    error: None,
                })
            })
        })
    }

    fn create_service_account<'a>(
        &'a self,
        project_id: &'a str,
        request: &'a CreateServiceAccount,
    ) -> BoxFuture<'a, Result<ServiceAccount, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_project(project_id)?;
                let resource = names::service_account_resource(&request.account_id, project_id);
                if st.service_accounts.contains_key(&resource) {
                    return Err(GcpError::AlreadyExists(format!(
                        "Service account {} already exists within project projects/{project_id}.",
                        request.account_id
                    )));
                }
                st.unique_id_seq += 1;
                let account = ServiceAccount {
                    name: resource.clone(),
                    project_id: project_id.to_string(),
                    unique_id: format!("1{:020}", st.unique_id_seq),
                    email: names::service_account_email(&request.account_id, project_id),
                    display_name: request.service_account.display_name.clone(),
                    description: request.service_account.description.clone(),
                    disabled: false,
                };
                st.service_accounts.insert(resource.clone(), account.clone());
                let etag = st.next_etag();
                st.service_account_policies.insert(
                    resource.clone(),
                    Policy {
                        version: 1,
                        etag: Some(etag),
                        bindings: vec![],
                    },
                );
                st.record("createServiceAccount", &resource);
                Ok(account)
            })
        })
    }

    fn get_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<ServiceAccount, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(resource)?;
                st.account_mut(resource).map(|sa| sa.clone())
            })
        })
    }

    fn delete_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(resource)?;
                let key = st.account_key(resource).ok_or_else(|| {
                    GcpError::NotFound(format!("service account '{resource}' not found"))
                })?;
                let Some(account) = st.service_accounts.remove(&key) else {
                    return Err(GcpError::NotFound(format!(
                        "service account '{resource}' not found"
                    )));
                };
                let member = format!("serviceAccount:{}", account.email);
                let tombstone = format!("deleted:{member}?uid={}", account.unique_id);
                st.rewrite_members(&member, &tombstone);
                st.deleted_service_accounts
                    .insert(account.unique_id.clone(), account);
                st.record("deleteServiceAccount", &key);
                Ok(())
            })
        })
    }

    fn undelete_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(resource)?;
                let unique_id = resource.rsplit('/').next().unwrap_or(resource);
                let Some(account) = st.deleted_service_accounts.remove(unique_id) else {
                    return Err(GcpError::NotFound(format!(
                        "deleted service account '{resource}' not found"
                    )));
                };
                if st.service_accounts.contains_key(&account.name) {
                    let name = account.name.clone();
                    st.deleted_service_accounts
                        .insert(unique_id.to_string(), account);
                    return Err(GcpError::AlreadyExists(format!(
                        "an active service account already uses '{name}'"
                    )));
                }
                let member = format!("serviceAccount:{}", account.email);
                let tombstone = format!("deleted:{member}?uid={}", account.unique_id);
                st.rewrite_members(&tombstone, &member);
                st.record("undeleteServiceAccount", &account.name);
                st.service_accounts.insert(account.name.clone(), account);
                Ok(())
            })
        })
    }

    fn enable_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(resource)?;
                st.account_mut(resource)?.disabled = false;
                st.record("enableServiceAccount", resource);
                Ok(())
            })
        })
    }

    fn disable_service_account<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<(), GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(resource)?;
                st.account_mut(resource)?.disabled = true;
                st.record("disableServiceAccount", resource);
                Ok(())
            })
        })
    }

    fn get_service_account_iam_policy<'a>(
        &'a self,
        resource: &'a str,
    ) -> BoxFuture<'a, Result<Policy, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(resource)?;
                let key = st.account_key(resource).ok_or_else(|| {
                    GcpError::NotFound(format!("service account '{resource}' not found"))
                })?;
                Ok(st
                    .service_account_policies
                    .get(&key)
                    .cloned()
                    .unwrap_or_default())
            })
        })
    }

    fn set_service_account_iam_policy<'a>(
        &'a self,
        resource: &'a str,
        policy: &'a Policy,
    ) -> BoxFuture<'a, Result<Policy, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_denied(resource)?;
                let key = st.account_key(resource).ok_or_else(|| {
                    GcpError::NotFound(format!("service account '{resource}' not found"))
                })?;
                let current = st.service_account_policies.get(&key).cloned();
                let stored = st.write_policy(current, policy)?;
                st.service_account_policies.insert(key.clone(), stored.clone());
                st.record("setServiceAccountIamPolicy", &key);
                Ok(stored)
            })
        })
    }

    fn get_project_iam_policy<'a>(
        &'a self,
        project_id: &'a str,
    ) -> BoxFuture<'a, Result<Policy, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_project(project_id)?;
                Ok(st
                    .project_policies
                    .get(project_id)
                    .cloned()
                    .unwrap_or_default())
            })
        })
    }

    fn set_project_iam_policy<'a>(
        &'a self,
        project_id: &'a str,
        policy: &'a Policy,
    ) -> BoxFuture<'a, Result<Policy, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_project(project_id)?;
                let current = st.project_policies.get(project_id).cloned();
                let stored = st.write_policy(current, policy)?;
                st.project_policies
                    .insert(project_id.to_string(), stored.clone());
                st.record("setProjectIamPolicy", project_id);
                Ok(stored)
            })
        })
    }

    fn project_number<'a>(
        &'a self,
        project_id: &'a str,
    ) -> BoxFuture<'a, Result<String, GcpError>> {
        Box::pin(async move {
            self.with_state(|st| {
                st.check_project(project_id)?;
                Ok(st.projects.get(project_id).cloned().unwrap_or_default())
            })
        })
    }
}

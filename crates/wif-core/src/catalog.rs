//! The fixed catalog of service accounts an OpenShift cluster needs.
//!
//! The management API assigns this catalog to every WIF config it creates.
//! It is exposed here so in-memory stores and tests build descriptors the
//! same way.

use crate::models::{AccessMethod, CredentialRequest, RoleSpec, SecretRef, ServiceAccountSpec};

const ADMIN_ROLES: &[&str] = &[
    "compute.admin",
    "dns.admin",
    "iam.roleAdmin",
    "iam.securityAdmin",
    "iam.serviceAccountAdmin",
    "iam.serviceAccountKeyAdmin",
    "iam.serviceAccountUser",
    "storage.admin",
];

fn impersonated(id: &str, osd_role: &str, roles: &[&str]) -> ServiceAccountSpec {
    ServiceAccountSpec {
        service_account_id: id.into(),
        osd_role: osd_role.into(),
        access_method: AccessMethod::Impersonate,
        roles: roles.iter().map(|r| RoleSpec::predefined(r)).collect(),
        credential_request: None,
    }
}

fn federated(
    id: &str,
    osd_role: &str,
    roles: &[&str],
    secret: (&str, &str),
    service_account_names: &[&str],
) -> ServiceAccountSpec {
    let (name, namespace) = secret;
    ServiceAccountSpec {
        service_account_id: id.into(),
        osd_role: osd_role.into(),
        access_method: AccessMethod::Wif,
        roles: roles.iter().map(|r| RoleSpec::predefined(r)).collect(),
        credential_request: Some(CredentialRequest {
            secret_ref: SecretRef {
                name: name.into(),
                namespace: namespace.into(),
            },
            service_account_names: service_account_names
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }),
    }
}

/// Build the default OpenShift service-account catalog.
pub fn openshift_service_accounts() -> Vec<ServiceAccountSpec> {
    vec![
        // ── impersonated by the control plane ─────────────────────────────
        impersonated("osd-deployer", "deployer", ADMIN_ROLES),
        impersonated("osd-support", "support", ADMIN_ROLES),
        // ── federated cluster operators ───────────────────────────────────
        federated(
            "osd-image-registry",
            "operator-image-registry",
            &["resourcemanager.tagUser", "storage.admin"],
            ("installer-cloud-credentials", "openshift-image-registry"),
            &["cluster-image-registry-operator", "registry"],
        ),
        federated(
            "osd-cluster-ingress",
            "operator-cluster-ingress",
            &["dns.admin"],
            ("cloud-credentials", "openshift-ingress-operator"),
            &["ingress-operator"],
        ),
        federated(
            "osd-machine-api",
            "operator-machine-api",
            &["compute.admin", "iam.serviceAccountUser"],
            ("gcp-cloud-credentials", "openshift-machine-api"),
            &["machine-api-controllers"],
        ),
        federated(
            "osd-cloud-controller-manager",
            "operator-cloud-controller-manager",
            &[
                "compute.instanceAdmin",
                "compute.loadBalancerAdmin",
                "iam.serviceAccountUser",
            ],
            ("gcp-ccm-cloud-credentials", "openshift-cloud-controller-manager"),
            &["cloud-controller-manager"],
        ),
        federated(
            "osd-cluster-storage",
            "operator-cluster-storage",
            &[
                "compute.instanceAdmin",
                "compute.storageAdmin",
                "iam.serviceAccountUser",
            ],
            ("gcp-pd-cloud-credentials", "openshift-cluster-csi-drivers"),
            &["gcp-pd-csi-driver-operator", "gcp-pd-csi-driver-controller-sa"],
        ),
        federated(
            "osd-cloud-credential",
            "operator-cloud-credential",
            &["iam.roleViewer", "iam.securityReviewer"],
            (
                "cloud-credential-operator-gcp-ro-creds",
                "openshift-cloud-credential-operator",
            ),
            &["cloud-credential-operator"],
        ),
        federated(
            "osd-cncc",
            "operator-cncc",
            &["compute.admin"],
            ("cloud-credentials", "openshift-cloud-network-config-controller"),
            &["cloud-network-config-controller"],
        ),
    ]
}

use wif_core::catalog::openshift_service_accounts;
use wif_core::names::{self, role_basename};
use wif_core::{AccessMethod, CoreError, WifConfig};

const CONFIG_JSON: &str = r#"{
    "id": "2a9f7c",
    "display_name": "test01",
    "gcp": {
        "project_id": "sda-ccs-1",
        "project_number": "1008983090557",
        "impersonator_email": "osd-impersonator@sda-ccs-3.iam.gserviceaccount.com",
        "workload_identity_pool": {
            "pool_id": "d7a2fb1099634da1a9d0a5e8d1c11c39",
            "identity_provider": {
                "identity_provider_id": "oidc",
                "issuer_url": "https://fake-issuer.com",
                "jwks": "{\"keys\":[]}"
            }
        },
        "service_accounts": [
            {
                "service_account_id": "osd-deployer",
                "osd_role": "deployer",
                "access_method": "impersonate",
                "roles": [{"role_id": "compute.admin", "predefined": true}]
            },
            {
                "service_account_id": "osd-image-registry",
                "osd_role": "operator-image-registry",
                "access_method": "wif",
                "roles": [{"role_id": "storage.admin", "predefined": true}],
                "credential_request": {
                    "secret_ref": {"name": "installer-cloud-credentials", "namespace": "openshift-image-registry"},
                    "service_account_names": ["cluster-image-registry-operator", "registry"]
                }
            }
        ]
    }
}"#;

#[test]
fn parses_management_api_payload() {
    let config = WifConfig::from_json(CONFIG_JSON).unwrap();
    assert_eq!(config.project_id(), "sda-ccs-1");
    assert_eq!(config.pool_id(), "d7a2fb1099634da1a9d0a5e8d1c11c39");
    assert_eq!(config.provider().allowed_audiences, vec!["openshift"]);
    assert_eq!(config.gcp.service_accounts.len(), 2);
    assert_eq!(
        config.gcp.service_accounts[1].access_method,
        AccessMethod::Wif
    );
}

#[test]
fn unknown_access_method_is_a_configuration_error() {
    let json = CONFIG_JSON.replace("\"impersonate\"", "\"token\"");
    let err = WifConfig::from_json(&json).unwrap_err();
    assert!(matches!(err, CoreError::Serialization(_)));
    assert!(err.to_string().contains("token"));

    let err = "token".parse::<AccessMethod>().unwrap_err();
    assert!(matches!(err, CoreError::InvalidAccessMethod(ref m) if m == "token"));
}

#[test]
fn wif_account_without_credential_request_is_rejected() {
    let mut config = WifConfig::from_json(CONFIG_JSON).unwrap();
    config.gcp.service_accounts[1].credential_request = None;
    let err = config.validate().unwrap_err();
    assert!(matches!(err, CoreError::MissingCredentialRequest(ref id) if id == "osd-image-registry"));
}

#[test]
fn impersonated_accounts_require_an_impersonator() {
    let mut config = WifConfig::from_json(CONFIG_JSON).unwrap();
    config.gcp.impersonator_email.clear();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, CoreError::MissingField(ref f) if f == "gcp.impersonator_email"));
}

#[test]
fn federated_principals_cover_every_service_account_name() {
    let config = WifConfig::from_json(CONFIG_JSON).unwrap();
    let registry = config.service_account("osd-image-registry").unwrap();
    let principals = registry.federated_principals("1008983090557", config.pool_id());
    assert_eq!(
        principals,
        vec![
            "principal://iam.googleapis.com/projects/1008983090557/locations/global/workloadIdentityPools/d7a2fb1099634da1a9d0a5e8d1c11c39/subject/system:serviceaccount:openshift-image-registry:cluster-image-registry-operator",
            "principal://iam.googleapis.com/projects/1008983090557/locations/global/workloadIdentityPools/d7a2fb1099634da1a9d0a5e8d1c11c39/subject/system:serviceaccount:openshift-image-registry:registry",
        ]
    );

    let deployer = config.service_account("osd-deployer").unwrap();
    assert!(deployer
        .federated_principals("1008983090557", config.pool_id())
        .is_empty());
}

#[test]
fn resource_names() {
    assert_eq!(
        names::service_account_resource("osd-deployer", "p1"),
        "projects/p1/serviceAccounts/osd-deployer@p1.iam.gserviceaccount.com"
    );
    assert_eq!(
        names::service_account_member("osd-deployer", "p1"),
        "serviceAccount:osd-deployer@p1.iam.gserviceaccount.com"
    );
    assert_eq!(
        names::provider_resource("p1", "pool", "oidc"),
        "projects/p1/locations/global/workloadIdentityPools/pool/providers/oidc"
    );
}

#[test]
fn role_basename_strips_custom_role_prefix() {
    assert_eq!(role_basename("roles/compute.admin"), "compute.admin");
    assert_eq!(
        role_basename("projects/p1/roles/compute.admin"),
        "compute.admin"
    );
    assert_eq!(role_basename("compute.admin"), "compute.admin");
}

#[test]
fn catalog_is_valid_and_federated_accounts_have_requests() {
    let catalog = openshift_service_accounts();
    assert_eq!(catalog.len(), 9);
    for sa in &catalog {
        sa.validate().unwrap();
        assert!(sa.roles.iter().all(|r| r.predefined));
    }
    let deployer = catalog
        .iter()
        .find(|sa| sa.osd_role == "deployer")
        .unwrap();
    assert_eq!(deployer.access_method, AccessMethod::Impersonate);
}

use super::*;
use clusternet_addon_k8s_api::{Error as ApiError, ErrorResponse, Subject};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// An in-memory hub.
#[derive(Clone, Default)]
struct FakeStore {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<GrantId, Grant>,
    creates: usize,
    fail_get: Option<GrantKind>,
    fail_create: Option<GrantKind>,
    // Objects that appear between the existence check and the create, as if
    // written by a concurrent pass.
    racing: BTreeSet<GrantKind>,
}

fn api_error(code: u16, reason: &str) -> ApiError {
    ApiError::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{reason} for test"),
        reason: reason.to_string(),
        code,
    })
}

#[async_trait::async_trait]
impl GrantStore for FakeStore {
    async fn exists(&self, id: &GrantId) -> Result<bool, ApiError> {
        let state = self.state.lock();
        if state.fail_get == Some(id.kind) {
            return Err(api_error(500, "InternalError"));
        }
        Ok(state.objects.contains_key(id))
    }

    async fn create(&self, grant: &Grant) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        let id = grant.id();
        if state.fail_create == Some(id.kind) {
            return Err(api_error(403, "Forbidden"));
        }
        if state.racing.remove(&id.kind) {
            state.objects.insert(id.clone(), grant.clone());
        }
        if state.objects.contains_key(&id) {
            return Err(api_error(409, "AlreadyExists"));
        }
        state.creates += 1;
        state.objects.insert(id, grant.clone());
        Ok(())
    }
}

impl FakeStore {
    fn ids(&self) -> BTreeSet<GrantId> {
        self.state.lock().objects.keys().cloned().collect()
    }

    fn creates(&self) -> usize {
        self.state.lock().creates
    }
}

fn id(kind: GrantKind, namespace: Option<&str>, name: &str) -> GrantId {
    GrantId {
        kind,
        namespace: namespace.map(Into::into),
        name: name.to_string(),
    }
}

#[tokio::test]
async fn creates_all_grants_on_empty_hub() {
    let store = FakeStore::default();
    let reconciler = PermissionReconciler::new(store.clone());

    let created = reconciler.reconcile("cluster-a", "clusternet").await.unwrap();
    assert_eq!(
        created,
        vec![
            id(
                GrantKind::Role,
                Some("cluster-a"),
                "open-cluster-management:clusternet:agent"
            ),
            id(
                GrantKind::RoleBinding,
                Some("cluster-a"),
                "open-cluster-management:clusternet:agent"
            ),
            id(
                GrantKind::ClusterRole,
                None,
                "open-cluster-management:clusternet-addon:cluster-a"
            ),
            id(
                GrantKind::ClusterRoleBinding,
                None,
                "open-cluster-management:clusternet-addon:cluster-a"
            ),
        ]
    );
    assert_eq!(store.creates(), 4);
}

#[tokio::test]
async fn second_pass_creates_nothing() {
    let store = FakeStore::default();
    let reconciler = PermissionReconciler::new(store.clone());

    reconciler.reconcile("cluster-a", "clusternet").await.unwrap();
    let before = store.ids();
    let created = reconciler.reconcile("cluster-a", "clusternet").await.unwrap();

    assert!(created.is_empty());
    assert_eq!(store.creates(), 4);
    assert_eq!(store.ids(), before);
}

#[tokio::test]
async fn existing_grants_are_not_updated() {
    let store = FakeStore::default();
    let [role, ..] = hub_grants("cluster-a", "clusternet");
    let edited = match role {
        Grant::Role(mut role) => {
            role.rules = None;
            Grant::Role(role)
        }
        _ => unreachable!(),
    };
    store
        .state
        .lock()
        .objects
        .insert(edited.id(), edited.clone());

    let created = PermissionReconciler::new(store.clone())
        .reconcile("cluster-a", "clusternet")
        .await
        .unwrap();

    assert_eq!(created.len(), 3);
    assert_eq!(store.state.lock().objects.get(&edited.id()), Some(&edited));
}

#[tokio::test]
async fn distinct_clusters_have_disjoint_grants() {
    let store = FakeStore::default();
    let reconciler = PermissionReconciler::new(store.clone());

    let a = reconciler.reconcile("cluster-a", "clusternet").await.unwrap();
    let b = reconciler.reconcile("cluster-b", "clusternet").await.unwrap();

    let a = a.into_iter().collect::<BTreeSet<_>>();
    let b = b.into_iter().collect::<BTreeSet<_>>();
    assert_eq!(a.len(), 4);
    assert_eq!(b.len(), 4);
    assert!(a.is_disjoint(&b));
    assert_eq!(store.creates(), 8);
}

#[tokio::test]
async fn concurrent_passes_for_distinct_clusters() {
    let store = FakeStore::default();
    let reconciler = PermissionReconciler::new(store.clone());

    let (a, b) = tokio::join!(
        reconciler.reconcile("cluster-a", "clusternet"),
        reconciler.reconcile("cluster-b", "clusternet"),
    );
    assert_eq!(a.unwrap().len(), 4);
    assert_eq!(b.unwrap().len(), 4);
    assert_eq!(store.ids().len(), 8);
}

#[tokio::test]
async fn lost_create_race_is_success() {
    let store = FakeStore::default();
    store.state.lock().racing.insert(GrantKind::ClusterRole);

    let created = PermissionReconciler::new(store.clone())
        .reconcile("cluster-a", "clusternet")
        .await
        .unwrap();

    assert_eq!(created.len(), 3);
    assert!(created.iter().all(|id| id.kind != GrantKind::ClusterRole));
    assert_eq!(store.ids().len(), 4);
}

#[tokio::test]
async fn get_failure_aborts_pass() {
    let store = FakeStore::default();
    store.state.lock().fail_get = Some(GrantKind::RoleBinding);

    let err = PermissionReconciler::new(store.clone())
        .reconcile("cluster-a", "clusternet")
        .await
        .unwrap_err();

    assert!(
        matches!(&err, Error::Get { id, .. } if id.kind == GrantKind::RoleBinding),
        "{err}"
    );
    // The role created before the failure is kept.
    assert_eq!(
        store.ids().into_iter().map(|id| id.kind).collect::<Vec<_>>(),
        vec![GrantKind::Role]
    );
}

#[tokio::test]
async fn create_failure_aborts_pass_and_retry_completes() {
    let store = FakeStore::default();
    store.state.lock().fail_create = Some(GrantKind::ClusterRole);
    let reconciler = PermissionReconciler::new(store.clone());

    let err = reconciler
        .reconcile("cluster-a", "clusternet")
        .await
        .unwrap_err();
    assert!(
        matches!(&err, Error::Create { id, .. } if id.kind == GrantKind::ClusterRole),
        "{err}"
    );
    assert_eq!(store.ids().len(), 2);

    store.state.lock().fail_create = None;
    let created = reconciler.reconcile("cluster-a", "clusternet").await.unwrap();
    assert_eq!(
        created.into_iter().map(|id| id.kind).collect::<Vec<_>>(),
        vec![GrantKind::ClusterRole, GrantKind::ClusterRoleBinding]
    );
    assert_eq!(store.ids().len(), 4);
}

#[test]
fn grants_bind_cluster_group() {
    let group = Subject {
        kind: "Group".to_string(),
        api_group: Some("rbac.authorization.k8s.io".to_string()),
        name: "system:open-cluster-management:cluster:cluster-a:addon:clusternet".to_string(),
        namespace: None,
    };
    for grant in hub_grants("cluster-a", "clusternet") {
        match grant {
            Grant::RoleBinding(rb) => {
                assert_eq!(rb.subjects, Some(vec![group.clone()]));
                assert_eq!(rb.role_ref.kind, "Role");
                assert_eq!(rb.role_ref.name, "open-cluster-management:clusternet:agent");
            }
            Grant::ClusterRoleBinding(crb) => {
                assert_eq!(crb.subjects, Some(vec![group.clone()]));
                assert_eq!(crb.role_ref.kind, "ClusterRole");
                assert_eq!(
                    crb.role_ref.name,
                    "open-cluster-management:clusternet-addon:cluster-a"
                );
            }
            _ => {}
        }
    }
}

#[test]
fn cluster_role_is_scoped_to_cluster_socket() {
    let rules = hub_grants("cluster-a", "clusternet")
        .into_iter()
        .find_map(|grant| match grant {
            Grant::ClusterRole(cr) => cr.rules,
            _ => None,
        })
        .expect("cluster role must have rules");
    assert_eq!(rules.len(), 1);
    assert_eq!(
        rules[0].api_groups,
        Some(vec!["proxies.clusternet.io".to_string()])
    );
    assert_eq!(rules[0].resources, Some(vec!["sockets".to_string()]));
    assert_eq!(rules[0].resource_names, Some(vec!["cluster-a".to_string()]));
    assert_eq!(rules[0].verbs, vec!["*".to_string()]);
}

#[test]
fn role_is_read_only() {
    let rules = hub_grants("cluster-a", "clusternet")
        .into_iter()
        .find_map(|grant| match grant {
            Grant::Role(role) => role.rules,
            _ => None,
        })
        .expect("role must have rules");
    assert!(rules
        .iter()
        .all(|rule| rule.verbs == ["get", "list", "watch"]));
    assert_eq!(
        rules
            .iter()
            .flat_map(|rule| rule.resources.iter().flatten().cloned())
            .collect::<Vec<_>>(),
        vec!["configmaps".to_string(), "managedclusteraddons".to_string()]
    );
}

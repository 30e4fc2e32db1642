use http::Method;
use std::path::PathBuf;
use vgate_core::{load_all, GrantStore, Snapshot};
use vgate_engine::{DispatchDecision, Engine, InboundRequest};
use vgate_errors::Denial;

fn demos() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

fn load() -> (Snapshot, GrantStore) {
    let raw = load_all(demos().join("specs.yaml"), demos().join("grants.yaml")).unwrap();
    let snapshot = Snapshot::build(&raw.specifications.specifications).unwrap();
    (snapshot, GrantStore::from_template(&raw.consumers))
}

fn eval(target: &str, headers: &[(&str, &str)]) -> DispatchDecision {
    let (snapshot, grants) = load();
    let mut req = InboundRequest::new(Method::GET, target);
    for (k, v) in headers {
        req = req.header(*k, *v).unwrap();
    }
    Engine::default().evaluate(&snapshot, &grants, &req)
}

#[test]
fn demo_configuration_builds() {
    let (snapshot, grants) = load();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(grants.len(), 2);
    let base = snapshot.specification("base").unwrap();
    assert_eq!(base.version("v2").unwrap().linked.as_ref().unwrap().id, "versioned");
}

#[test]
fn demo_static_reply_and_link() {
    let d = eval("/test/mock", &[("version", "v2"), ("authorization", "key-known")]);
    assert!(matches!(d, DispatchDecision::Reply { status_code: 200, ref body, .. } if body == "testbody"));

    let d = eval("/default/x?version=v2", &[("authorization", "key-known")]);
    assert_eq!(
        d,
        DispatchDecision::Forward {
            path: "/x".into(),
            target_host: Some("new.upstream.internal".into()),
            specification_id: "versioned".into(),
            version: Some("Default".into()),
            bypassed: false,
        }
    );

    let d = eval("/test/", &[("version", "expired"), ("authorization", "key-known")]);
    assert!(matches!(d.denial(), Some(Denial::VersionExpired { .. })));
}

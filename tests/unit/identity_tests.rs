// Identity resolution across encodings

use rstest::rstest;

use activescale::identity::{IdentityResolver, InstanceIdentity, NodeIdentifier};

#[rstest]
#[case("pod-7", "billing")]
#[case("web-5d9c7b8f6-x2x4q", "checkout")]
#[case("worker.v2", "batch")]
#[case("a", "b")]
fn test_map_and_delimited_forms_agree(#[case] instance: &str, #[case] namespace: &str) {
    let resolver = IdentityResolver::default();

    let delimited = NodeIdentifier::from_id(format!(
        "sidecar~10.1.2.3~{instance}.{namespace}~{namespace}.svc.cluster.local"
    ));
    let aliases = [
        ("POD_NAME", "POD_NAMESPACE"),
        ("pod_name", "pod_namespace"),
        ("NAME", "NAMESPACE"),
        ("POD", "ns"),
        ("pod", "namespace"),
    ];

    let expected = Some(InstanceIdentity::new(namespace, instance));
    assert_eq!(resolver.resolve(&delimited), expected);
    for (name_key, ns_key) in aliases {
        let map = NodeIdentifier::from_metadata([(name_key, instance), (ns_key, namespace)]);
        assert_eq!(resolver.resolve(&map), expected, "{name_key}/{ns_key}");
    }
}

#[test]
fn test_resolution_is_deterministic_across_resolvers() {
    let node = NodeIdentifier {
        id: "sidecar~10.1.2.3~pod-7.billing~billing.svc.cluster.local".to_string(),
        metadata: Some(
            [("NAME".to_string(), "pod-7".to_string())]
                .into_iter()
                .collect(),
        ),
    };
    let first = IdentityResolver::default().resolve(&node);
    for _ in 0..5 {
        assert_eq!(IdentityResolver::default().resolve(&node), first);
    }
    assert_eq!(first, Some(InstanceIdentity::new("billing", "pod-7")));
}

#[rstest]
#[case("")]
#[case("sidecar~10.1.2.3")]
#[case("sidecar~10.1.2.3~nodots~x")]
fn test_unresolved_ids(#[case] id: &str) {
    assert_eq!(IdentityResolver::default().resolve(&NodeIdentifier::from_id(id)), None);
}

use hopshell_exec::{Chain, HostSpec};
use hopshell_route::*;

fn table(doc: &str) -> RouteTable {
    RouteTable::from_json_str(doc).unwrap()
}

const JUMP_A_WITH_DEFAULT: &str = r#"{"routes":[
    {"network":"10.0.0.0/8","via":"jumpA"},
    {"network":"default","via":"bastion"}
]}"#;

#[test]
fn cidr_match_selects_its_chain() {
    let chain = RouteResolver::new()
        .resolve("10.1.2.3", &table(JUMP_A_WITH_DEFAULT))
        .unwrap();
    assert_eq!(chain, Chain::parse("jumpA").unwrap());
}

#[test]
fn unmatched_target_uses_default() {
    let chain = RouteResolver::new()
        .resolve("192.168.1.1", &table(JUMP_A_WITH_DEFAULT))
        .unwrap();
    assert_eq!(chain, Chain::parse("bastion").unwrap());
}

#[test]
fn direct_only_table_has_no_route() {
    // a "direct" selector is never a match candidate, even for every target
    let t = table(r#"{"routes":[{"network":"direct","via":"direct"}]}"#);
    for ip in ["10.1.2.3", "192.168.1.1", "2001:db8::1", "not-an-ip"] {
        let err = RouteResolver::new().resolve(ip, &t).unwrap_err();
        assert!(matches!(err, RouteError::NotFound { .. }), "{ip}: {err}");
    }
}

#[test]
fn overlapping_cidrs_first_declared_wins_not_longest_prefix() {
    let t = table(
        r#"{"routes":[
            {"network":"10.0.0.0/8","via":"wide-jump"},
            {"network":"10.20.0.0/16","via":"narrow-jump"},
            {"network":"default","via":"bastion"}
        ]}"#,
    );
    let resolver = RouteResolver::new();

    let chain = resolver.resolve("10.20.1.1", &t).unwrap();
    assert_eq!(chain.to_string(), "wide-jump");

    let reordered = table(
        r#"{"routes":[
            {"network":"10.20.0.0/16","via":"narrow-jump"},
            {"network":"10.0.0.0/8","via":"wide-jump"}
        ]}"#,
    );
    assert_eq!(
        resolver.resolve("10.20.1.1", &reordered).unwrap().to_string(),
        "narrow-jump"
    );
}

#[test]
fn unresolved_hostname_falls_to_default_or_fails() {
    let resolver = RouteResolver::new();

    let chain = resolver
        .resolve("db01.unresolvable", &table(JUMP_A_WITH_DEFAULT))
        .unwrap();
    assert_eq!(chain.to_string(), "bastion");

    let no_default = table(r#"{"routes":[{"network":"0.0.0.0/0","via":"jumpA"}]}"#);
    assert!(resolver.resolve("db01.unresolvable", &no_default).is_err());
}

#[test]
fn relay_chain_order_is_kept() {
    let t = table(
        r#"{"routes":[
            {"network":"172.16.0.0/12","via":"ops@b1,ops@b2:2222,ops@b3"}
        ]}"#,
    );
    let chain = RouteResolver::new().resolve("172.20.0.9", &t).unwrap();
    assert_eq!(chain.hops(), ["ops@b1", "ops@b2:2222", "ops@b3"]);
}

#[tokio::test]
async fn literal_target_resolves_and_routes() {
    let target = HostSpec::parse("admin@10.1.2.3:22").unwrap();
    let resolved = AddressResolver::new().resolve(&target).await;
    assert_eq!(resolved.resolution(), Resolution::Literal);

    let chain = RouteResolver::new()
        .resolve(resolved.resolved_ip(), &table(JUMP_A_WITH_DEFAULT))
        .unwrap();
    assert_eq!(chain.to_string(), "jumpA");
}

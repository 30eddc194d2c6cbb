use std::path::Path;

use juicegen_core::diagnostics::{diagnostic_of, DiagnosticCode};
use juicegen_core::mapper::{find_config, load_configuration, load_configuration_str};
use juicegen_core::model::{ResultMapping, StatementKind};
use juicegen_core::registry::StatementRegistry;

fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, text).expect("write file");
}

fn config_code(err: &anyhow::Error) -> Option<DiagnosticCode> {
    diagnostic_of(err).map(|d| d.code)
}

#[test]
fn statements_carry_kind_and_attributes() {
    let set = load_configuration_str(
        r#"<mapper namespace="main.Orders">
            <select id="Get" timeout="3">select 1</select>
            <insert id="Add" useGeneratedKeys="true"/>
            <update id="Touch"/>
            <delete id="Drop" gen="false"/>
            <sql id="columns">id, name</sql>
        </mapper>"#,
        Path::new("."),
    )
    .expect("load");
    assert_eq!(set.len(), 4);

    let get = set.lookup("main.Orders.Get").expect("Get");
    assert_eq!(get.kind, StatementKind::Select);
    assert_eq!(get.attribute("timeout"), "3");
    assert_eq!(get.result_mapping, ResultMapping::Absent);

    assert_eq!(
        set.lookup("main.Orders.Add").expect("Add").attribute("useGeneratedKeys"),
        "true"
    );
    assert!(set.lookup("main.Orders.Drop").expect("Drop").skips_generation());
    assert!(set.lookup("main.Orders.columns").is_err());
}

#[test]
fn result_maps_resolve_locally_then_fully_qualified() {
    let set = load_configuration_str(
        r#"<configuration><mappers>
            <mapper namespace="main.Shared">
                <resultMap id="userMap"><id column="id" property="ID"/></resultMap>
            </mapper>
            <mapper namespace="main.Users">
                <resultMap id="local"/>
                <select id="A" resultMap="local">select 1</select>
                <select id="B" resultMap="main.Shared.userMap">select 1</select>
                <select id="C" resultMap="nowhere">select 1</select>
            </mapper>
        </mappers></configuration>"#,
        Path::new("."),
    )
    .expect("load");

    let mapping = |id: &str| set.lookup(id).expect(id).result_mapping.clone();
    assert_eq!(
        mapping("main.Users.A"),
        ResultMapping::Resolved("main.Users.local".to_string())
    );
    assert_eq!(
        mapping("main.Users.B"),
        ResultMapping::Resolved("main.Shared.userMap".to_string())
    );
    assert_eq!(
        mapping("main.Users.C"),
        ResultMapping::Unresolved("nowhere".to_string())
    );
}

#[test]
fn resources_resolve_relative_to_declaring_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(
        &tmp.path().join("config/juice.xml"),
        r#"<configuration><mappers>
            <mapper resource="mappers/all.xml"/>
        </mappers></configuration>"#,
    );
    write(
        &tmp.path().join("config/mappers/all.xml"),
        r#"<mappers><mapper resource="user.xml"/></mappers>"#,
    );
    write(
        &tmp.path().join("config/mappers/user.xml"),
        r#"<mapper namespace="main.Users"><select id="Get"/></mapper>"#,
    );
    let extra = tmp.path().join("abs.xml");
    write(&extra, r#"<mapper namespace="main.Abs"><delete id="Drop"/></mapper>"#);
    write(
        &tmp.path().join("config/url.xml"),
        &format!(
            r#"<configuration><mappers><mapper url="file://{}"/></mappers></configuration>"#,
            extra.display()
        ),
    );

    assert_eq!(
        find_config(tmp.path()).expect("find"),
        tmp.path().join("config/juice.xml")
    );
    let set = load_configuration(&tmp.path().join("config/juice.xml")).expect("load");
    assert!(set.lookup("main.Users.Get").is_ok());

    let set = load_configuration(&tmp.path().join("config/url.xml")).expect("load url");
    assert!(set.lookup("main.Abs.Drop").is_ok());
}

#[test]
fn resource_cycles_are_rejected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(
        &tmp.path().join("a.xml"),
        r#"<mappers><mapper resource="b.xml"/></mappers>"#,
    );
    write(
        &tmp.path().join("b.xml"),
        r#"<mappers><mapper resource="a.xml"/></mappers>"#,
    );
    let err = load_configuration(&tmp.path().join("a.xml")).expect_err("cycle");
    assert_eq!(config_code(&err), Some(DiagnosticCode::JG0100ConfigError));
    assert!(format!("{err:#}").contains("cycle"));
}

#[test]
fn malformed_configurations_are_config_errors() {
    let cases = [
        (r#"<mapper namespace="a"><select/></mapper>"#, "missing an id"),
        (r#"<mapper><select id="x"/></mapper>"#, "missing a namespace"),
        (
            r#"<mappers><mapper namespace="a"><select id="x"/><update id="x"/></mapper></mappers>"#,
            "duplicate statement: a.x",
        ),
        (r#"<mapper namespace="a"><select id="x"></mapper>"#, "closes <select>"),
        (r#"<mapper namespace="a">"#, "never closed"),
        (r#"<mapper url="http://example.com/m.xml"/>"#, "only file://"),
    ];
    for (src, want) in cases {
        let err = load_configuration_str(src, Path::new(".")).expect_err(src);
        assert_eq!(config_code(&err), Some(DiagnosticCode::JG0100ConfigError), "{src}");
        let rendered = format!("{err:#}");
        assert!(rendered.contains(want), "{src}: {rendered}");
    }
}

#[test]
fn missing_default_config_lists_candidates() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let err = find_config(tmp.path()).expect_err("missing");
    assert!(format!("{err:#}").contains("juice.xml|config/juice.xml"));
}

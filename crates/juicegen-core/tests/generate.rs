use std::path::Path;

use juicegen_core::assemble::Generator;
use juicegen_core::diagnostics::{diagnostic_of, DiagnosticCode};
use juicegen_core::goparse;
use juicegen_core::mapper;
use juicegen_core::model::{ApiVersion, GenerationContext};
use juicegen_core::namespace;

const REPO_GO: &str = r#"package repo

import (
	"context"
	"database/sql"
	"time"
)

// UserRepository is implemented by generated code.
type UserRepository interface {
	// GetByID fetches one user.
	GetByID(ctx context.Context, id int64) (*User, error)
	ListAll(ctx context.Context) ([]*User, error)
	Create(ctx context.Context, user *User) (sql.Result, error)
	Rename(ctx context.Context, id int64, name string) error
	Purge(ctx context.Context, before time.Time) error
}

type User struct {
	ID   int64
	Name string
}
"#;

const CONFIG_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<configuration>
    <environments default="prod">
        <environment id="prod">
            <dataSource>root:secret@tcp(localhost:3306)/app</dataSource>
            <driver>mysql</driver>
        </environment>
    </environments>
    <mappers>
        <mapper resource="mappers/user.xml"/>
    </mappers>
</configuration>
"#;

const USER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE mapper PUBLIC "-//juice//DTD Mapper 1.0//EN" "juice-mapper.dtd">
<mapper namespace="repo.UserRepository">
    <select id="GetByID">
        select * from user where id = #{id}
    </select>
    <select id="ListAll">select * from user</select>
    <insert id="Create" useGeneratedKeys="true" keyProperty="ID">
        insert into user (name) values (#{name})
    </insert>
    <update id="Rename">
        update user set name = #{name}
        <where>
            <if test="id &gt; 0">id = #{id}</if>
        </where>
    </update>
    <delete id="Purge" gen="false">delete from user where created_at &lt; #{before}</delete>
</mapper>
"#;

const EXPECTED_V1: &str = r#"// Code generated by "juicegen impl --type UserRepository"; DO NOT EDIT.

package repo

import (
	"context"
	"database/sql"

	"github.com/go-juicedev/juice"
)

type UserRepositoryImpl struct{}

var _ UserRepository = (*UserRepositoryImpl)(nil)

func (u UserRepositoryImpl) GetByID(ctx context.Context, id int64) (*User, error) {
	ret, err := juice.QueryContext[User](ctx, UserRepository(u).GetByID, juice.H{"id": id})
	if err != nil {
		return nil, err
	}
	return &ret, nil
}

func (u UserRepositoryImpl) ListAll(ctx context.Context) ([]*User, error) {
	return juice.QueryList2Context[User](ctx, UserRepository(u).ListAll, nil)
}

func (u UserRepositoryImpl) Create(ctx context.Context, user *User) (sql.Result, error) {
	return juice.ExecContext(ctx, UserRepository(u).Create, user)
}

func (u UserRepositoryImpl) Rename(ctx context.Context, id int64, name string) error {
	_, err := juice.ExecContext(ctx, UserRepository(u).Rename, juice.H{"id": id, "name": name})
	return err
}

// NewUserRepository returns a new UserRepository.
func NewUserRepository() UserRepository {
	return &UserRepositoryImpl{}
}
"#;

fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, text).expect("write file");
}

fn fixture() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(&tmp.path().join("repo/user.go"), REPO_GO);
    write(&tmp.path().join("repo/user_test.go"), "package repo\n\ntype UserRepository interface{}\n");
    write(&tmp.path().join("juice.xml"), CONFIG_XML);
    write(&tmp.path().join("mappers/user.xml"), USER_XML);
    tmp
}

#[test]
fn end_to_end_v1_matches_golden() {
    let tmp = fixture();
    let (path, iface) =
        goparse::find_interface(&tmp.path().join("repo"), "UserRepository").expect("find");
    assert!(path.ends_with("user.go"));

    let config = mapper::find_config(tmp.path()).expect("config");
    let statements = mapper::load_configuration(&config).expect("load");
    assert_eq!(statements.len(), 5);

    let ctx = GenerationContext::new(ApiVersion::V1, "UserRepository", "repo.UserRepository")
        .with_command_line("juicegen impl --type UserRepository");
    let out = Generator::new(&statements, ctx)
        .generate_source(&iface)
        .expect("generate");
    assert_eq!(out, EXPECTED_V1);
}

#[test]
fn end_to_end_v2_holds_manager() {
    let tmp = fixture();
    let (_, iface) =
        goparse::find_interface(&tmp.path().join("repo"), "UserRepository").expect("find");
    let statements =
        mapper::load_configuration(&tmp.path().join("juice.xml")).expect("load");

    let ctx = GenerationContext::new(ApiVersion::V2, "UserRepository", "repo.UserRepository")
        .with_destination("userRepo");
    let unit = Generator::new(&statements, ctx)
        .generate(&iface)
        .expect("generate");
    assert_eq!(unit.methods.len(), 4);
    let out = unit.render().expect("render");

    assert!(out.contains("type userRepo struct {\n\tmanager juice.Manager\n}\n"));
    assert!(out.contains("var _ UserRepository = (*userRepo)(nil)\n"));
    assert!(out.contains(concat!(
        "func (u userRepo) Create(ctx context.Context, user *User) (sql.Result, error) {\n",
        "\tctx = juice.ContextWithManager(ctx, u.manager)\n",
        "\treturn juice.ExecContext(ctx, UserRepository(u).Create, user)\n",
        "}\n",
    )));
    assert!(out.ends_with(concat!(
        "// NewUserRepository returns a new UserRepository.\n",
        "func NewUserRepository(manager juice.Manager) UserRepository {\n",
        "\treturn &userRepo{manager: manager}\n",
        "}\n",
    )));
    assert!(!out.contains("Purge"));
}

#[test]
fn wrong_namespace_fails_on_first_method() {
    let tmp = fixture();
    let (_, iface) =
        goparse::find_interface(&tmp.path().join("repo"), "UserRepository").expect("find");
    let statements =
        mapper::load_configuration(&tmp.path().join("juice.xml")).expect("load");

    let ctx = GenerationContext::new(ApiVersion::V1, "UserRepository", "main.UserRepository");
    let err = Generator::new(&statements, ctx)
        .generate_source(&iface)
        .expect_err("lookup");
    assert_eq!(
        diagnostic_of(&err).map(|d| d.code),
        Some(DiagnosticCode::JG0200LookupError)
    );
    assert!(format!("{err:#}").contains("main.UserRepository.GetByID"));
}

#[test]
fn signature_error_names_the_method() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write(
        &tmp.path().join("bad.go"),
        "package main\n\nimport \"context\"\n\ntype Bad interface {\n\tGet(ctx context.Context) error\n}\n",
    );
    let (_, iface) = goparse::find_interface(tmp.path(), "Bad").expect("find");
    let ns = namespace::autocomplete(tmp.path(), &iface.package, "Bad").expect("namespace");
    assert_eq!(ns, "main.Bad");

    let statements = mapper::load_configuration_str(
        r#"<mapper namespace="main.Bad"><select id="Get">select 1</select></mapper>"#,
        tmp.path(),
    )
    .expect("load");
    let err = Generator::new(&statements, GenerationContext::new(ApiVersion::V1, "Bad", ns))
        .generate_source(&iface)
        .expect_err("signature");
    let rendered = format!("{err:#}");
    assert!(rendered.contains("synthesize Bad.Get"), "{rendered}");
    assert!(rendered.contains("Get: must have two results"), "{rendered}");
}

#[test]
fn missing_type_is_parse_error() {
    let tmp = fixture();
    let err = goparse::find_interface(&tmp.path().join("repo"), "OrderRepository")
        .expect_err("missing");
    assert_eq!(
        diagnostic_of(&err).map(|d| d.code),
        Some(DiagnosticCode::JG0001ParseError)
    );
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::gotype;
use crate::imports::Import;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    /// Declared name; empty for unnamed parameters and results.
    pub name: String,
    /// Literal declared type, e.g. `context.Context` or `[]*User`.
    pub type_name: String,
    pub is_builtin: bool,
}

impl ParamDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        ParamDescriptor {
            name: name.into(),
            is_builtin: gotype::is_builtin(&type_name),
            type_name,
        }
    }

    pub fn unnamed(type_name: impl Into<String>) -> Self {
        Self::new("", type_name)
    }

    /// Name the parameter is bound to in the generated signature.
    pub fn binding_name(&self, index: usize) -> String {
        if self.name.is_empty() || self.name == "_" {
            format!("param{index}")
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub params: Vec<ParamDescriptor>,
    pub results: Vec<ParamDescriptor>,
}

impl MethodDescriptor {
    pub fn new(
        name: impl Into<String>,
        params: Vec<ParamDescriptor>,
        results: Vec<ParamDescriptor>,
    ) -> Self {
        MethodDescriptor {
            name: name.into(),
            params,
            results,
        }
    }

    pub fn param_name(&self, index: usize) -> String {
        self.params
            .get(index)
            .map(|p| p.binding_name(index))
            .unwrap_or_default()
    }

    /// Identifiers the signature puts in scope: parameter bindings and named
    /// results.
    pub fn bound_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .params
            .iter()
            .enumerate()
            .map(|(idx, p)| p.binding_name(idx))
            .collect();
        names.extend(
            self.results
                .iter()
                .filter(|r| !r.name.is_empty() && r.name != "_")
                .map(|r| r.name.clone()),
        );
        names
    }

    /// `Name(a A, b B) (R, error)` with unnamed parameters bound to `param<i>`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .enumerate()
            .map(|(idx, p)| format!("{} {}", p.binding_name(idx), p.type_name))
            .collect();
        let mut out = format!("{}({})", self.name, params.join(", "));

        let named_results = self.results.iter().any(|r| !r.name.is_empty());
        match self.results.as_slice() {
            [] => {}
            [only] if !named_results => {
                out.push(' ');
                out.push_str(&only.type_name);
            }
            results => {
                let items: Vec<String> = results
                    .iter()
                    .map(|r| {
                        if named_results {
                            format!("{} {}", r.name, r.type_name)
                        } else {
                            r.type_name.clone()
                        }
                    })
                    .collect();
                out.push_str(&format!(" ({})", items.join(", ")));
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub name: String,
    /// Package clause of the declaring file.
    pub package: String,
    /// Every import of the declaring file, in source order.
    pub imports: Vec<Import>,
    pub methods: Vec<MethodDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "select" => Some(StatementKind::Select),
            "insert" => Some(StatementKind::Insert),
            "update" => Some(StatementKind::Update),
            "delete" => Some(StatementKind::Delete),
            _ => None,
        }
    }

    pub fn for_read(self) -> bool {
        matches!(self, StatementKind::Select)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultMapping {
    Absent,
    Resolved(String),
    /// Declared by the statement but missing from every loaded mapper.
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// `namespace.id`
    pub key: String,
    pub kind: StatementKind,
    pub attributes: BTreeMap<String, String>,
    pub result_mapping: ResultMapping,
}

impl Statement {
    pub fn new(key: impl Into<String>, kind: StatementKind) -> Self {
        Statement {
            key: key.into(),
            kind,
            attributes: BTreeMap::new(),
            result_mapping: ResultMapping::Absent,
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_result_mapping(mut self, mapping: ResultMapping) -> Self {
        self.result_mapping = mapping;
        self
    }

    pub fn attribute(&self, name: &str) -> &str {
        self.attributes.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn is_read(&self) -> bool {
        self.kind.for_read()
    }

    /// `Ok(false)` is the expected "no result map declared" case.
    pub fn has_result_mapping(&self) -> Result<bool, Diagnostic> {
        match &self.result_mapping {
            ResultMapping::Absent => Ok(false),
            ResultMapping::Resolved(_) => Ok(true),
            ResultMapping::Unresolved(id) => Err(Diagnostic::lookup(format!(
                "`{}` references resultMap {id:?}, which is not declared",
                self.key
            ))),
        }
    }

    pub fn skips_generation(&self) -> bool {
        self.attribute("gen") == "false" || self.attribute("generate") == "false"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    #[default]
    V1,
    V2,
}

impl FromStr for ApiVersion {
    type Err = Diagnostic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "v1" => Ok(ApiVersion::V1),
            "v2" => Ok(ApiVersion::V2),
            other => Err(Diagnostic::error(
                DiagnosticCode::JG0400UnsupportedVersion,
                format!("unsupported version: {other:?}"),
            )),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::V1 => f.write_str("v1"),
            ApiVersion::V2 => f.write_str("v2"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationContext {
    pub api_version: ApiVersion,
    pub source_interface_name: String,
    pub destination_type_name: String,
    pub namespace: String,
    /// Recorded verbatim in the provenance comment.
    pub command_line: String,
}

impl GenerationContext {
    pub fn new(
        api_version: ApiVersion,
        source_interface_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        let source_interface_name = source_interface_name.into();
        GenerationContext {
            api_version,
            destination_type_name: format!("{source_interface_name}Impl"),
            source_interface_name,
            namespace: namespace.into(),
            command_line: "juicegen".to_string(),
        }
    }

    pub fn with_destination(mut self, name: impl Into<String>) -> Self {
        self.destination_type_name = name.into();
        self
    }

    pub fn with_command_line(mut self, command_line: impl Into<String>) -> Self {
        self.command_line = command_line.into();
        self
    }

    pub fn statement_key(&self, method: &str) -> String {
        format!("{}.{}", self.namespace, method)
    }

    /// Lowercased first character of the destination type.
    pub fn receiver_alias(&self) -> String {
        let mut chars = self.destination_type_name.chars();
        match chars.next() {
            Some(c) => c.to_lowercase().collect(),
            None => String::new(),
        }
    }

    /// `receiver_alias`, numbered when `method` already binds that name or
    /// its types refer to a package of that name.
    pub fn receiver_alias_for(&self, method: &MethodDescriptor) -> String {
        let mut taken = method.bound_names();
        taken.extend(BODY_LOCALS.iter().map(|s| s.to_string()));
        for p in method.params.iter().chain(method.results.iter()) {
            taken.extend(gotype::qualifiers(&p.type_name));
        }
        fresh_name(&self.receiver_alias(), &taken)
    }
}

/// Identifiers generated bodies refer to besides the receiver and parameters.
pub const BODY_LOCALS: &[&str] = &["ret", "err", "juice"];

/// `base`, or `base1`, `base2`, ... when `base` is taken.
pub fn fresh_name(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|t| t == base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedMethod {
    pub name: String,
    pub receiver_type_name: String,
    pub receiver_alias: String,
    pub signature_text: String,
    /// Empty means the method renders as a not-implemented stub.
    pub body_text: String,
}

impl SynthesizedMethod {
    pub fn render(&self) -> String {
        let mut out = format!(
            "func ({} {}) {} {{",
            self.receiver_alias, self.receiver_type_name, self.signature_text
        );
        if self.body_text.is_empty() {
            out.push_str("\n\tpanic(\"not implemented\")");
        } else {
            out.push_str(&self.body_text);
        }
        out.push_str("\n}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_param() -> ParamDescriptor {
        ParamDescriptor::new("ctx", "context.Context")
    }

    #[test]
    fn signature_binds_unnamed_params() {
        let m = MethodDescriptor::new(
            "Count",
            vec![
                ParamDescriptor::unnamed("context.Context"),
                ParamDescriptor::unnamed("string"),
            ],
            vec![
                ParamDescriptor::unnamed("int64"),
                ParamDescriptor::unnamed("error"),
            ],
        );
        assert_eq!(
            m.signature(),
            "Count(param0 context.Context, param1 string) (int64, error)"
        );
    }

    #[test]
    fn signature_single_and_named_results() {
        let single = MethodDescriptor::new(
            "Delete",
            vec![ctx_param()],
            vec![ParamDescriptor::unnamed("error")],
        );
        assert_eq!(single.signature(), "Delete(ctx context.Context) error");

        let named = MethodDescriptor::new(
            "Get",
            vec![ctx_param()],
            vec![
                ParamDescriptor::new("user", "*User"),
                ParamDescriptor::new("err", "error"),
            ],
        );
        assert_eq!(
            named.signature(),
            "Get(ctx context.Context) (user *User, err error)"
        );
    }

    #[test]
    fn unresolved_result_map_is_an_error_not_absence() {
        let absent = Statement::new("ns.List", StatementKind::Select);
        assert_eq!(absent.has_result_mapping(), Ok(false));

        let broken = Statement::new("ns.List", StatementKind::Select)
            .with_result_mapping(ResultMapping::Unresolved("userMap".to_string()));
        let err = broken.has_result_mapping().expect_err("unresolved");
        assert_eq!(err.code, DiagnosticCode::JG0200LookupError);
        assert!(err.message.contains("userMap"));
    }

    #[test]
    fn receiver_alias_skips_bound_names() {
        let ctx = GenerationContext::new(ApiVersion::V1, "UserRepository", "main.UserRepository");
        let plain = MethodDescriptor::new("Count", vec![ctx_param()], vec![]);
        assert_eq!(ctx.receiver_alias_for(&plain), "u");

        let clash = MethodDescriptor::new(
            "Create",
            vec![ctx_param(), ParamDescriptor::new("u", "*User"), ParamDescriptor::new("u1", "int")],
            vec![ParamDescriptor::unnamed("error")],
        );
        assert_eq!(ctx.receiver_alias_for(&clash), "u2");

        let errs = GenerationContext::new(ApiVersion::V1, "ErrLog", "main.ErrLog");
        let m = MethodDescriptor::new("Add", vec![ctx_param()], vec![]);
        assert_eq!(errs.receiver_alias_for(&m), "e");
        let pkg = GenerationContext::new(ApiVersion::V1, "Store", "main.Store");
        let m = MethodDescriptor::new(
            "Put",
            vec![ctx_param(), ParamDescriptor::new("v", "s.Value")],
            vec![],
        );
        assert_eq!(pkg.receiver_alias_for(&m), "s1");
    }

    #[test]
    fn api_version_parse() {
        assert_eq!("v2".parse::<ApiVersion>(), Ok(ApiVersion::V2));
        let err = "v3".parse::<ApiVersion>().expect_err("v3");
        assert_eq!(err.code, DiagnosticCode::JG0400UnsupportedVersion);
    }
}

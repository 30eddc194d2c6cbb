//! Method body synthesis.
//!
//! Each interface method is matched to one statement and turned into a body
//! that calls the matching `juice` entry point. Which template applies depends
//! on the statement's read/write kind, the declared result shape, and the API
//! version of the run.

use anyhow::Result;

use crate::diagnostics::Diagnostic;
use crate::gotype::{self, CONTEXT_TYPE, ERROR_TYPE, EXEC_RESULT_TYPE};
use crate::model::{
    fresh_name, ApiVersion, GenerationContext, MethodDescriptor, Statement, SynthesizedMethod,
};
use crate::params::{format_params, BodyWriter};

const USE_GENERATED_KEYS: &str = "useGeneratedKeys";

/// Body template family, chosen once per method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMaker {
    ReadV1,
    ReadV2,
    WriteV1,
    WriteV2,
}

impl BodyMaker {
    pub fn select(is_read: bool, version: ApiVersion) -> Self {
        match (is_read, version) {
            (true, ApiVersion::V1) => BodyMaker::ReadV1,
            (true, ApiVersion::V2) => BodyMaker::ReadV2,
            (false, ApiVersion::V1) => BodyMaker::WriteV1,
            (false, ApiVersion::V2) => BodyMaker::WriteV2,
        }
    }

    fn binds_manager(self) -> bool {
        match self {
            BodyMaker::ReadV1 | BodyMaker::WriteV1 => false,
            BodyMaker::ReadV2 | BodyMaker::WriteV2 => true,
        }
    }

    fn for_read(self) -> bool {
        match self {
            BodyMaker::ReadV1 | BodyMaker::ReadV2 => true,
            BodyMaker::WriteV1 | BodyMaker::WriteV2 => false,
        }
    }
}

/// Validates `method` against `statement` and emits its body.
pub fn synthesize(
    method: &MethodDescriptor,
    statement: &Statement,
    ctx: &GenerationContext,
) -> Result<SynthesizedMethod> {
    let maker = BodyMaker::select(statement.is_read(), ctx.api_version);
    let has_mapping = if maker.for_read() {
        check_read(method)?;
        statement.has_result_mapping()?
    } else {
        check_write(method, statement)?;
        false
    };

    let call = Call::new(method, ctx);
    let mut w = BodyWriter::new();
    if maker.binds_manager() {
        w.line(format!(
            "{ctx_name} = juice.ContextWithManager({ctx_name}, {alias}.manager)",
            ctx_name = call.ctx_name,
            alias = call.alias,
        ));
    }

    if maker.for_read() {
        let ret_type = &method.results[0].type_name;
        let list_without_mapping = gotype::is_slice(ret_type) && !has_mapping;
        build_read(&mut w, &call, ret_type, list_without_mapping);
    } else {
        build_write(&mut w, &call, method.results.len());
    }

    Ok(SynthesizedMethod {
        name: method.name.clone(),
        receiver_type_name: ctx.destination_type_name.clone(),
        receiver_alias: call.alias,
        signature_text: method.signature(),
        body_text: w.finish(),
    })
}

/// Pieces shared by every entry-point call.
struct Call {
    alias: String,
    ctx_name: String,
    /// `Iface(alias).Method`, the statement the entry point resolves.
    statement_ref: String,
    args: String,
    /// Locals for the entry point's results, renamed when the signature
    /// already binds `ret` or `err`.
    ret: String,
    err: String,
}

impl Call {
    fn new(method: &MethodDescriptor, ctx: &GenerationContext) -> Self {
        let alias = ctx.receiver_alias_for(method);
        let mut taken = method.bound_names();
        taken.push(alias.clone());
        Call {
            ret: fresh_name("ret", &taken),
            err: fresh_name("err", &taken),
            statement_ref: format!(
                "{}({}).{}",
                ctx.source_interface_name, alias, method.name
            ),
            ctx_name: method.param_name(0),
            args: format_params(method),
            alias,
        }
    }

    fn args(&self) -> String {
        format!("{}, {}, {}", self.ctx_name, self.statement_ref, self.args)
    }
}

pub fn check_read(method: &MethodDescriptor) -> Result<(), Diagnostic> {
    let name = &method.name;
    if method.results.len() != 2 {
        return Err(Diagnostic::signature(format!("{name}: must have two results")));
    }
    if method.results[1].type_name != ERROR_TYPE {
        return Err(Diagnostic::signature(format!(
            "{name}: second result must be error"
        )));
    }
    if method.params.is_empty() {
        return Err(Diagnostic::signature(format!(
            "{name}: must have at least one argument"
        )));
    }
    if method.params[0].type_name != CONTEXT_TYPE {
        return Err(Diagnostic::signature(format!(
            "{name}: first argument must be {CONTEXT_TYPE}"
        )));
    }
    Ok(())
}

pub fn check_write(method: &MethodDescriptor, statement: &Statement) -> Result<(), Diagnostic> {
    let name = &method.name;
    let params = &method.params;
    let generated_keys = statement.attribute(USE_GENERATED_KEYS) == "true";

    if params.is_empty() {
        return Err(Diagnostic::signature(format!(
            "{name}: must have at least one argument"
        )));
    }
    if params[0].type_name != CONTEXT_TYPE {
        return Err(Diagnostic::signature(format!(
            "{name}: first argument must be {CONTEXT_TYPE}"
        )));
    }
    match params.len() {
        1 => {}
        2 => {
            if generated_keys {
                let payload = &params[1];
                let payload_name = payload.binding_name(1);
                match gotype::element_type(&payload.type_name) {
                    Some(elem) if !gotype::is_pointer(elem) => {
                        return Err(Diagnostic::signature(format!(
                            "`{}` `{USE_GENERATED_KEYS}` is true, but `{payload_name}` is not a pointer array type",
                            statement.key
                        )));
                    }
                    Some(_) => {}
                    None if !gotype::is_pointer(&payload.type_name) => {
                        return Err(Diagnostic::signature(format!(
                            "`{}` `{USE_GENERATED_KEYS}` is true, but `{payload_name}` is not a pointer type",
                            statement.key
                        )));
                    }
                    None => {}
                }
            }
        }
        _ => {
            if generated_keys {
                return Err(Diagnostic::signature(format!(
                    "`{}` `{USE_GENERATED_KEYS}` is true, but there are more than 2 parameters",
                    statement.key
                )));
            }
        }
    }

    let results = &method.results;
    match results.len() {
        0 => Err(Diagnostic::signature(format!("{name}: must have one result"))),
        1 => {
            if results[0].type_name != ERROR_TYPE {
                return Err(Diagnostic::signature(format!("{name}: result must be error")));
            }
            Ok(())
        }
        2 => {
            if results[0].type_name != EXEC_RESULT_TYPE {
                return Err(Diagnostic::signature(format!(
                    "{name}: first result must be {EXEC_RESULT_TYPE}"
                )));
            }
            if results[1].type_name != ERROR_TYPE {
                return Err(Diagnostic::signature(format!(
                    "{name}: second result must be error"
                )));
            }
            Ok(())
        }
        _ => Err(Diagnostic::signature(format!(
            "{name}: must have at most two results"
        ))),
    }
}

fn build_read(w: &mut BodyWriter, call: &Call, ret_type: &str, list_without_mapping: bool) {
    if list_without_mapping {
        let elem = &ret_type[2..];
        // Pointer elements are materialized from the bare struct type.
        let (entry, bare) = if gotype::is_pointer(elem) {
            ("juice.QueryList2Context", gotype::strip_pointer(elem))
        } else {
            ("juice.QueryListContext", elem)
        };
        w.line(format!("return {entry}[{bare}]({})", call.args()));
        return;
    }

    if gotype::is_pointer(ret_type) {
        let bare = gotype::strip_pointer(ret_type);
        let (ret, err) = (&call.ret, &call.err);
        w.line(format!(
            "{ret}, {err} := juice.QueryContext[{bare}]({})",
            call.args()
        ));
        w.line(format!("if {err} != nil {{"));
        w.tab_line(2, format!("return nil, {err}"));
        w.line("}");
        w.line(format!("return &{ret}, nil"));
    } else {
        w.line(format!(
            "return juice.QueryContext[{ret_type}]({})",
            call.args()
        ));
    }
}

fn build_write(w: &mut BodyWriter, call: &Call, result_count: usize) {
    if result_count == 1 {
        let err = &call.err;
        w.line(format!("_, {err} := juice.ExecContext({})", call.args()));
        w.line(format!("return {err}"));
    } else {
        w.line(format!("return juice.ExecContext({})", call.args()));
    }
}

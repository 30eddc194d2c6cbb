use crate::gotype;
use crate::model::MethodDescriptor;

/// Argument bundle used when a statement takes no parameters.
pub const NO_ARGUMENTS: &str = "nil";

/// Builds the argument expression handed to a data-access entry point.
///
/// The first parameter is always the context and never part of the bundle.
pub fn format_params(method: &MethodDescriptor) -> String {
    match method.params.len() {
        0 | 1 => NO_ARGUMENTS.to_string(),
        2 => {
            let payload = &method.params[1];
            let name = payload.binding_name(1);
            if payload.is_builtin || gotype::is_array_or_slice(&payload.type_name) {
                format!("juice.H{{{name:?}: {name}}}")
            } else {
                name
            }
        }
        _ => {
            let entries: Vec<String> = method
                .params
                .iter()
                .enumerate()
                .skip(1)
                .map(|(idx, p)| {
                    let name = p.binding_name(idx);
                    format!("{name:?}: {name}")
                })
                .collect();
            format!("juice.H{{{}}}", entries.join(", "))
        }
    }
}

/// Accumulates method body lines, each on its own line at one tab of indent.
#[derive(Debug, Default)]
pub struct BodyWriter {
    buf: String,
}

impl BodyWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        self.tab_line(1, text);
    }

    pub fn tab_line(&mut self, tabs: usize, text: impl AsRef<str>) {
        self.buf.push('\n');
        for _ in 0..tabs {
            self.buf.push('\t');
        }
        self.buf.push_str(text.as_ref());
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParamDescriptor;

    fn method(params: Vec<ParamDescriptor>) -> MethodDescriptor {
        MethodDescriptor::new("M", params, vec![ParamDescriptor::unnamed("error")])
    }

    fn ctx() -> ParamDescriptor {
        ParamDescriptor::new("ctx", "context.Context")
    }

    #[test]
    fn context_only_is_nil() {
        assert_eq!(format_params(&method(vec![ctx()])), "nil");
        assert_eq!(format_params(&method(vec![])), "nil");
    }

    #[test]
    fn builtin_and_slice_payloads_are_wrapped() {
        assert_eq!(
            format_params(&method(vec![ctx(), ParamDescriptor::new("id", "int64")])),
            "juice.H{\"id\": id}"
        );
        assert_eq!(
            format_params(&method(vec![ctx(), ParamDescriptor::new("ids", "[]int64")])),
            "juice.H{\"ids\": ids}"
        );
    }

    #[test]
    fn struct_payload_is_passed_directly() {
        assert_eq!(
            format_params(&method(vec![ctx(), ParamDescriptor::new("user", "*User")])),
            "user"
        );
    }

    #[test]
    fn many_params_become_named_entries_in_order() {
        assert_eq!(
            format_params(&method(vec![
                ctx(),
                ParamDescriptor::new("name", "string"),
                ParamDescriptor::new("age", "int"),
            ])),
            "juice.H{\"name\": name, \"age\": age}"
        );
    }

    #[test]
    fn body_writer_indents_each_line() {
        let mut w = BodyWriter::new();
        w.line("if err != nil {");
        w.tab_line(2, "return err");
        w.line("}");
        assert_eq!(w.finish(), "\n\tif err != nil {\n\t\treturn err\n\t}");
    }
}

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::gotype;
use crate::model::MethodDescriptor;

/// Import path of the data-access framework every generated unit calls into.
pub const FRAMEWORK_IMPORT_PATH: &str = "github.com/go-juicedev/juice";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// Explicit name (`j "..."`, `_ "..."`, `. "..."`), if any.
    pub alias: Option<String>,
    /// Unquoted import path.
    pub path: String,
}

impl Import {
    pub fn new(path: impl Into<String>) -> Self {
        Import {
            alias: None,
            path: path.into(),
        }
    }

    pub fn aliased(alias: impl Into<String>, path: impl Into<String>) -> Self {
        Import {
            alias: Some(alias.into()),
            path: path.into(),
        }
    }

    pub fn framework() -> Self {
        Import::new(FRAMEWORK_IMPORT_PATH)
    }

    /// Name the import is referred to by in code.
    ///
    /// `"github.com/go-juicedev/juice"` => `juice`, `j "..."` => `j`,
    /// `"example.com/lib/v2"` => `lib`, `"gopkg.in/yaml.v3"` => `yaml`.
    pub fn usage(&self) -> &str {
        if let Some(alias) = &self.alias {
            return alias;
        }
        let mut segs = self.path.rsplit('/');
        let last = segs.next().unwrap_or(&self.path);
        if is_major_version(last) {
            if let Some(prev) = segs.next() {
                return prev;
            }
        }
        if self.path.starts_with("gopkg.in/") {
            if let Some((name, ver)) = last.rsplit_once('.') {
                if is_major_version(ver) {
                    return name;
                }
            }
        }
        last
    }

    /// Paths whose first element has no dot are treated as standard library.
    pub fn is_std(&self) -> bool {
        let first = self.path.split('/').next().unwrap_or("");
        !first.contains('.')
    }

    pub fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{alias} {:?}", self.path),
            None => format!("{:?}", self.path),
        }
    }
}

fn is_major_version(seg: &str) -> bool {
    seg.len() > 1 && seg.starts_with('v') && seg[1..].bytes().all(|b| b.is_ascii_digit())
}

/// Keeps the first import for each usage name, preserving order.
pub fn uniq(imports: Vec<Import>) -> Vec<Import> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    imports
        .into_iter()
        .filter(|imp| seen.insert(imp.usage().to_string()))
        .collect()
}

/// File imports that the given methods' parameter and result types refer to.
pub fn referenced_imports<'a>(
    methods: impl IntoIterator<Item = &'a MethodDescriptor>,
    file_imports: &[Import],
) -> Vec<Import> {
    let mut wanted: Vec<String> = Vec::new();
    for m in methods {
        for p in m.params.iter().chain(m.results.iter()) {
            for q in gotype::qualifiers(&p.type_name) {
                if !wanted.contains(&q) {
                    wanted.push(q);
                }
            }
        }
    }

    let mut out: Vec<Import> = Vec::new();
    for q in &wanted {
        if let Some(imp) = file_imports.iter().find(|imp| imp.usage() == q.as_str()) {
            out.push(imp.clone());
        }
    }
    out
}

/// Renders an import declaration: standard library block first, then the rest,
/// each block sorted by path.
pub fn render_imports(imports: &[Import]) -> String {
    match imports {
        [] => String::new(),
        [only] => format!("import {}", only.render()),
        _ => {
            let mut std_imports: Vec<&Import> = imports.iter().filter(|i| i.is_std()).collect();
            let mut other_imports: Vec<&Import> =
                imports.iter().filter(|i| !i.is_std()).collect();
            std_imports.sort_by(|a, b| a.path.cmp(&b.path));
            other_imports.sort_by(|a, b| a.path.cmp(&b.path));

            let mut blocks: Vec<String> = Vec::new();
            for group in [std_imports, other_imports] {
                if group.is_empty() {
                    continue;
                }
                let lines: Vec<String> = group.iter().map(|i| format!("\t{}", i.render())).collect();
                blocks.push(lines.join("\n"));
            }
            format!("import (\n{}\n)", blocks.join("\n\n"))
        }
    }
}

//! Loads statements from a juice XML configuration and its mapper files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::diagnostics::Diagnostic;
use crate::model::{ResultMapping, Statement, StatementKind};
use crate::registry::StatementSet;
use crate::xml::{Event, Scanner};

/// Searched in order, relative to the working directory, when no
/// configuration path is given.
pub const DEFAULT_CONFIG_FILES: [&str; 4] = [
    "juice.xml",
    "config/juice.xml",
    "config.xml",
    "config/config.xml",
];

pub fn find_config(root: &Path) -> Result<PathBuf> {
    for name in DEFAULT_CONFIG_FILES {
        let path = root.join(name);
        if path.is_file() {
            return Ok(path);
        }
    }
    Err(Diagnostic::config(format!("{} not found", DEFAULT_CONFIG_FILES.join("|"))).into())
}

/// Reads the configuration at `path`, following `<mapper resource="..."/>`
/// references relative to the file that declares them.
pub fn load_configuration(path: &Path) -> Result<StatementSet> {
    let mut loader = Loader::default();
    loader.load_file(path)?;
    Ok(loader.finish())
}

/// Parses one document held in memory. Resource references resolve against
/// `base_dir`.
pub fn load_configuration_str(src: &str, base_dir: &Path) -> Result<StatementSet> {
    let mut loader = Loader::default();
    loader.load_document(src, base_dir)?;
    Ok(loader.finish())
}

#[derive(Default)]
struct Loader {
    statements: StatementSet,
    /// Fully qualified `namespace.id` of every declared result map.
    result_maps: BTreeSet<String>,
    visiting: Vec<PathBuf>,
}

struct OpenMapper {
    namespace: String,
    depth: usize,
}

impl Loader {
    fn load_file(&mut self, path: &Path) -> Result<()> {
        let canonical = path
            .canonicalize()
            .with_context(|| format!("read configuration: {}", path.display()))?;
        if self.visiting.contains(&canonical) {
            return Err(Diagnostic::config(format!(
                "mapper resource cycle through {}",
                path.display()
            ))
            .into());
        }
        let src = std::fs::read_to_string(&canonical)
            .with_context(|| format!("read configuration: {}", path.display()))?;
        let base_dir = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        tracing::debug!(path = %canonical.display(), "loading statement configuration");
        self.visiting.push(canonical);
        let res = self
            .load_document(&src, &base_dir)
            .with_context(|| format!("parse configuration: {}", path.display()));
        self.visiting.pop();
        res
    }

    fn load_document(&mut self, src: &str, base_dir: &Path) -> Result<()> {
        let mut scanner = Scanner::new(src);
        let mut stack: Vec<String> = Vec::new();
        let mut mapper: Option<OpenMapper> = None;

        while let Some(event) = scanner.next_event()? {
            match event {
                Event::Start { name, attrs, empty } => {
                    let depth = stack.len();
                    let in_mapper_body = mapper.as_ref().is_some_and(|m| depth == m.depth + 1);

                    if name == "mapper" && mapper.is_none() {
                        if let Some(resource) = attrs.get("resource") {
                            self.load_file(&base_dir.join(resource))?;
                        } else if let Some(url) = attrs.get("url") {
                            let Some(file) = url.strip_prefix("file://") else {
                                return Err(Diagnostic::config(format!(
                                    "unsupported mapper url {url:?} (only file:// is supported)"
                                ))
                                .into());
                            };
                            self.load_file(Path::new(file))?;
                        } else {
                            let namespace = attrs
                                .get("namespace")
                                .filter(|ns| !ns.is_empty())
                                .ok_or_else(|| {
                                    Diagnostic::config("mapper is missing a namespace attribute")
                                })?;
                            if !empty {
                                mapper = Some(OpenMapper {
                                    namespace: namespace.clone(),
                                    depth,
                                });
                            }
                        }
                    } else if in_mapper_body {
                        let namespace = mapper
                            .as_ref()
                            .map(|m| m.namespace.as_str())
                            .unwrap_or_default();
                        if let Some(kind) = StatementKind::from_tag(&name) {
                            let id = attrs.get("id").filter(|id| !id.is_empty()).ok_or_else(|| {
                                Diagnostic::config(format!(
                                    "<{name}> in mapper {namespace:?} is missing an id attribute"
                                ))
                            })?;
                            let mut statement = Statement::new(format!("{namespace}.{id}"), kind);
                            statement.attributes = attrs;
                            self.statements.insert(statement)?;
                        } else if name == "resultMap" {
                            if let Some(id) = attrs.get("id") {
                                self.result_maps.insert(format!("{namespace}.{id}"));
                            }
                        }
                    }

                    if !empty {
                        stack.push(name);
                    }
                }
                Event::End { name } => {
                    match stack.pop() {
                        Some(open) if open == name => {}
                        Some(open) => {
                            return Err(Diagnostic::config(format!(
                                "</{name}> closes <{open}>"
                            ))
                            .into());
                        }
                        None => {
                            return Err(Diagnostic::config(format!("unexpected </{name}>")).into());
                        }
                    }
                    if mapper.as_ref().is_some_and(|m| m.depth == stack.len()) {
                        mapper = None;
                    }
                }
            }
        }

        if let Some(open) = stack.pop() {
            return Err(Diagnostic::config(format!("<{open}> is never closed")).into());
        }
        Ok(())
    }

    fn finish(mut self) -> StatementSet {
        let result_maps = &self.result_maps;
        for statement in self.statements.iter_mut() {
            let declared = statement.attribute("resultMap").to_string();
            if declared.is_empty() {
                continue;
            }
            let namespace = statement
                .key
                .rsplit_once('.')
                .map(|(ns, _)| ns)
                .unwrap_or_default();
            let local = format!("{namespace}.{declared}");
            statement.result_mapping = if result_maps.contains(&local) {
                ResultMapping::Resolved(local)
            } else if result_maps.contains(&declared) {
                ResultMapping::Resolved(declared)
            } else {
                ResultMapping::Unresolved(declared)
            };
        }
        self.statements
    }
}

use anyhow::{Context, Result};

use crate::gofmt;
use crate::imports::{self, Import};
use crate::model::{
    ApiVersion, GenerationContext, InterfaceDescriptor, MethodDescriptor, SynthesizedMethod,
};
use crate::registry::StatementRegistry;
use crate::synth;

/// Drives synthesis over one interface, in declaration order.
pub struct Generator<'a, R: StatementRegistry + ?Sized> {
    registry: &'a R,
    ctx: GenerationContext,
}

impl<'a, R: StatementRegistry + ?Sized> Generator<'a, R> {
    pub fn new(registry: &'a R, ctx: GenerationContext) -> Self {
        Generator { registry, ctx }
    }

    /// Builds the unit, stopping at the first lookup or signature failure.
    pub fn generate(&self, iface: &InterfaceDescriptor) -> Result<ImplementationUnit> {
        let ctx = &self.ctx;
        tracing::info!(
            interface = %ctx.source_interface_name,
            namespace = %ctx.namespace,
            version = %ctx.api_version,
            methods = iface.methods.len(),
            "generating implementation"
        );

        let mut methods: Vec<SynthesizedMethod> = Vec::with_capacity(iface.methods.len());
        let mut emitted: Vec<&MethodDescriptor> = Vec::with_capacity(iface.methods.len());
        for method in &iface.methods {
            let key = ctx.statement_key(&method.name);
            let statement = self.registry.lookup(&key)?;
            if statement.skips_generation() {
                tracing::info!(statement = %key, "skipping method marked gen=false");
                continue;
            }
            let synthesized = synth::synthesize(method, statement, ctx)
                .with_context(|| format!("synthesize {}.{}", ctx.source_interface_name, method.name))?;
            tracing::debug!(method = %method.name, read = statement.is_read(), "synthesized");
            methods.push(synthesized);
            emitted.push(method);
        }

        // Skipped methods must not pull in imports the unit never uses.
        let mut all_imports = imports::referenced_imports(emitted, &iface.imports);
        // A v1 unit whose methods were all skipped never names `juice`.
        if !methods.is_empty() || ctx.api_version == ApiVersion::V2 {
            all_imports.push(Import::framework());
        }

        Ok(ImplementationUnit {
            command_line: ctx.command_line.clone(),
            package: iface.package.clone(),
            imports: imports::uniq(all_imports),
            source_interface_name: ctx.source_interface_name.clone(),
            destination_type_name: ctx.destination_type_name.clone(),
            api_version: ctx.api_version,
            methods,
        })
    }

    /// `generate` followed by `ImplementationUnit::render`.
    pub fn generate_source(&self, iface: &InterfaceDescriptor) -> Result<String> {
        self.generate(iface)?.render()
    }
}

/// A complete generated file, before layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationUnit {
    pub command_line: String,
    pub package: String,
    pub imports: Vec<Import>,
    pub source_interface_name: String,
    pub destination_type_name: String,
    pub api_version: ApiVersion,
    pub methods: Vec<SynthesizedMethod>,
}

impl ImplementationUnit {
    pub fn render(&self) -> Result<String> {
        let src = &self.source_interface_name;
        let dst = &self.destination_type_name;

        let mut sections: Vec<String> = vec![
            format!(
                "// Code generated by \"{}\"; DO NOT EDIT.",
                self.command_line
            ),
            format!("package {}", self.package),
            imports::render_imports(&self.imports),
            self.type_decl(),
            format!("var _ {src} = (*{dst})(nil)"),
        ];
        sections.extend(self.methods.iter().map(SynthesizedMethod::render));
        sections.push(self.constructor());

        let text = sections
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        gofmt::format(&text)
    }

    fn type_decl(&self) -> String {
        let dst = &self.destination_type_name;
        match self.api_version {
            ApiVersion::V1 => format!("type {dst} struct{{}}"),
            ApiVersion::V2 => format!("type {dst} struct {{\n\tmanager juice.Manager\n}}"),
        }
    }

    fn constructor(&self) -> String {
        let src = &self.source_interface_name;
        let dst = &self.destination_type_name;
        let (params, init) = match self.api_version {
            ApiVersion::V1 => ("", String::new()),
            ApiVersion::V2 => ("manager juice.Manager", "manager: manager".to_string()),
        };
        format!(
            "// New{src} returns a new {src}.\nfunc New{src}({params}) {src} {{\n\treturn &{dst}{{{init}}}\n}}"
        )
    }
}

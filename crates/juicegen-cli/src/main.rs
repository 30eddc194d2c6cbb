use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use juicegen_core::assemble::Generator;
use juicegen_core::diagnostics::render_diagnostics_md;
use juicegen_core::model::{ApiVersion, GenerationContext};
use juicegen_core::sink::{self, Sink};
use juicegen_core::{goparse, mapper, namespace};

const MANIFEST_SCHEMA_VERSION: &str = "juicegen.manifest@0.1.0";

#[derive(Parser, Debug)]
#[command(name = "juicegen")]
#[command(about = "Generates juice data-access implementations for Go interfaces.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an implementation for an interface.
    Impl(ImplArgs),
    /// Print the statement namespace derived for an interface.
    Tell {
        /// Interface type name, e.g. UserRepository.
        #[arg(long = "type", short = 't')]
        type_name: String,
        /// Directory of the Go package declaring the interface.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Print the namespace and the parsed interface as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the diagnostics catalog as Markdown.
    Diagnostics,
    /// Generate several implementations from a manifest.
    Batch {
        #[arg(long)]
        manifest: PathBuf,
        /// If set, fail if any output differs; do not write.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
}

#[derive(Args, Debug)]
struct ImplArgs {
    /// Interface type name, e.g. UserRepository.
    #[arg(long = "type", short = 't')]
    type_name: String,
    /// Directory of the Go package declaring the interface.
    #[arg(long, default_value = ".")]
    dir: PathBuf,
    /// Statement namespace; derived from go.mod when omitted.
    #[arg(long, short = 'n')]
    namespace: Option<String>,
    /// Statement configuration; searched in the working directory when omitted.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    /// Output file; stdout when omitted.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
    /// Name of the generated struct (default <type>Impl).
    #[arg(long)]
    impl_name: Option<String>,
    #[arg(long, default_value = "v1")]
    api_version: String,
    /// If set, fail if output differs; do not write.
    #[arg(long, default_value_t = false)]
    check: bool,
}

/// One generation run, from the command line or a manifest entry.
#[derive(Debug)]
struct Job {
    type_name: String,
    dir: PathBuf,
    namespace: Option<String>,
    config: Option<PathBuf>,
    /// Searched for a default configuration when `config` is unset.
    config_root: PathBuf,
    output: Option<PathBuf>,
    impl_name: Option<String>,
    api_version: ApiVersion,
}

fn main() -> Result<()> {
    init_tracing();
    try_main().map_err(|err| {
        eprintln!("{err:#}");
        err
    })
}

fn init_tracing() {
    if let Ok(filter) = EnvFilter::try_from_env("JUICEGEN_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Impl(args) => {
            let job = Job {
                api_version: ApiVersion::from_str(&args.api_version)?,
                type_name: args.type_name,
                dir: args.dir,
                namespace: args.namespace,
                config: args.config,
                config_root: PathBuf::from("."),
                output: args.output,
                impl_name: args.impl_name,
            };
            run_job(&job, &command_line(), args.check)
        }
        Command::Tell {
            type_name,
            dir,
            json,
        } => {
            let (_, iface) = goparse::find_interface(&dir, &type_name)?;
            let ns = namespace::autocomplete(&dir, &iface.package, &type_name)?;
            if json {
                let v = serde_json::json!({ "namespace": ns, "interface": iface });
                println!("{}", serde_json::to_string_pretty(&v)?);
            } else {
                println!("{ns}");
            }
            Ok(())
        }
        Command::Diagnostics => {
            print!("{}", render_diagnostics_md());
            Ok(())
        }
        Command::Batch { manifest, check } => run_batch(&manifest, check),
    }
}

/// Program name and arguments as invoked, with the program reduced to its
/// file name so output does not depend on install location.
fn command_line() -> String {
    let mut args = std::env::args();
    let prog = match args.next() {
        Some(arg0) => {
            let name = Path::new(&arg0)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            name.unwrap_or(arg0)
        }
        None => "juicegen".to_string(),
    };
    std::iter::once(prog)
        .chain(args)
        .collect::<Vec<_>>()
        .join(" ")
}

fn run_job(job: &Job, command_line: &str, check: bool) -> Result<()> {
    let (src_path, iface) = goparse::find_interface(&job.dir, &job.type_name)?;
    tracing::debug!(source = %src_path.display(), "found interface");

    let ns = match &job.namespace {
        Some(ns) => ns.clone(),
        None => namespace::autocomplete(&job.dir, &iface.package, &job.type_name)?,
    };
    let config_path = match &job.config {
        Some(path) => path.clone(),
        None => mapper::find_config(&job.config_root)?,
    };
    let statements = mapper::load_configuration(&config_path)?;
    tracing::info!(
        config = %config_path.display(),
        statements = statements.len(),
        "loaded statements"
    );

    let mut ctx = GenerationContext::new(job.api_version, &job.type_name, ns)
        .with_command_line(command_line);
    if let Some(name) = &job.impl_name {
        ctx = ctx.with_destination(name);
    }
    // Rendered in full before any sink is touched.
    let text = Generator::new(&statements, ctx).generate_source(&iface)?;

    if check {
        let Some(out_path) = &job.output else {
            anyhow::bail!("--check requires an output file");
        };
        return sink::check_unit(out_path, &text);
    }
    Sink::from_output(job.output.as_deref()).write_unit(&text)
}

#[derive(Debug, serde::Deserialize)]
struct Manifest {
    schema_version: String,
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct ManifestEntry {
    #[serde(rename = "type")]
    type_name: String,
    dir: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    config: Option<String>,
    output: String,
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    impl_name: Option<String>,
}

impl ManifestEntry {
    /// Paths are relative to the manifest's directory.
    fn to_job(&self, base: &Path) -> Result<Job> {
        let api_version = match &self.api_version {
            Some(v) => ApiVersion::from_str(v)?,
            None => ApiVersion::default(),
        };
        Ok(Job {
            type_name: self.type_name.clone(),
            dir: base.join(&self.dir),
            namespace: self.namespace.clone(),
            config: self.config.as_ref().map(|c| base.join(c)),
            config_root: base.to_path_buf(),
            output: Some(base.join(&self.output)),
            impl_name: self.impl_name.clone(),
            api_version,
        })
    }

    /// The equivalent single `impl` invocation, recorded as provenance.
    fn command_line(&self) -> String {
        let mut parts: Vec<String> = vec![
            "juicegen".to_string(),
            "impl".to_string(),
            "--type".to_string(),
            self.type_name.clone(),
        ];
        if let Some(ns) = &self.namespace {
            parts.extend(["--namespace".to_string(), ns.clone()]);
        }
        if let Some(name) = &self.impl_name {
            parts.extend(["--impl-name".to_string(), name.clone()]);
        }
        if let Some(v) = &self.api_version {
            parts.extend(["--api-version".to_string(), v.clone()]);
        }
        parts.join(" ")
    }
}

fn run_batch(manifest_path: &Path, check: bool) -> Result<()> {
    let bytes = std::fs::read(manifest_path)
        .with_context(|| format!("read manifest: {}", manifest_path.display()))?;
    let m: Manifest = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse manifest JSON: {}", manifest_path.display()))?;
    if m.schema_version.trim() != MANIFEST_SCHEMA_VERSION {
        anyhow::bail!(
            "manifest schema_version mismatch: expected {MANIFEST_SCHEMA_VERSION} got {:?}",
            m.schema_version
        );
    }

    let base = manifest_path.parent().unwrap_or(Path::new(""));
    for (idx, e) in m.entries.iter().enumerate() {
        let job = e
            .to_job(base)
            .with_context(|| format!("manifest entry[{idx}] {}", e.type_name))?;
        run_job(&job, &e.command_line(), check)
            .with_context(|| format!("manifest entry[{idx}] {}", e.type_name))?;
    }
    Ok(())
}

//! Command-line surface.
//!
//! Every subcommand resolves the config path the same way (`--config`, then
//! `--global`, then a project-local file, then the global file), loads the
//! document, and saves it back only when it changed something.

pub mod output;

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use crate::cloud::oci_cli::OciCli;
use crate::cloud::{with_timeout, CloudApi, IdentityLookup, FETCH_TIMEOUT};
use crate::daemon::Service;
use crate::profiles::{self, Profiles};
use crate::store::discovery::{global_config_path, resolve_config_path};
use crate::store::{self, home_dir, Context, Document};
use crate::tui::app::{Mode, NavState};
use crate::tui::names::{prime_tenancy_names, TenancyNames};
use crate::tui::prompt::run_prompt;
use crate::tui::runner::run_picker;
use crate::tui::session::{FilePersister, Session};

use output::Format;

#[derive(Parser, Debug)]
#[command(
    name = "oci-context",
    version,
    about = "Manage OCI contexts (profile, tenancy, compartment, region)"
)]
pub struct Cli {
    /// Path to config file (default: project .oci-context.yml, else ~/.oci-context/config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Force use of the global config (~/.oci-context/config.yml)
    #[arg(short, long, global = true)]
    pub global: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize the config file
    Init,
    /// List contexts
    List {
        /// Output format: json|yaml|plain (default: human-readable)
        #[arg(short = 'o', long = "out")]
        out: Option<String>,
        /// Show every field in human-readable output
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show the current context name
    Current,
    /// Switch current context
    Use { name: String },
    /// Add or update a context
    Add(AddArgs),
    /// Update fields of a context
    Set {
        name: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete a context
    Delete { name: String },
    /// Show current context details with friendly names
    Status {
        /// Output format: json|yaml|plain (default: human-readable)
        #[arg(short = 'o', long = "out")]
        out: Option<String>,
        /// Plain ids only (OCIDs, no names)
        #[arg(short, long)]
        plain: bool,
    },
    /// Export the current context as env lines or json
    Export {
        /// Output format: env|json
        #[arg(short, long, default_value = "env")]
        format: String,
    },
    /// Import contexts from OCI CLI config profiles
    Import {
        /// Path to the OCI CLI config (default ~/.oci/config)
        #[arg(short = 'o', long = "oci-config")]
        oci_config: Option<PathBuf>,
        /// Overwrite existing contexts with the same name
        #[arg(short = 'w', long)]
        overwrite: bool,
    },
    /// Manage the daemon
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
    /// Interactive context picker with compartment selection
    Tui {
        /// Start mode: contexts|tenancies|compartments|regions
        mode: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Start the daemon
    Serve,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Context name
    #[arg(short, long)]
    pub name: String,
    /// OCI CLI profile
    #[arg(short, long)]
    pub profile: String,
    /// Tenancy OCID
    #[arg(short, long)]
    pub tenancy: String,
    /// Compartment OCID
    #[arg(short = 'm', long)]
    pub compartment: String,
    /// OCI region
    #[arg(short, long, default_value = "")]
    pub region: String,
    /// User hint
    #[arg(short, long, default_value = "")]
    pub user: String,
    /// Notes
    #[arg(short = 'N', long, default_value = "")]
    pub notes: String,
}

impl From<AddArgs> for Context {
    fn from(a: AddArgs) -> Self {
        Context {
            name: a.name,
            profile: a.profile,
            tenancy_id: a.tenancy,
            compartment_id: a.compartment,
            region: a.region,
            user: a.user,
            notes: a.notes,
        }
    }
}

/// Optional field overrides for `set`. Empty values leave the field alone.
#[derive(Args, Debug, Default)]
pub struct FieldArgs {
    #[arg(short, long)]
    pub region: Option<String>,
    #[arg(short, long)]
    pub profile: Option<String>,
    #[arg(short, long)]
    pub tenancy: Option<String>,
    #[arg(short = 'm', long)]
    pub compartment: Option<String>,
    #[arg(short, long)]
    pub user: Option<String>,
    #[arg(short = 'N', long)]
    pub notes: Option<String>,
}

impl FieldArgs {
    fn apply(self, ctx: &mut Context) {
        let pairs = [
            (self.region, &mut ctx.region),
            (self.profile, &mut ctx.profile),
            (self.tenancy, &mut ctx.tenancy_id),
            (self.compartment, &mut ctx.compartment_id),
            (self.user, &mut ctx.user),
            (self.notes, &mut ctx.notes),
        ];
        for (value, field) in pairs {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                *field = v;
            }
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let explicit = cli.config.as_deref();
    let resolved = || -> anyhow::Result<PathBuf> {
        let path = resolve_config_path(explicit, cli.global)?;
        tracing::debug!(path = %path.display(), "resolved config");
        Ok(path)
    };
    let mut out = io::stdout();
    match cli.command {
        Command::Init => init(&mut out, &explicit_or_global(explicit)?),
        Command::List { out: format, verbose } => {
            let doc = load(&resolved()?)?;
            output::contexts(&mut out, &doc, Format::parse(format.as_deref())?, verbose)
        }
        Command::Current => current(&mut out, &resolved()?),
        Command::Use { name } => use_context(&resolved()?, &name),
        Command::Add(args) => add(&mut out, &resolved()?, args.into()),
        Command::Set { name, fields } => set(&mut out, &resolved()?, &name, fields),
        Command::Delete { name } => delete(&mut out, &resolved()?, &name),
        Command::Status { out: format, plain } => {
            let format = Format::parse(format.as_deref())?;
            status(&mut out, &OciCli::new(), &resolved()?, format, plain).await
        }
        Command::Export { format } => {
            let doc = load(&resolved()?)?;
            output::export(&mut out, doc.current()?, &format)
        }
        Command::Import {
            oci_config,
            overwrite,
        } => import(&mut out, &resolved()?, oci_config.as_deref(), overwrite),
        Command::Daemon {
            command: DaemonCommand::Serve,
        } => serve(&mut out, &explicit_or_global(explicit)?).await,
        Command::Tui { mode } => tui(&mut out, &resolved()?, mode.as_deref()).await,
    }
}

/// `init` and `daemon serve` ignore project-local files.
fn explicit_or_global(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(global_config_path()?),
    }
}

fn load(path: &Path) -> anyhow::Result<Document> {
    store::load(path).with_context(|| format!("loading {}", path.display()))
}

fn save(path: &Path, doc: &Document) -> anyhow::Result<()> {
    store::save(path, doc).with_context(|| format!("saving {}", path.display()))
}

pub fn init<W: Write>(out: &mut W, path: &Path) -> anyhow::Result<()> {
    store::ensure_default(path)?;
    writeln!(out, "Initialized config at {}", path.display())?;
    Ok(())
}

pub fn current<W: Write>(out: &mut W, path: &Path) -> anyhow::Result<()> {
    let doc = load(path)?;
    writeln!(out, "{}", doc.current()?.name)?;
    Ok(())
}

pub fn use_context(path: &Path, name: &str) -> anyhow::Result<()> {
    let mut doc = load(path)?;
    doc.use_context(name)?;
    save(path, &doc)
}

pub fn add<W: Write>(out: &mut W, path: &Path, ctx: Context) -> anyhow::Result<()> {
    ctx.validate()?;
    let mut doc = load(path)?;
    let name = ctx.name.clone();
    doc.upsert(ctx);
    save(path, &doc)?;
    writeln!(out, "Added/updated context {name}")?;
    Ok(())
}

pub fn set<W: Write>(out: &mut W, path: &Path, name: &str, fields: FieldArgs) -> anyhow::Result<()> {
    let mut doc = load(path)?;
    let mut ctx = doc.get_by_name(name)?.clone();
    fields.apply(&mut ctx);
    doc.upsert(ctx);
    save(path, &doc)?;
    writeln!(out, "Updated context {name}")?;
    Ok(())
}

pub fn delete<W: Write>(out: &mut W, path: &Path, name: &str) -> anyhow::Result<()> {
    let mut doc = load(path)?;
    doc.delete_by_name(name)?;
    save(path, &doc)?;
    writeln!(out, "Deleted context {name}")?;
    Ok(())
}

pub async fn status<W: Write>(
    out: &mut W,
    cloud: &dyn CloudApi,
    path: &Path,
    format: Format,
    ids_only: bool,
) -> anyhow::Result<()> {
    let doc = load(path)?;
    let ctx = doc.current()?;
    let lookup = IdentityLookup {
        profile: ctx.profile.clone(),
        region: ctx.region.clone(),
        tenancy_id: ctx.tenancy_id.clone(),
        compartment_id: ctx.compartment_id.clone(),
        user_id: ctx.user.clone(),
    };
    let details = with_timeout(
        "fetch identity details",
        FETCH_TIMEOUT,
        cloud.fetch_identity_details(&doc.options.auth_config_path, &lookup),
    )
    .await?;
    output::status(out, ctx, &details, format, ids_only)
}

/// Turn each profile into a context rooted at its tenancy.
pub fn import<W: Write>(
    out: &mut W,
    path: &Path,
    oci_config: Option<&Path>,
    overwrite: bool,
) -> anyhow::Result<()> {
    let mut doc = load(path)?;
    let source = match oci_config {
        Some(p) => p.to_path_buf(),
        None if !doc.options.auth_config_path.is_empty() => {
            PathBuf::from(&doc.options.auth_config_path)
        }
        None => home_dir()
            .map(|h| h.join(".oci").join("config"))
            .context("HOME is not set")?,
    };
    let profiles = profiles::load_profiles(&source)?;

    let (mut imported, mut skipped) = (0, 0);
    for (name, p) in profiles {
        let ctx = Context {
            name: name.clone(),
            profile: name.clone(),
            tenancy_id: p.tenancy.clone(),
            compartment_id: p.tenancy,
            region: p.region,
            user: p.user,
            notes: "imported from OCI CLI config".into(),
        };
        ctx.validate()
            .with_context(|| format!("profile {name} invalid"))?;
        if !overwrite && doc.get_by_name(&name).is_ok() {
            eprintln!("skip: {name} (exists)");
            skipped += 1;
            continue;
        }
        doc.upsert(ctx);
        eprintln!("import: {name} (profile)");
        imported += 1;
    }

    save(path, &doc)?;
    writeln!(
        out,
        "Imported {imported} profiles (skipped {skipped}) from {}",
        source.display()
    )?;
    Ok(())
}

async fn serve<W: Write>(out: &mut W, path: &Path) -> anyhow::Result<()> {
    store::ensure_default(path)?;
    let service = Service::open(path)?;
    writeln!(out, "Starting daemon with config {}", path.display())?;
    out.flush()?;
    service.serve().await.context("daemon stopped")
}

async fn tui<W: Write>(out: &mut W, path: &Path, mode: Option<&str>) -> anyhow::Result<()> {
    let start = match mode {
        Some(m) => Mode::parse(m).with_context(|| format!("unknown mode: {m}"))?,
        None => Mode::Contexts,
    };
    let doc = load(path)?;
    let auth = doc.options.auth_config_path.clone();
    let profiles = profiles::load_profiles(Path::new(&auth)).unwrap_or_else(|e| {
        tracing::debug!("profiles unavailable, using stored contexts: {e}");
        Profiles::new()
    });
    let cloud: Arc<dyn CloudApi> = Arc::new(OciCli::new());

    if !io::stdout().is_terminal() {
        let mut input = io::stdin().lock();
        return run_prompt(&mut input, out, cloud.as_ref(), path, doc, &profiles).await;
    }

    let names = Arc::new(TenancyNames::new());
    prime_tenancy_names(cloud.clone(), names.clone(), &profiles, &auth).await;

    let state = NavState::new(doc, profiles, &names);
    let mut session = Session::new(state, cloud, FilePersister::new(path));
    let effect = session.state.start(start);
    session.begin(effect);
    run_picker(&mut session).await?;

    if session.state.committed {
        writeln!(out, "Switched to context {}", session.state.active.name)?;
    }
    if let Some(e) = session.state.error.take() {
        return Err(e.into());
    }
    Ok(())
}

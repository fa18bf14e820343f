use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vaultmover_core::config::Overrides;
use vaultmover_core::{
    export_entries, AutoDetect, Cap, Catalogue, Decrypters, Descriptor, EntryFilter, FileConfig,
    Format, ManagerSettings, MigrationError, Settings, Source,
};
use zeroize::Zeroizing;

/// Move credentials from one password manager to another
#[derive(Parser, Debug)]
#[command(name = "vaultmover", version)]
#[command(about = "Import credentials from a password manager export into another manager")]
struct Cli {
    /// Destination password manager
    #[arg(value_name = "DST", required_unless_present_any = ["list_importers", "list_exporters"])]
    dst: Option<String>,

    /// Source password manager name, import class or path to the data to import
    #[arg(value_name = "SRC", num_args = 0..=2)]
    src: Vec<String>,

    /// Where to write the exported data
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Only import the passwords from a specific subfolder
    #[arg(short = 'r', long = "root", default_value = "")]
    sroot: String,

    /// Export the passwords into a subfolder of the destination
    #[arg(short = 'p', long = "pass-root", default_value = "")]
    droot: String,

    /// Key file used to unlock an encrypted database
    #[arg(short, long)]
    key: Option<PathBuf>,

    /// Also import all the extra data present
    #[arg(short, long)]
    all: bool,

    /// Overwrite existing passwords
    #[arg(short, long)]
    force: bool,

    /// Make the paths more command line friendly
    #[arg(short, long)]
    clean: bool,

    /// Convert invalid characters present in the paths
    #[arg(short = 'C', long)]
    convert: bool,

    /// Separator used in the paths
    #[arg(long = "sep", value_name = "CHAR")]
    separator: Option<String>,

    /// CSV delimiter
    #[arg(long = "del", value_name = "CHAR")]
    delimiter: Option<String>,

    /// CSV expected columns, for the generic CSV adapter
    #[arg(long, default_value = "")]
    cols: String,

    /// Configuration file, defaults to `.import`
    #[arg(long)]
    config: Option<PathBuf>,

    /// Export only the entries selected by a JSONPath expression
    #[arg(long, value_name = "EXPR")]
    filter: Option<String>,

    /// List the supported password importers
    #[arg(short = 'l', long)]
    list_importers: bool,

    /// List the supported password exporters
    #[arg(short = 'e', long)]
    list_exporters: bool,

    /// Increase verbosity, can be used more than once
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn list_managers(catalogue: &Catalogue, cap: Cap, quiet: bool, verbose: bool) {
    let names = catalogue.names(cap);
    if quiet {
        println!("{}", names.join("\n"));
        return;
    }
    if cap == Cap::EXPORT {
        println!("The {} supported exporter password managers are:", names.len());
    } else {
        println!("The {} supported password managers are:", catalogue.len());
    }

    let matrix = catalogue.matrix(cap);
    let label = |d: &Descriptor| match d.version {
        "" => d.format.tag().to_string(),
        version => format!("{} (v{})", d.format.tag(), version),
    };
    let width = names.iter().map(|n| n.len()).max().unwrap_or_default() + 1;
    for (name, descriptors) in &matrix {
        if verbose {
            for descriptor in descriptors {
                println!(
                    "{:width$}{:14}{}",
                    name,
                    label(*descriptor),
                    descriptor.class_name,
                    width = width
                );
            }
        } else {
            let formats: Vec<String> = descriptors.iter().map(|d| label(*d)).collect();
            let url = descriptors.first().map_or("", |d| d.url);
            println!("{:width$}{:32}{}", name, formats.join(", "), url, width = width);
        }
    }
}

/// Resolve the importer descriptor and the source it reads.
fn select_importer<'a>(
    catalogue: &'a Catalogue,
    cli: &Cli,
    delimiter: u8,
) -> Result<(&'a Descriptor, Source)> {
    let detect = AutoDetect::new(catalogue).delimiter(delimiter);
    let names = catalogue.names(Cap::IMPORT);

    match cli.src.as_slice() {
        [name] if names.iter().any(|n| *n == name.as_str()) => {
            info!("Using default manager.");
            let descriptor = detect.default(name)?;
            if descriptor.format != Format::Pass {
                bail!("The path to import is empty. Please try with: vaultmover <dst> {name} <path>");
            }
            let store = std::env::var_os("PASSWORD_STORE_DIR")
                .ok_or_else(|| anyhow!("PASSWORD_STORE_DIR is not set, give the store path"))?;
            Ok((descriptor, Source::path(store)))
        }
        [path] => {
            info!("Trying to guess file format and manager name.");
            let source = decrypt(Path::new(path))?;
            let descriptor = detect.manager(&source).ok_or_else(|| {
                anyhow!(
                    "Unable to detect the manager. Please try with: vaultmover <dst> <manager> {}",
                    path
                )
            })?;
            Ok((descriptor, source))
        }
        [name, path] => {
            let source = decrypt(Path::new(path))?;
            if names.iter().any(|n| *n == name.as_str()) {
                info!("Trying to guess file format.");
                Ok((detect.format(name, &source)?, source))
            } else if catalogue.classnames(Cap::IMPORT).iter().any(|n| *n == name.as_str()) {
                info!("Using import class: {}.", name);
                Ok((catalogue.get(name, None, None, Cap::IMPORT)?, source))
            } else {
                bail!("{name} is not a supported source password manager.")
            }
        }
        _ => bail!("The source password manager or the path to import is empty."),
    }
}

fn decrypt(path: &Path) -> Result<Source> {
    Decrypters::default()
        .prepare(Source::path(path))
        .with_context(|| format!("unable to decrypt {}", path.display()))
}

fn run(cli: Cli) -> Result<()> {
    let catalogue = Catalogue::builtin();

    if cli.list_importers || cli.list_exporters {
        let cap = if cli.list_importers {
            Cap::IMPORT
        } else {
            Cap::EXPORT
        };
        list_managers(&catalogue, cap, cli.quiet, cli.verbose > 0);
        return Ok(());
    }

    let dst = cli.dst.as_deref().unwrap_or_default();
    if dst.is_empty() {
        bail!("destination password manager not present.");
    }
    if !catalogue.names(Cap::EXPORT).iter().any(|n| *n == dst) {
        bail!("{dst} is not a supported destination password manager.");
    }

    let file_config = FileConfig::discover(cli.config.as_deref())?;
    let settings = Settings::resolve(
        &file_config,
        &Overrides {
            separator: cli.separator.clone(),
            delimiter: cli.delimiter.clone(),
            all: cli.all,
            force: cli.force,
            clean: cli.clean,
            convert: cli.convert,
        },
    )?;
    debug!("{:?}", settings);
    let filter = cli.filter.as_deref().map(EntryFilter::parse).transpose()?;

    let (importer, source) = select_importer(&catalogue, &cli, settings.delimiter)?;
    info!(
        "Importer: {}, Format: {}, Version: {}",
        importer.name, importer.format, importer.version
    );

    let mut manager_settings = ManagerSettings {
        root: cli.sroot.clone(),
        destination_root: cli.droot.clone(),
        delimiter: settings.delimiter,
        cols: cli.cols.clone(),
        key_file: cli.key.clone(),
        master_password: None,
        all: settings.all,
        force: settings.force,
    };
    if importer.format == Format::Kdbx {
        let password = rpassword::prompt_password(format!("Password for {}: ", source))?;
        manager_settings.master_password = Some(Zeroizing::new(password));
    }

    let mut entries = importer
        .importer(&manager_settings)?
        .parse(&source)
        .map_err(|e| match e {
            MigrationError::MissingDependency { name, hint } => anyhow!(
                "Importing {}, missing required dependency: {}\nYou can install it with: {}",
                importer.name,
                name,
                hint
            ),
            e if e.is_format_error() => {
                warn!("{}", e);
                anyhow!("{} is not a valid exported {} file.", source, importer.name)
            }
            e => e.into(),
        })?;
    if !importer.secure {
        warn!(
            "The password manager {} has been flagged as insecure, you should update all your \
             newly imported credentials.",
            importer.name
        );
    }

    settings.cleaner().run(&mut entries);

    let destination = catalogue.get(dst, None, None, Cap::EXPORT)?;
    let mut exporter = destination.exporter(cli.out.as_deref(), &manager_settings)?;
    let report = export_entries(exporter.as_mut(), &entries, filter.as_ref())?;

    if !cli.quiet {
        eprintln!("Importing passwords from {} to {}", importer.name, dst);
        eprintln!("Passwords imported from: {}", source);
        if !manager_settings.destination_root.is_empty() {
            eprintln!("Root path: {}", manager_settings.destination_root);
        }
        eprintln!("Number of password imported: {}", report.inserted.len());
        if cli.verbose > 0 {
            for path in &report.inserted {
                eprintln!("  {}", path);
            }
        }
    }
    if !report.is_complete() {
        warn!("{} entries could not be exported", report.failed.len());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

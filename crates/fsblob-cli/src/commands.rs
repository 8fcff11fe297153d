use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use fsblob_store::{BlobContainer, FsBlobStore, StoreConfig};
use fsblob_types::BlobPath;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let container = open_container(&cli)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let format = cli.format;

    match cli.command {
        Command::Ls(args) => cmd_ls(&container, args, &format, &mut out),
        Command::Exists(args) => cmd_exists(&container, args, &format, &mut out),
        Command::Cat(args) => cmd_cat(&container, args, &mut out),
        Command::Put(args) => cmd_put(&container, args, &mut out),
        Command::Rm(args) => cmd_rm(&container, args, &mut out),
        Command::Mv(args) => cmd_mv(&container, args, &mut out),
    }
}

fn open_container(cli: &Cli) -> anyhow::Result<fsblob_store::FsBlobContainer> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::with_root(&cli.root),
    };
    if let Some(size) = cli.buffer_size {
        config.buffer_size_bytes = size;
    }

    let path = parse_container_path(cli.path.as_deref());
    let store = FsBlobStore::new(config).context("failed to open blob store")?;
    store
        .container(&path)
        .with_context(|| format!("failed to open container {path}"))
}

fn parse_container_path(raw: Option<&str>) -> BlobPath {
    raw.map(|p| p.split('/').filter(|s| !s.is_empty()).collect::<BlobPath>())
        .unwrap_or_default()
}

fn cmd_ls(
    container: &dyn BlobContainer,
    args: LsArgs,
    format: &OutputFormat,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let blobs = match &args.prefix {
        Some(prefix) => container.list_blobs_by_prefix(prefix)?,
        None => container.list_blobs()?,
    };

    match format {
        OutputFormat::Json => {
            let list: Vec<_> = blobs.values().collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&list)?)?;
        }
        OutputFormat::Text => {
            if blobs.is_empty() {
                writeln!(out, "No blobs.")?;
            }
            for meta in blobs.values() {
                writeln!(out, "{:>12}  {}", meta.length.to_string().dimmed(), meta.name)?;
            }
        }
    }
    Ok(())
}

fn cmd_exists(
    container: &dyn BlobContainer,
    args: NameArgs,
    format: &OutputFormat,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let exists = container.blob_exists(&args.name)?;
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({ "name": args.name, "exists": exists });
            writeln!(out, "{value}")?;
        }
        OutputFormat::Text if exists => writeln!(out, "{} {}", "✓".green(), args.name)?,
        OutputFormat::Text => writeln!(out, "{} {}", "✗".red(), args.name)?,
    }
    Ok(())
}

fn cmd_cat(container: &dyn BlobContainer, args: NameArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut input = container.open_input(&args.name)?;
    io::copy(&mut input, out)?;
    Ok(())
}

fn cmd_put(container: &dyn BlobContainer, args: PutArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let written = if args.atomic {
        let data = read_source(args.file.as_deref())?;
        container.write_blob_atomic(&args.name, &data)?
    } else {
        let mut output = container.create_output(&args.name)?;
        match &args.file {
            Some(path) => {
                let mut file = File::open(path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                io::copy(&mut file, &mut output)?;
            }
            None => {
                io::copy(&mut io::stdin().lock(), &mut output)?;
            }
        }
        output.finish()?
    };
    writeln!(out, "{} Wrote {} ({} bytes)", "✓".green().bold(), args.name.bold(), written)?;
    Ok(())
}

fn read_source(file: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match file {
        Some(path) => std::fs::read(path).with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut data = Vec::new();
            io::stdin().lock().read_to_end(&mut data)?;
            Ok(data)
        }
    }
}

fn cmd_rm(container: &dyn BlobContainer, args: RmArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    for name in &args.names {
        container.delete_blob(name)?;
        writeln!(out, "Deleted {}", name.yellow())?;
    }
    Ok(())
}

fn cmd_mv(container: &dyn BlobContainer, args: MvArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    container.move_blob(&args.source, &args.target)?;
    writeln!(out, "{} {} → {}", "✓".green(), args.source, args.target.bold())?;
    Ok(())
}

//! Dump GPX files as a decoded tree, or re-serialise them in canonical form.
//!
//! ```bash
//! # Print the decoded document
//! gpxdump track.gpx
//!
//! # Normalise with two-space indentation
//! gpxdump --write track.gpx > normalised.gpx
//!
//! # Read from stdin, with a custom time layout
//! cat track.gpx | gpxdump --time-layout "%d.%m.%Y %H:%M:%S"
//! ```

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use gpx_codec::{DecodeOptions, Document, TimeLayout, XML_HEADER};

/// Dump GPX documents
#[derive(Parser, Debug)]
#[command(name = "gpxdump")]
#[command(version, about, long_about = None)]
struct Args {
    /// GPX files to read; stdin when none are given
    files: Vec<PathBuf>,

    /// Re-serialise each document instead of printing the decoded tree
    #[arg(short, long)]
    write: bool,

    /// Indentation used with --write
    #[arg(long, default_value = "  ")]
    indent: String,

    /// Extra strftime layouts tried after the defaults when reading times
    #[arg(long = "time-layout")]
    time_layouts: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut opts = DecodeOptions::default();
    opts.time_layouts
        .extend(args.time_layouts.iter().cloned().map(TimeLayout::Format));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.files.is_empty() {
        let doc = gpx_codec::read_with_options(std::io::stdin().lock(), &opts)
            .context("failed to read GPX from stdin")?;
        dump(&mut out, &doc, &args)?;
    }

    for path in &args.files {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let doc = gpx_codec::read_with_options(std::io::BufReader::new(file), &opts)
            .with_context(|| format!("failed to read GPX from {}", path.display()))?;
        log::debug!(
            "{}: {} waypoints, {} routes, {} tracks",
            path.display(),
            doc.waypoints.len(),
            doc.routes.len(),
            doc.tracks.len()
        );
        dump(&mut out, &doc, &args)?;
    }

    Ok(())
}

fn dump(out: &mut impl Write, doc: &Document, args: &Args) -> anyhow::Result<()> {
    if args.write {
        out.write_all(XML_HEADER.as_bytes())?;
        doc.write_indent(&mut *out, "", &args.indent)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{doc:#?}")?;
    }
    Ok(())
}

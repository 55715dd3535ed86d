//! pdfprobe - structural inspection of PDF files
//!
//! Every analysis tool prints a JSON report per input file. Tools that
//! produce a file (exports, split, merge, sanitize) write it to `-o` and
//! print their manifest instead.

mod config;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use memmap2::Mmap;
use pdfprobe_core::api::{self, BinaryOutput, ContentOptions, PageSelection};
use pdfprobe_core::Bytes;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;

/// Structural inspection of PDF files: xref, objects, content operators,
/// resources and forensic indicators.
#[derive(Parser, Debug)]
#[command(name = "pdfprobe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG overrides it
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON file with option defaults (sections: analysis, content, export, split)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Inputs {
    /// One or more PDF files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Path to write the JSON report to, or "-" for stdout
    #[arg(short, long, default_value = "-")]
    output: String,
}

#[derive(Args, Debug)]
struct OpsArgs {
    /// Pages to read, e.g. "1-3,5,9-"
    #[arg(long)]
    pages: Option<PageSelection>,

    /// Operations read per page
    #[arg(long)]
    max_ops: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Version, cross-reference layout, object counts and document info
    Inspect {
        #[command(flatten)]
        inputs: Inputs,
        /// Dump every in-use object too
        #[arg(long)]
        include_objects: bool,
        /// Objects dumped at most
        #[arg(long)]
        max_objects: Option<usize>,
    },
    /// Every cross-reference section and the merged index
    Xref {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Content-stream operations per page
    Ops {
        #[command(flatten)]
        inputs: Inputs,
        #[command(flatten)]
        ops: OpsArgs,
    },
    /// Objects not reachable from the trailer
    Orphans {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Scripts, actions, embedded files and other active content
    Forensics {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Annotations of every page
    Annotations {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Embedded files with size and checksum checks
    Attachments {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Fonts, their embedding and the pages using them
    Fonts {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Image XObjects and inline images
    Images {
        #[command(flatten)]
        inputs: Inputs,
        /// Operations read per page when looking for inline images
        #[arg(long)]
        max_ops: Option<usize>,
    },
    /// Signature fields and signature dictionaries
    Signatures {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Per-page guess at whether the document is a scan
    Scan {
        #[command(flatten)]
        inputs: Inputs,
        /// Operations read per page
        #[arg(long)]
        max_ops: Option<usize>,
    },
    /// Write embedded files to a ZIP archive
    ExportAttachments {
        file: PathBuf,
        /// Archive to create
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write image XObjects to a ZIP archive
    ExportImages {
        file: PathBuf,
        /// Archive to create
        #[arg(short, long)]
        output: PathBuf,
        /// Leave out images whose filter cannot be decoded
        #[arg(long)]
        skip_undecoded: bool,
    },
    /// Copy selected pages into a new PDF
    Split {
        file: PathBuf,
        /// Pages to keep, in output order, e.g. "3,1-2"
        #[arg(long)]
        pages: Option<PageSelection>,
        /// PDF to create
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Concatenate the pages of several PDFs
    Merge {
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,
        /// PDF to create
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Copy a PDF without scripts, triggers, embedded files or active actions
    Sanitize {
        file: PathBuf,
        /// PDF to create
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Report for one of several inputs.
#[derive(Serialize)]
struct FileResult<T> {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Map `path` into memory.
fn load(path: &Path) -> Result<Bytes> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("reading metadata of {}", path.display()))?
        .len();
    if len == 0 {
        return Ok(Bytes::new());
    }
    // SAFETY: read-only mapping; the file must not be truncated while mapped.
    let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("mapping {}", path.display()))?;
    debug!(path = %path.display(), len, "input mapped");
    Ok(Bytes::from_owner(mmap))
}

fn open_output(output: &str) -> Result<Box<dyn Write>> {
    if output == "-" {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    let file = File::create(output).with_context(|| format!("creating {output}"))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn write_json<T: Serialize>(out: &mut dyn Write, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Run `tool` on every input in parallel. A single input prints its report
/// as is; several print an array of per-file results. Returns whether every
/// input succeeded.
fn run_reports<T, F>(inputs: &Inputs, pretty: bool, tool: F) -> Result<bool>
where
    T: Serialize + Send,
    F: Fn(Bytes) -> pdfprobe_core::Result<T> + Sync,
{
    let results: Vec<(&PathBuf, Result<T>)> = inputs
        .files
        .par_iter()
        .map(|path| {
            let result = load(path).and_then(|data| {
                tool(data).with_context(|| format!("analyzing {}", path.display()))
            });
            (path, result)
        })
        .collect();

    let mut out = open_output(&inputs.output)?;
    if let [(_, result)] = results.as_slice() {
        return match result {
            Ok(report) => write_json(&mut out, report, pretty).map(|()| true),
            Err(e) => Err(anyhow::anyhow!("{e:#}")),
        };
    }

    let mut ok = true;
    let entries: Vec<FileResult<T>> = results
        .into_iter()
        .map(|(path, result)| {
            let file = path.display().to_string();
            match result {
                Ok(report) => FileResult {
                    file,
                    report: Some(report),
                    error: None,
                },
                Err(e) => {
                    warn!(file = %file, "{e:#}");
                    ok = false;
                    FileResult {
                        file,
                        report: None,
                        error: Some(format!("{e:#}")),
                    }
                }
            }
        })
        .collect();
    write_json(&mut out, &entries, pretty)?;
    Ok(ok)
}

/// Write the produced file and print its manifest.
fn write_binary<M: Serialize>(output: &Path, result: BinaryOutput<M>, pretty: bool) -> Result<bool> {
    fs::write(output, &result.bytes).with_context(|| format!("writing {}", output.display()))?;
    info!(path = %output.display(), bytes = result.bytes.len(), "output written");
    write_json(&mut io::stdout().lock(), &result.manifest, pretty)?;
    Ok(true)
}

fn content_options(
    base: &ContentOptions,
    pages: Option<PageSelection>,
    max_ops: Option<usize>,
) -> ContentOptions {
    let mut options = base.clone();
    if pages.is_some() {
        options.pages = pages;
    }
    if let Some(max_ops) = max_ops {
        options.max_ops = max_ops;
    }
    options
}

fn run(cli: Cli) -> Result<bool> {
    let config = Config::load(cli.config.as_deref())?;
    let pretty = cli.pretty;

    match cli.command {
        Command::Inspect {
            inputs,
            include_objects,
            max_objects,
        } => {
            let mut options = config.analysis;
            options.include_objects |= include_objects;
            if let Some(max_objects) = max_objects {
                options.max_objects = max_objects;
            }
            run_reports(&inputs, pretty, |data| api::inspect(data, Some(options.clone())))
        }
        Command::Xref { inputs } => run_reports(&inputs, pretty, api::xref),
        Command::Ops { inputs, ops } => {
            let options = content_options(&config.content, ops.pages, ops.max_ops);
            run_reports(&inputs, pretty, |data| api::content_ops(data, Some(options.clone())))
        }
        Command::Orphans { inputs } => run_reports(&inputs, pretty, api::orphans),
        Command::Forensics { inputs } => run_reports(&inputs, pretty, api::forensics),
        Command::Annotations { inputs } => run_reports(&inputs, pretty, api::annotations),
        Command::Attachments { inputs } => run_reports(&inputs, pretty, api::attachments),
        Command::Fonts { inputs } => run_reports(&inputs, pretty, api::fonts),
        Command::Images { inputs, max_ops } => {
            let options = content_options(&config.content, None, max_ops);
            run_reports(&inputs, pretty, |data| api::images(data, Some(options.clone())))
        }
        Command::Signatures { inputs } => run_reports(&inputs, pretty, api::signatures),
        Command::Scan { inputs, max_ops } => {
            let options = content_options(&config.content, None, max_ops);
            run_reports(&inputs, pretty, |data| api::scan(data, Some(options.clone())))
        }
        Command::ExportAttachments { file, output } => {
            let result = api::export_attachments(load(&file)?)
                .with_context(|| format!("exporting attachments of {}", file.display()))?;
            write_binary(&output, result, pretty)
        }
        Command::ExportImages {
            file,
            output,
            skip_undecoded,
        } => {
            let mut options = config.export;
            if skip_undecoded {
                options.include_undecoded = false;
            }
            let result = api::export_images(load(&file)?, Some(options))
                .with_context(|| format!("exporting images of {}", file.display()))?;
            write_binary(&output, result, pretty)
        }
        Command::Split {
            file,
            pages,
            output,
        } => {
            let mut options = config.split;
            if pages.is_some() {
                options.pages = pages;
            }
            let result = api::split(load(&file)?, Some(options))
                .with_context(|| format!("splitting {}", file.display()))?;
            write_binary(&output, result, pretty)
        }
        Command::Merge { files, output } => {
            let inputs = files
                .par_iter()
                .map(|path| load(path))
                .collect::<Result<Vec<_>>>()?;
            let result = api::merge(inputs).context("merging inputs")?;
            write_binary(&output, result, pretty)
        }
        Command::Sanitize { file, output } => {
            let result = api::sanitize(load(&file)?)
                .with_context(|| format!("sanitizing {}", file.display()))?;
            write_binary(&output, result, pretty)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_page_selection_flag() {
        let cli = Cli::try_parse_from([
            "pdfprobe", "split", "in.pdf", "--pages", "3,1-2", "-o", "out.pdf",
        ])
        .unwrap();
        let Command::Split { pages, .. } = cli.command else {
            panic!("expected split");
        };
        assert_eq!(pages.unwrap().resolve(3).unwrap(), vec![3, 1, 2]);

        assert!(Cli::try_parse_from(["pdfprobe", "split", "in.pdf", "--pages", "0", "-o", "x"]).is_err());
        assert!(Cli::try_parse_from(["pdfprobe", "merge", "only.pdf", "-o", "x"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let base = ContentOptions {
            max_ops: 50,
            ..Default::default()
        };
        let options = content_options(&base, None, Some(7));
        assert_eq!(options.max_ops, 7);
        assert!(options.pages.is_none());
        assert_eq!(content_options(&base, None, None).max_ops, 50);
    }
}

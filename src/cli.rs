//! Command line: template in → C header / C source / diagnostics out.
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use clap::error::ErrorKind;

use crate::config::{DEFAULT_PREFIX, GeneratorConfig, Prefix, TraceFlags};
use crate::error::Error;
use crate::trace::Trace;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate configuration type declarations and serialization schema from a template plist
#[derive(Parser, Debug)]
#[command(name = "plist2config", version, disable_help_flag = true)]
pub struct CommandLineInterface {
    /// print help
    #[arg(long, action = clap::ArgAction::Help)]
    #[allow(dead_code)]
    help: Option<bool>,

    /// generated .c file ('-' for stdout, discarded if omitted)
    #[arg(short = 'c', value_name = "C_FILE")]
    c_file: Option<PathBuf>,

    /// generated .h file ('-' for stdout, discarded if omitted)
    #[arg(short = 'h', value_name = "H_FILE")]
    h_file: Option<PathBuf>,

    /// diagnostic output file (stdout if omitted)
    #[arg(short = 'o', value_name = "OUT_FILE")]
    out_file: Option<PathBuf>,

    /// diagnostic channels: 1 markup echo, 2 document schema, 4 config schema, 8 debug
    #[arg(short = 'f', value_name = "PRINT_FLAGS", default_value = "1", value_parser = TraceFlags::parse)]
    flags: TraceFlags,

    /// identifier prefix for generated names and exported routines
    #[arg(short = 'p', value_name = "PREFIX", default_value = DEFAULT_PREFIX, value_parser = parse_prefix)]
    prefix: Prefix,

    /// also dump the inferred schema tree as JSON ('-' for stdout)
    #[arg(long, value_name = "JSON_FILE")]
    schema_json: Option<PathBuf>,

    /// template plist
    input: PathBuf,
}

/// Where an omitted destination goes.
#[derive(Debug, Clone, Copy)]
enum Fallback {
    Stdout,
    Discard,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(std::env::args_os())
    }

    /// Parse arguments; `--help` and `--version` print and exit here.
    pub fn load_from<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Self::try_parse_from(args) {
            Ok(cli) => Ok(cli),
            Err(error) if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                error.exit()
            }
            Err(error) => {
                let message = error.to_string();
                let message = message.trim_end().trim_start_matches("error: ").to_string();
                Err(Error::Usage(message).into())
            }
        }
    }

    pub fn trace_flags(&self) -> TraceFlags {
        self.flags
    }

    pub fn run(&self) -> anyhow::Result<()> {
        // destinations are opened up front so a bad path fails before any work
        let mut c_out = open_destination(self.c_file.as_deref(), Fallback::Discard)?;
        let mut h_out = open_destination(self.h_file.as_deref(), Fallback::Discard)?;
        let diagnostics = open_destination(self.out_file.as_deref(), Fallback::Stdout)?;
        let mut json_out = self
            .schema_json
            .as_deref()
            .map(|path| open_destination(Some(path), Fallback::Discard))
            .transpose()?;

        tracing::debug!(input = %self.input.display(), "reading template");
        let doc = crate::document::read_document(&self.input)
            .with_context(|| format!("reading {}", self.input.display()))?;

        let config = GeneratorConfig { prefix: self.prefix.clone(), trace: self.flags };
        let mut trace = Trace::new(config.trace, diagnostics);
        let lowered = crate::lower::lower_document(&doc, &config, &mut trace)?;
        tracing::debug!(declared = lowered.declarations.identifiers.len(), "template lowered");

        let input_name = self
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.display().to_string());

        let header = crate::assemble::header(&lowered.declarations, &config.prefix, &input_name);
        write_all(&mut h_out, &header, self.h_file.as_deref())?;
        let source = crate::assemble::source(&lowered.declarations, &config.prefix, &input_name);
        write_all(&mut c_out, &source, self.c_file.as_deref())?;

        if let Some(out) = json_out.as_mut() {
            let json = serde_json::to_string_pretty(&lowered.root)?;
            write_all(out, &format!("{json}\n"), self.schema_json.as_deref())?;
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn parse_prefix(raw: &str) -> Result<Prefix, String> {
    Prefix::new(raw)
}

fn open_destination(path: Option<&Path>, fallback: Fallback) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(path) if path == Path::new("-") => Ok(Box::new(std::io::stdout())),
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("opening {} for writing", path.display()))?;
            tracing::debug!(path = %path.display(), "opened output");
            Ok(Box::new(std::io::BufWriter::new(file)))
        }
        None => match fallback {
            Fallback::Stdout => Ok(Box::new(std::io::stdout())),
            Fallback::Discard => Ok(Box::new(std::io::sink())),
        },
    }
}

fn write_all(out: &mut Box<dyn Write>, text: &str, path: Option<&Path>) -> anyhow::Result<()> {
    let describe = || match path {
        Some(p) => format!("writing {}", p.display()),
        None => "writing output".to_string(),
    };
    out.write_all(text.as_bytes()).with_context(describe)?;
    out.flush().with_context(describe)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

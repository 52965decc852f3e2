use std::error::Error;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use clap::Parser;
use log::debug;
use pooljson::{wire, ParseOptions, WriteOptions};

#[derive(Parser, Debug)]
#[command(name = "pooljson", version, about = "JSON reformatter, validator and wire converter")]
struct Args {
    /// Input file path. Omit or use '-' to read from stdin.
    input: Option<String>,

    /// Output file path (prints to stdout if omitted).
    #[arg(short, long, value_name = "file")]
    output: Option<String>,

    /// Indentation size; 0 writes compact JSON.
    #[arg(long, value_name = "number", default_value_t = 0)]
    indent: usize,

    /// Only check that the input is well-formed JSON.
    #[arg(long, conflicts_with_all = ["to_wire", "from_wire"])]
    validate: bool,

    /// Convert JSON to a binary wire frame.
    #[arg(long = "to-wire", conflicts_with = "from_wire")]
    to_wire: bool,

    /// Convert a binary wire frame to JSON.
    #[arg(long = "from-wire")]
    from_wire: bool,

    /// Accept // and /* */ comments in JSON input.
    #[arg(long)]
    comments: bool,

    /// Maximum nesting depth of JSON input.
    #[arg(long = "max-depth", value_name = "number")]
    max_depth: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Format,
    Validate,
    ToWire,
    FromWire,
}

#[derive(Debug)]
enum InputSource {
    Stdin,
    File(String),
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("ERROR  {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let (input, source) = read_input(args.input.as_deref())?;
    let mode = resolve_mode(&args);
    debug!("{mode:?} of {} bytes from {source:?}", input.len());

    let mut options = ParseOptions::new().with_comments(args.comments);
    if let Some(max_depth) = args.max_depth {
        options = options.with_max_depth(max_depth);
    }
    let output = args.output.as_deref();

    match mode {
        Mode::Validate => {
            pooljson::validate_with_options(&input, &options)?;
            write_output(output, b"valid\n")
        }
        Mode::Format => {
            let doc = pooljson::parse_slice_with_options(&input, &options)?;
            let write = WriteOptions::new().with_indent(args.indent).with_trailing_newline(true);
            with_output_writer(output, |writer| {
                pooljson::to_writer(doc.root(), &write, writer).map_err(|err| err.into())
            })
        }
        Mode::ToWire => {
            let doc = pooljson::parse_slice_with_options(&input, &options)?;
            with_output_writer(output, |writer| {
                wire::write_to(doc.root(), writer).map_err(|err| err.into())
            })
        }
        Mode::FromWire => {
            let mut json = wire::to_json(&input, args.indent)?;
            json.push('\n');
            write_output(output, json.as_bytes())
        }
    }
}

fn resolve_mode(args: &Args) -> Mode {
    if args.validate {
        Mode::Validate
    } else if args.to_wire {
        Mode::ToWire
    } else if args.from_wire {
        Mode::FromWire
    } else {
        Mode::Format
    }
}

fn read_input(input: Option<&str>) -> Result<(Vec<u8>, InputSource), Box<dyn Error>> {
    match input {
        None | Some("-") => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok((buf, InputSource::Stdin))
        }
        Some(path) => {
            if !Path::new(path).is_file() {
                return Err(format!("no such file: {path}").into());
            }
            let buf = fs::read(path)?;
            Ok((buf, InputSource::File(path.to_string())))
        }
    }
}

fn with_output_writer<F>(path: Option<&str>, f: F) -> Result<(), Box<dyn Error>>
where
    F: FnOnce(&mut dyn Write) -> Result<(), Box<dyn Error>>,
{
    match path {
        Some(path) if path != "-" => {
            let mut file = fs::File::create(path)?;
            f(&mut file)
        }
        _ => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            f(&mut handle)
        }
    }
}

fn write_output(path: Option<&str>, data: &[u8]) -> Result<(), Box<dyn Error>> {
    with_output_writer(path, |writer| {
        writer.write_all(data)?;
        Ok(())
    })
}

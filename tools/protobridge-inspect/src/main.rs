// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! protobridge-inspect - protobuf payload inspector
//!
//! Dumps raw field trees without a schema, decodes surrogate payloads
//! (Guid, Decimal, DateTime, TimeSpan) and shows varint/zigzag encodings.

mod tree;

use clap::{Parser, Subcommand};
use colored::*;
use protobridge::core::ser::varint::{encode_varint, zigzag_encode64};
use protobridge::{CompatibilityLevel, ModelOptions, TypeModel};
use std::io::{self, Read};
use std::path::PathBuf;
use tree::{decode_tree, varint_views, Field, Payload};

/// Protobuf payload inspector
#[derive(Parser, Debug)]
#[command(name = "protobridge-inspect")]
#[command(version = "0.1.0")]
#[command(about = "Inspect protobuf payloads")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Treat input as hex text instead of raw bytes
    #[arg(short = 'x', long, global = true)]
    hex: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the field tree of a payload without a schema
    Raw {
        /// Input file (stdin when omitted)
        input: Option<PathBuf>,

        /// Deepest nested message to expand
        #[arg(long, default_value = "32")]
        max_depth: usize,
    },
    /// Decode a payload as a built-in type (e.g. System.Decimal)
    Decode {
        /// Type name
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Input file (stdin when omitted)
        input: Option<PathBuf>,

        /// Compatibility level: 200, 240, 300
        #[arg(short, long, default_value = "200")]
        level: Level,

        /// JSON file with model options (overrides --level)
        #[arg(long)]
        options: Option<PathBuf>,
    },
    /// Show the varint and zigzag encodings of a number
    Varint {
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
}

#[derive(Clone, Debug)]
struct Level(CompatibilityLevel);

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "200" => Ok(Level(CompatibilityLevel::Level200)),
            "240" => Ok(Level(CompatibilityLevel::Level240)),
            "300" => Ok(Level(CompatibilityLevel::Level300)),
            _ => Err(format!("Unknown compatibility level: {}", s)),
        }
    }
}

fn main() {
    // Initialize logger for RUST_LOG-based debug output
    env_logger::init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    match &args.command {
        Command::Raw { input, max_depth } => {
            let bytes = load_input(input.as_ref(), args.hex)?;
            log::debug!("decoding {} bytes", bytes.len());
            let fields = decode_tree(&bytes, *max_depth)?;
            print_fields(&fields, 0);
            Ok(())
        }
        Command::Decode {
            type_name,
            input,
            level,
            options,
        } => {
            let options = match options {
                Some(path) => serde_json::from_str::<ModelOptions>(&std::fs::read_to_string(path)?)?,
                None => ModelOptions::builder().compatibility_level(level.0).build(),
            };
            let bytes = load_input(input.as_ref(), args.hex)?;
            let model = TypeModel::with_options(options);
            let value = model.deserialize(type_name, &bytes)?;
            println!("{} {}", type_name.cyan().bold(), format!("({} bytes)", bytes.len()).dimmed());
            println!("{:#?}", value);
            Ok(())
        }
        Command::Varint { value } => {
            print_varint(*value);
            Ok(())
        }
    }
}

fn load_input(path: Option<&PathBuf>, as_hex: bool) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let raw = match path {
        Some(path) => std::fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };
    if !as_hex {
        return Ok(raw);
    }
    let text = String::from_utf8(raw)?;
    let digits: String = text.split_whitespace().collect();
    Ok(hex::decode(digits)?)
}

fn print_fields(fields: &[Field], indent: usize) {
    let pad = "  ".repeat(indent);
    for field in fields {
        let label = format!("{pad}{}", field.number.to_string().yellow().bold());
        let at = format!("@{}", field.offset).dimmed();
        match &field.payload {
            Payload::Varint(v) => {
                let (signed, zigzag) = varint_views(*v);
                println!("{label} {} {at} {v} (i64 {signed}, zigzag {zigzag})", "varint".green());
            }
            Payload::Fixed64(v) => {
                println!("{label} {} {at} {v:#018x} (f64 {})", "fixed64".green(), f64::from_bits(*v));
            }
            Payload::Fixed32(v) => {
                println!("{label} {} {at} {v:#010x} (f32 {})", "fixed32".green(), f32::from_bits(*v));
            }
            Payload::Text(s) => println!("{label} {} {at} {:?}", "string".green(), s),
            Payload::Bytes(b) => println!("{label} {} {at} [{}] {}", "bytes".green(), b.len(), hex::encode(b)),
            Payload::Message(inner) => {
                println!("{label} {} {at} {{", "message".blue());
                print_fields(inner, indent + 1);
                println!("{pad}}}");
            }
            Payload::Group(inner) => {
                println!("{label} {} {at} {{", "group".blue());
                print_fields(inner, indent + 1);
                println!("{pad}}}");
            }
        }
    }
}

fn print_varint(value: i64) {
    let mut plain = Vec::new();
    encode_varint(value as u64, &mut plain);
    let mut zigzag = Vec::new();
    encode_varint(zigzag_encode64(value), &mut zigzag);
    println!("{:<8} {}", "value".bold(), value);
    println!("{:<8} {} ({} bytes)", "varint".green(), hex::encode(&plain), plain.len());
    println!("{:<8} {} ({} bytes)", "zigzag".green(), hex::encode(&zigzag), zigzag.len());
}

//! tensortap-dump: inspect saved capture and session files
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tensortap_core::{CaptureReader, Container, TensorRecord};

#[derive(Debug, Parser)]
#[command(name = "tensortap-dump", version, about = "Inspect tensortap capture files")]
struct Cli {
    /// Capture (.tcap) or session (.tses) file to inspect
    input: PathBuf,
    /// Dump full element data after each record header
    #[arg(long)]
    values: bool,
    /// Emit record metadata as JSON instead of the plain listing
    #[arg(long, conflicts_with = "values")]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let file = File::open(&cli.input)
        .with_context(|| format!("cannot open {}", cli.input.display()))?;
    let mut reader = CaptureReader::new(BufReader::new(file));
    let container = reader
        .read_any()
        .with_context(|| format!("cannot parse {}", cli.input.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.json {
        return print_json(&mut out, &container);
    }

    match container {
        Container::Capture(records) => {
            writeln!(out, "{} captured tensor(s)", records.len())?;
            for (idx, rec) in records.iter().enumerate() {
                print_record(&mut out, idx, rec, cli.values)?;
            }
        }
        Container::Sessions(sessions) => {
            writeln!(out, "{} session(s)", sessions.len())?;
            for (idx, session) in sessions.iter().enumerate() {
                writeln!(out, "{}-{}", idx, session.label)?;
                for (rec_idx, rec) in session.records.iter().enumerate() {
                    write!(out, "  ")?;
                    print_record(&mut out, rec_idx, rec, cli.values)?;
                }
            }
        }
    }
    Ok(())
}

fn print_record<W: Write>(out: &mut W, idx: usize, rec: &TensorRecord, values: bool) -> Result<()> {
    writeln!(
        out,
        "[{}] {:<30} shape:{} stride:{:?}  ({} elements)",
        idx,
        rec.name,
        rec.shape_string(),
        rec.nb,
        rec.element_count()
    )?;
    if values {
        rec.write_values(out)?;
    }
    Ok(())
}

fn print_json<W: Write>(out: &mut W, container: &Container) -> Result<()> {
    fn meta(rec: &TensorRecord) -> serde_json::Value {
        serde_json::json!({
            "name": rec.name,
            "shape": rec.ne,
            "stride": rec.nb,
            "elements": rec.element_count(),
            "contiguous": rec.is_contiguous(),
        })
    }

    let value = match container {
        Container::Capture(records) => serde_json::json!({
            "kind": "capture",
            "tensors": records.iter().map(meta).collect::<Vec<_>>(),
        }),
        Container::Sessions(sessions) => serde_json::json!({
            "kind": "sessions",
            "sessions": sessions
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "label": s.label,
                        "tensors": s.records.iter().map(meta).collect::<Vec<_>>(),
                    })
                })
                .collect::<Vec<_>>(),
        }),
    };

    writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

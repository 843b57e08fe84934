use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde_json::Value as Json;

use sequencer_core::Ready;

fn max_request_bytes() -> usize {
    std::env::var("SEQUENCER_MAX_REQUEST_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(4 * 1024 * 1024) // 4 MiB default
}

/// Read a JSON or YAML document from `path`, or stdin when `None`.
pub fn read_document(path: Option<&Path>) -> Result<Json> {
    let max = max_request_bytes();
    let text = match path {
        Some(p) => {
            let f = std::fs::File::open(p).with_context(|| format!("opening {}", p.display()))?;
            read_limited(f, max).with_context(|| format!("reading {}", p.display()))?
        }
        None => read_limited(std::io::stdin().lock(), max).context("reading stdin")?,
    };
    parse_document(&text)
}

/// Read at most `max` bytes; anything longer is rejected without buffering it.
fn read_limited(r: impl Read, max: usize) -> Result<String> {
    let mut s = String::new();
    r.take(max as u64 + 1).read_to_string(&mut s)?;
    if s.len() > max {
        return Err(anyhow!("request too large (>{} bytes)", max));
    }
    Ok(s)
}

pub fn parse_document(text: &str) -> Result<Json> {
    if text.len() > max_request_bytes() {
        return Err(anyhow!("request too large (>{} bytes)", max_request_bytes()));
    }
    // YAML is a superset of JSON
    let val: serde_yaml::Value = serde_yaml::from_str(text).context("parsing YAML")?;
    serde_json::to_value(val).context("converting YAML to JSON")
}

/// A request's `input`, or the document itself when it is a bare Input.
pub fn input_of(doc: &Json) -> &Json {
    doc.get("input").unwrap_or(doc)
}

pub fn ready_label(r: Ready) -> &'static str {
    match r {
        Ready::True => "True",
        Ready::False => "False",
        Ready::Unspecified => "-",
    }
}

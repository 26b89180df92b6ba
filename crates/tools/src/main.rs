use std::env;
use std::fs;
use std::io::{self, BufWriter, Read, Write};

use tools::{Script, replay};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        return Err(usage());
    }

    let json = if args[1] == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("read stdin: {e}"))?;
        buf
    } else {
        fs::read_to_string(&args[1]).map_err(|e| format!("read {:?}: {e}", args[1]))?
    };

    let script = Script::from_json(&json)?;
    let records = replay(&script)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for record in &records {
        let line = serde_json::to_string(record).map_err(|e| format!("encode record: {e}"))?;
        writeln!(out, "{line}").map_err(|e| format!("write stdout: {e}"))?;
    }
    out.flush().map_err(|e| format!("write stdout: {e}"))?;
    Ok(())
}

fn usage() -> String {
    let exe = env::args()
        .next()
        .unwrap_or_else(|| "locomotion-replay".to_string());
    format!(
        "Usage:\n  {exe} <script.json | ->\n\nScript:\n  {{\"mode\": \"walk|drive|flight\", \"config\": {{...}}, \"start\": {{\"lon\", \"lat\", \"height\", \"yaw_deg\", \"pitch_deg\"}},\n   \"terrain\": {{\"kind\": \"flat\", \"height\": H}} | {{\"kind\": \"sine\", \"base\", \"amplitude\", \"wavelength_m\"}},\n   \"frames\": [{{\"dt\": seconds, \"events\": [...]}}]}}\n\nPrints one JSON object per frame. Set RUST_LOG=debug for controller telemetry.\n"
    )
}

//! `tree-mirror-replay`: mirror a tagged JSON document and print its wire form.
//!
//! Usage:
//!   tree-mirror-replay ['<options-json>'] < document.json
//!
//! The document is read from stdin. Options default to `{"type_key": "_type",
//! "routing": "crossed"}`. Set `RUST_LOG=tree_mirror=trace` to watch the
//! notifications.

use std::io::{self, Read, Write};

use tracing_subscriber::EnvFilter;
use tree_mirror::replay::replay_document;
use tree_mirror::MirrorOptions;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let options = match args.get(1) {
        Some(raw) => match MirrorOptions::from_json(raw) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        None => MirrorOptions::default(),
    };

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    match replay_document(buf.trim(), &options) {
        Ok(result) => {
            let mut stdout = io::stdout();
            if let Err(e) = writeln!(stdout, "{result}") {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

// lexguard-detect: Detect restricted terms in text.
//
// Checks each TEXT argument, or each stdin line when none are given.
// Plain output:
//   M: text    base=amk path=known_variation token=@mk
//   N: text    (no match)
//
// Usage:
//   lexguard-detect [--lexicon PATH] [--config PATH] [--json] [TEXT...]
//
// Options:
//   -l, --lexicon PATH   JSON seed file (default: $LEXGUARD_LEXICON, ./lexicon.json)
//   -c, --config PATH    TOML engine options (default: $LEXGUARD_CONFIG)
//   --json               One JSON detection per line
//   -s, --stats          Print engine statistics as JSON when done
//   -h, --help           Print help

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use lexguard_core::detection::Detection;
use lexguard_tr::DetectionEngine;

fn print_help() {
    println!("lexguard-detect: Detect restricted terms in text.");
    println!();
    println!("Usage: lexguard-detect [--lexicon PATH] [--config PATH] [--json] [TEXT...]");
    println!();
    println!("Checks each TEXT argument, or each stdin line when none are given. Prints:");
    println!("  M: text    base=WORD path=PATH token=TOKEN   (one per matched token)");
    println!("  N: text                                        (no match)");
    println!();
    println!("Options:");
    println!("  -l, --lexicon PATH   JSON seed file (default: $LEXGUARD_LEXICON, ./lexicon.json)");
    println!("  -c, --config PATH    TOML engine options (default: $LEXGUARD_CONFIG)");
    println!("  --json               One JSON detection per line");
    println!("  -s, --stats          Print engine statistics as JSON when done");
    println!("  -h, --help           Print this help");
}

fn write_detection(out: &mut impl Write, text: &str, detection: &Detection, json: bool) {
    if json {
        match serde_json::to_string(detection) {
            Ok(s) => {
                let _ = writeln!(out, "{s}");
            }
            Err(e) => eprintln!("error encoding result: {e}"),
        }
        return;
    }
    if !detection.is_match() {
        let _ = writeln!(out, "N: {text}");
        return;
    }
    for m in detection.matched_tokens() {
        let _ = writeln!(
            out,
            "M: {text}\tbase={} path={} token={}",
            m.base_word, m.path, m.original
        );
    }
}

#[tokio::main]
async fn main() {
    lexguard_cli::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if lexguard_cli::wants_help(&args) {
        print_help();
        return;
    }

    let (lexicon_path, args) = lexguard_cli::parse_flag_value(&args, "--lexicon", Some("-l"))
        .unwrap_or_else(|e| lexguard_cli::fatal(&e));
    let (config_path, args) = lexguard_cli::parse_flag_value(&args, "--config", Some("-c"))
        .unwrap_or_else(|e| lexguard_cli::fatal(&e));

    let json = args.iter().any(|a| a == "--json");
    let show_stats = args.iter().any(|a| a == "-s" || a == "--stats");
    let texts: Vec<&String> = args.iter().filter(|a| !a.starts_with('-')).collect();

    let options =
        lexguard_cli::load_options(config_path.as_deref()).unwrap_or_else(|e| lexguard_cli::fatal(&e));
    let lexicon = lexguard_cli::load_lexicon(lexicon_path.as_deref(), &options)
        .unwrap_or_else(|e| lexguard_cli::fatal(&e));
    let engine = DetectionEngine::builder(Arc::new(lexicon))
        .options(options)
        .build()
        .unwrap_or_else(|e| lexguard_cli::fatal(&e.to_string()));

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    if texts.is_empty() {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("error reading stdin: {e}");
                    break;
                }
            };
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            let detection = engine.detect(text).await;
            write_detection(&mut out, text, &detection, json);
        }
    } else {
        for text in texts {
            let detection = engine.detect(text).await;
            write_detection(&mut out, text, &detection, json);
        }
    }

    engine.wait_for_enrichment().await;
    if show_stats {
        match serde_json::to_string_pretty(&engine.stats()) {
            Ok(s) => {
                let _ = writeln!(out, "{s}");
            }
            Err(e) => eprintln!("error encoding stats: {e}"),
        }
    }
}

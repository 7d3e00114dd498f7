// lexguard-variants: Print generated spelling variations of words.
//
// Output, one candidate per line:
//   word<TAB>origin<TAB>candidate
//
// Usage:
//   lexguard-variants [--config PATH] [-n N] WORD...
//
// Words are read from stdin (one per line) when none are given.

use std::io::{self, BufRead, Write};

use lexguard_tr::normalizer::normalize_word;
use lexguard_tr::variation::VariationGenerator;

fn print_help() {
    println!("lexguard-variants: Print generated spelling variations of words.");
    println!();
    println!("Usage: lexguard-variants [--config PATH] [-n N] WORD...");
    println!();
    println!("Reads words from stdin (one per line) when none are given. Prints:");
    println!("  word<TAB>origin<TAB>candidate");
    println!();
    println!("Options:");
    println!("  -c, --config PATH   TOML engine options (default: $LEXGUARD_CONFIG)");
    println!("  -n, --limit N       Print at most N candidates per word");
    println!("  -h, --help          Print this help");
}

fn write_variations(out: &mut impl Write, generator: &VariationGenerator, word: &str, limit: usize) {
    let Some(word) = normalize_word(word) else {
        eprintln!("skipping '{word}': nothing left after normalization");
        return;
    };
    for candidate in generator.generate(&word).into_iter().take(limit) {
        let _ = writeln!(out, "{word}\t{}\t{}", candidate.origin.as_str(), candidate.text);
    }
}

fn main() {
    lexguard_cli::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if lexguard_cli::wants_help(&args) {
        print_help();
        return;
    }

    let (config_path, args) = lexguard_cli::parse_flag_value(&args, "--config", Some("-c"))
        .unwrap_or_else(|e| lexguard_cli::fatal(&e));
    let (limit, words) = lexguard_cli::parse_flag_value(&args, "--limit", Some("-n"))
        .unwrap_or_else(|e| lexguard_cli::fatal(&e));
    let limit = match limit {
        Some(n) => n
            .parse::<usize>()
            .unwrap_or_else(|_| lexguard_cli::fatal(&format!("invalid limit: {n}"))),
        None => usize::MAX,
    };

    let options =
        lexguard_cli::load_options(config_path.as_deref()).unwrap_or_else(|e| lexguard_cli::fatal(&e));
    let generator = VariationGenerator::new(options.variation, None);

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    if words.is_empty() {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("error reading stdin: {e}");
                    break;
                }
            };
            let word = line.trim();
            if word.is_empty() {
                continue;
            }
            write_variations(&mut out, &generator, word, limit);
        }
    } else {
        for word in &words {
            write_variations(&mut out, &generator, word, limit);
        }
    }
}

use clap::Parser;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use syllabus_rag_context::text::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, WordWindowChunker};
use syllabus_rag_context::units::{DEFAULT_UNIT_PATTERNS, UnitDetector};

/// A CLI tool to split a syllabus into labelled word windows, printed as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Number of words per window.
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Number of words shared by consecutive windows.
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    overlap: usize,

    /// Comma-separated list of unit heading regexes (group 1 = unit number).
    /// Defaults to unit/chapter/module headings if not provided.
    #[arg(short, long, value_delimiter = ',')]
    unit_patterns: Option<Vec<String>>,
}

#[derive(Serialize)]
struct LabelledWindow<'a> {
    chunk_id: usize,
    unit: String,
    start_word: usize,
    end_word: usize,
    text: &'a str,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let file_content = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let chunker = WordWindowChunker::new(args.chunk_size, args.overlap)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let detector = match args.unit_patterns {
        Some(patterns) => UnitDetector::new(&patterns),
        None => UnitDetector::new(DEFAULT_UNIT_PATTERNS),
    }
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let windows = chunker.chunk(&file_content);
    let labelled: Vec<LabelledWindow> = windows
        .iter()
        .enumerate()
        .map(|(chunk_id, window)| LabelledWindow {
            chunk_id,
            unit: detector.detect(&window.text),
            start_word: window.start_word,
            end_word: window.end_word,
            text: &window.text,
        })
        .collect();

    let json_output = serde_json::to_string_pretty(&labelled)?;
    println!("{}", json_output);

    Ok(())
}

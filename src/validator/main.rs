//! Standalone validator for quiz answer files.
//!
//! Checks that every entry has a title and an answer and that no title
//! appears twice (titles are matched case-insensitively at runtime).

use std::process::ExitCode;

use clap::Parser;

use cats_tapper::config::AnswerBook;

/// Quiz answer file validator.
#[derive(Parser, Debug)]
#[command(name = "validate_answers")]
#[command(about = "Validates the quiz answers file used by the tapper")]
#[command(version)]
struct Args {
    /// Path to the JSON answers file to validate.
    #[arg(short, long, default_value = "youtube_answers.json")]
    file: String,

    /// Generate an example answers file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Print every entry.
    #[arg(short, long)]
    verbose: bool,

    /// Look up a title the way the tapper does and print the answer.
    #[arg(long)]
    lookup: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path);
    }

    validate_file(&args.file, args.verbose, args.lookup.as_deref())
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = AnswerBook::example();

    match example.save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example answers written to: {output_path}");
            println!("\nThe file contains {} example answers.", example.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate_file(path: &str, verbose: bool, lookup: Option<&str>) -> ExitCode {
    println!("Validating: {path}");

    let book = match AnswerBook::load_from_file(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("✗ Failed to load answers: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("Found {} answers\n", book.len());

    if verbose {
        for (i, entry) in book.youtube_answers.iter().enumerate() {
            println!("  [{i}] \"{}\" → {}", entry.title, entry.answer);
        }
        println!();
    }

    if let Some(title) = lookup {
        match book.lookup(title) {
            Some(answer) => println!("Lookup \"{title}\": {answer}\n"),
            None => println!("Lookup \"{title}\": no answer, the task would be skipped\n"),
        }
    }

    let errors = book.validate_all();
    if errors.is_empty() {
        println!("✓ All answers are valid");
        ExitCode::SUCCESS
    } else {
        for e in &errors {
            eprintln!("✗ {e}");
        }
        eprintln!("\n{} problem(s) found", errors.len());
        ExitCode::FAILURE
    }
}

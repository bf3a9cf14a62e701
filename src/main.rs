use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod detector;
mod flags;
mod homework;
mod paste;
mod settings;
mod submissions;

use flags::PasteDecision;
use paste::PasteOutcome;
use settings::{
    default_base_path, ensure_base_folders, load_or_init_settings, save_settings, Settings,
};
use submissions::{append_flag, grade, load_submission, student_key, submit};

#[derive(Parser, Debug)]
#[command(
    name = "classroom-guard",
    version,
    about = "Classroom homework shell with paste tracking and AI-text flags (local-first, offline)"
)]
struct CliArgs {
    /// Override data base path (defaults to ./data next to the exe)
    #[arg(long, global = true)]
    base_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a text file (or stdin) for AI-generated content
    Analyze {
        file: Option<PathBuf>,
        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add text (file or stdin) to the current student's draft
    Paste {
        #[arg(long)]
        assignment: String,
        file: Option<PathBuf>,
        /// Confirm the paste with this source instead of asking. Text read
        /// from stdin cannot be confirmed interactively.
        #[arg(long)]
        source: Option<String>,
    },
    /// Hand in the current student's draft
    Submit {
        #[arg(long)]
        assignment: String,
    },
    /// Teacher overview of submissions, or flags of one submission
    Review {
        #[arg(long)]
        assignment: Option<String>,
        #[arg(long, requires = "assignment")]
        student: Option<String>,
    },
    /// Grade a submitted piece of work
    Grade {
        #[arg(long)]
        assignment: String,
        #[arg(long)]
        student: String,
        #[arg(long)]
        score: i32,
        #[arg(long, default_value_t = 100)]
        max: i32,
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Results grid: students x assignments
    Results,
    /// Set the current student profile
    Student {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        class: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let args = CliArgs::parse();
    let base_path = args.base_path.unwrap_or_else(default_base_path);

    if let Err(e) = run(args.command, &base_path) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn open_workspace(base_path: &Path) -> Result<Settings> {
    ensure_base_folders(base_path).with_context(|| {
        format!("failed to create base folders at {}", base_path.display())
    })?;
    let settings = load_or_init_settings(base_path).context("failed to load settings")?;
    info!(path = %base_path.display(), "using data path");
    Ok(settings)
}

fn run(command: Command, base_path: &Path) -> Result<()> {
    match command {
        // Pure scoring needs no data folder.
        Command::Analyze { file, json } => analyze_command(file.as_deref(), json),
        Command::Paste {
            assignment,
            file,
            source,
        } => {
            let settings = open_workspace(base_path)?;
            paste_command(&settings, base_path, &assignment, file.as_deref(), source)
        }
        Command::Submit { assignment } => {
            let settings = open_workspace(base_path)?;
            let sub = submit(base_path, &assignment, &student_key(&settings))?;
            println!(
                "Submitted {} ({} flag(s) recorded).",
                sub.assignment_id,
                sub.flags.len()
            );
            Ok(())
        }
        Command::Review {
            assignment,
            student,
        } => {
            open_workspace(base_path)?;
            match (assignment.as_deref(), student.as_deref()) {
                (Some(a), Some(s)) => homework::print_flag_list(&load_submission(base_path, a, s)?),
                (a, _) => homework::show_review_dashboard(base_path, a),
            }
            Ok(())
        }
        Command::Grade {
            assignment,
            student,
            score,
            max,
            feedback,
        } => {
            open_workspace(base_path)?;
            let sub = grade(base_path, &assignment, &student, score, max, feedback)?;
            println!(
                "Graded {} for {}: {}/{}",
                sub.assignment_id, sub.student_name, score, max
            );
            Ok(())
        }
        Command::Results => {
            open_workspace(base_path)?;
            homework::show_results(base_path);
            Ok(())
        }
        Command::Student { id, name, class } => {
            let mut settings = open_workspace(base_path)?;
            settings.student.student_id = id;
            settings.student.student_name = name;
            if let Some(class_id) = class {
                settings.student.class_id = class_id;
            }
            save_settings(&settings, base_path).context("could not save settings")?;
            println!(
                "Current student: {} ({})",
                settings.student.student_name, settings.student.student_id
            );
            Ok(())
        }
    }
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("could not read stdin")?;
            Ok(buf)
        }
    }
}

fn analyze_command(file: Option<&Path>, json: bool) -> Result<()> {
    let text = read_input(file)?;
    let verdict = detector::analyze(&text);

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    println!(
        "Likely AI: {} (confidence {:.0}%)",
        if verdict.is_likely_ai { "yes" } else { "no" },
        verdict.confidence * 100.0
    );
    for reason in &verdict.reasons {
        println!("  - {reason}");
    }
    Ok(())
}

fn paste_command(
    settings: &Settings,
    base_path: &Path,
    assignment_id: &str,
    file: Option<&Path>,
    source: Option<String>,
) -> Result<()> {
    let text = read_input(file)?;
    let from_stdin = file.is_none();

    let outcome = paste::paste_into_draft(
        base_path,
        settings,
        assignment_id,
        &text,
        source,
        |check| {
            if from_stdin {
                // stdin is already drained, nobody is left to answer
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "large paste read from stdin; pass --source <SOURCE> or give a file",
                ));
            }
            ask_paste_decision(check)
        },
        |draft, flag| append_flag(base_path, &draft.assignment_id, &draft.student_id, flag),
    )?;

    match outcome {
        PasteOutcome::NothingAdded => println!("Nothing new to add."),
        PasteOutcome::Cancelled => println!("Paste cancelled; draft unchanged."),
        PasteOutcome::Saved {
            path, flags_failed, ..
        } => {
            println!("Draft saved to {}", path.display());
            if flags_failed > 0 {
                println!("{flags_failed} detection flag(s) could not be recorded.");
            }
        }
    }
    Ok(())
}

fn ask_paste_decision(check: &paste::PasteCheck) -> io::Result<PasteDecision> {
    let warning = check.warning();
    println!(
        "\nYou are adding a large block of text ({} words).",
        warning.word_count
    );
    println!("  \"{}\"", flags::snippet(&warning.pasted_text).replace('\n', " "));
    if check.verdict.is_likely_ai {
        println!(
            "It looks AI-generated ({:.0}%):",
            check.verdict.confidence * 100.0
        );
        for reason in &check.verdict.reasons {
            println!("  - {reason}");
        }
    }
    println!("  1) keep it and name the source");
    println!("  2) keep it without a source");
    println!("  3) cancel");

    loop {
        match prompt("Choice", "3")?.as_str() {
            "1" => {
                let src = prompt("Source", "")?;
                return Ok(PasteDecision::ConfirmWithSource(src));
            }
            "2" => return Ok(PasteDecision::ConfirmWithoutSource),
            "3" => return Ok(PasteDecision::Cancel),
            _ => println!("Please answer 1, 2 or 3."),
        }
    }
}

fn prompt(field: &str, default_val: &str) -> io::Result<String> {
    print!("{} [{}]: ", field, default_val);
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        Ok(default_val.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

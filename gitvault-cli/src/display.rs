use colored::{ColoredString, Colorize};
use gitvault_core::{CommitInfo, DiffLineType, FileDiff, SyncResult};

pub fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

pub fn print_commit(commit: &CommitInfo, version: Option<usize>) {
    match version {
        Some(v) => println!(
            "{} {} {}",
            "commit".yellow().bold(),
            commit.hash.yellow(),
            format!("(v{})", v).cyan()
        ),
        None => println!("{} {}", "commit".yellow().bold(), commit.hash.yellow()),
    }
    println!("{}: {} <{}>", "Author".bold(), commit.author, commit.email);
    println!(
        "{}: {}",
        "Date".bold(),
        commit.date.format("%Y-%m-%d %H:%M:%S")
    );
    println!();
    for line in commit.message.lines() {
        println!("    {}", line);
    }
    println!();
}

pub fn print_diff(diff: &FileDiff) {
    if diff.binary {
        println!("  {}", "[Binary file]".dimmed());
        return;
    }

    for line in &diff.diff_lines {
        let (prefix, color): (&str, fn(&str) -> ColoredString) = match line.line_type {
            DiffLineType::Addition => ("+", |s| s.green()),
            DiffLineType::Deletion => ("-", |s| s.red()),
            DiffLineType::Context => (" ", |s| s.normal()),
        };
        print!("{}", color(&format!("{}{}", prefix, line.content)));
        if !line.content.ends_with('\n') {
            println!();
        }
    }
}

pub fn print_sync_result(result: &SyncResult) {
    if result.skipped_no_remote {
        println!("{}", "No remote configured, nothing to mirror".yellow());
        return;
    }

    let path = result
        .attempts
        .iter()
        .map(|state| format!("{:?}", state))
        .collect::<Vec<_>>()
        .join(" → ");

    if result.ok {
        println!("{} {}", "✓ Mirrored".green().bold(), path.dimmed());
    } else {
        println!(
            "{} {}",
            "⚠ Saved locally, not yet mirrored".yellow().bold(),
            path.dimmed()
        );
        if let Some(error) = &result.error {
            println!("  {}", error.dimmed());
        }
    }
}

use serde::Serialize;
use std::fmt::Display;
use std::io::{self, Write};

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// One item per line on a locked stdout, for output meant to be piped.
pub fn print_lines<I>(items: I) -> anyhow::Result<()>
where
    I: IntoIterator,
    I::Item: Display,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for item in items {
        writeln!(out, "{item}")?;
    }
    out.flush()?;
    Ok(())
}

/// `=== header ===` followed by the group's lines.
pub fn print_group<I>(header: &str, items: I) -> anyhow::Result<()>
where
    I: IntoIterator,
    I::Item: Display,
{
    println!("=== {header} ===");
    print_lines(items)
}

//! Interactive prompts and status lines

use crate::error::Result;
use colored::Colorize;
use dialoguer::{Confirm, Password, theme::ColorfulTheme};

/// Yes/no confirmation with a default answer
pub fn confirm(message: &str, default: bool) -> Result<bool> {
    let result = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(default)
        .interact()?;
    Ok(result)
}

/// Hidden input, e.g. the LDAP bind password
pub fn password(message: &str) -> Result<String> {
    let result = Password::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .interact()?;
    Ok(result)
}

pub fn section_header(title: &str) {
    println!();
    println!("{}", "─".repeat(60).dimmed());
    println!("{}", title.cyan().bold());
    println!("{}", "─".repeat(60).dimmed());
}

/// `  label: value` line, value dimmed when unset
pub fn show_value(label: &str, value: Option<&str>) {
    match value {
        Some(v) => println!("  {:<22} {}", format!("{}:", label), v),
        None => println!("  {:<22} {}", format!("{}:", label), "(not set)".dimmed()),
    }
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn info(message: &str) {
    println!("{} {}", "→".cyan(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "!".yellow().bold(), message);
}

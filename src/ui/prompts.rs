// UI prompts and user interaction module

use colored::Colorize;
use dialoguer::{Confirm, Input, Select};

use crate::error::Result;

/// Ask user for yes/no confirmation
pub fn confirm(message: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(message)
        .default(default)
        .interact()?)
}

/// Free-form answer; `q`/`quit` returns `None`
pub fn read_choice(prompt: &str) -> Result<Option<String>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    Ok(parse_choice(&input))
}

fn parse_choice(input: &str) -> Option<String> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
        None
    } else {
        Some(input.to_string())
    }
}

/// Text input with an optional pre-filled default
pub fn input_text(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
    if let Some(default) = default {
        input = input.default(default.to_string());
    }
    Ok(input.interact_text()?.trim().to_string())
}

/// Arrow-key menu, returns the index of the chosen item
pub fn select_index<T: ToString>(prompt: &str, items: &[T], default: usize) -> Result<usize> {
    let labels: Vec<String> = items.iter().map(|item| item.to_string()).collect();

    Ok(Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(default.min(items.len().saturating_sub(1)))
        .interact()?)
}

/// Display a warning message
pub fn warn(message: &str) {
    println!("{}", format!("⚠️  Warning: {}", message).yellow().bold());
}

/// Display an info message
pub fn info(message: &str) {
    println!("{}", message.cyan());
}

/// Display a success message
pub fn success(message: &str) {
    println!("{}", message.green().bold());
}

/// Display an error message
pub fn error(message: &str) {
    println!("{}", message.red().bold());
}

/// Display a dimmed/secondary message
pub fn dimmed(message: &str) {
    println!("{}", message.dimmed());
}

/// Section title with a blank line above
pub fn header(message: &str) {
    println!();
    println!("{}", message.white().bold());
}

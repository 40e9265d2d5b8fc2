//! Interactive mode for the server.
//!
//! Prompts for the bind address, port, map asset, and crime data location
//! before starting the server.

use dialoguer::{Confirm, Input, Select};

/// Where the interactive prompt may point the crime fetch.
const CRIME_SOURCES: &[&str] = &["Remote service (URL)", "Local JSON file", "None"];

/// Environment variables naming a crime data location.
const CRIME_URL_VAR: &str = "CRIME_DATA_URL";
const CRIME_FILE_VAR: &str = "CRIME_DATA_FILE";

/// Values for both crime location variables given the chosen entry of
/// [`CRIME_SOURCES`]. `None` means the variable is removed.
fn crime_env(choice: usize, location: Option<String>) -> [(&'static str, Option<String>); 2] {
    match choice {
        0 => [(CRIME_URL_VAR, location), (CRIME_FILE_VAR, None)],
        1 => [(CRIME_URL_VAR, None), (CRIME_FILE_VAR, location)],
        _ => [(CRIME_URL_VAR, None), (CRIME_FILE_VAR, None)],
    }
}

fn prompt(label: &str, default: &str) -> String {
    Input::new()
        .with_prompt(label)
        .default(default.to_string())
        .interact_text()
        .unwrap_or_else(|_| default.to_string())
}

/// Runs the server in interactive mode, prompting for configuration.
///
/// Sets `BIND_ADDR`, `PORT`, `MAP_SVG_PATH`, and at most one of
/// `CRIME_DATA_URL` and `CRIME_DATA_FILE` (the other is cleared), then
/// delegates to [`super::run_server`].
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Region Map Server");
    println!();

    let bind_addr = prompt("Bind address", "127.0.0.1");
    let port = prompt("Port", "8080");
    let map_path = prompt("Map asset", super::DEFAULT_MAP_SVG_PATH);

    let source = Select::new()
        .with_prompt("Crime data source")
        .items(CRIME_SOURCES)
        .default(1)
        .interact()
        .unwrap_or(2);
    let location = match source {
        0 => Some(prompt("Service URL", "http://127.0.0.1:3000")),
        1 => Some(prompt("Data file", "assets/crimes.json")),
        _ => None,
    };
    let crime_vars = crime_env(source, location);

    // SAFETY: We are single-threaded at this point (before server starts) and
    // these variables are only read once during server initialisation.
    unsafe {
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", &port);
        std::env::set_var("MAP_SVG_PATH", &map_path);
        for (key, value) in &crime_vars {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_choice_clears_file_variable() {
        assert_eq!(
            crime_env(0, Some("http://api.local".to_string())),
            [
                (CRIME_URL_VAR, Some("http://api.local".to_string())),
                (CRIME_FILE_VAR, None),
            ]
        );
    }

    #[test]
    fn file_choice_clears_url_variable() {
        assert_eq!(
            crime_env(1, Some("data.json".to_string())),
            [
                (CRIME_URL_VAR, None),
                (CRIME_FILE_VAR, Some("data.json".to_string())),
            ]
        );
    }

    #[test]
    fn no_source_clears_both_variables() {
        assert_eq!(
            crime_env(2, None),
            [(CRIME_URL_VAR, None), (CRIME_FILE_VAR, None)]
        );
    }
}

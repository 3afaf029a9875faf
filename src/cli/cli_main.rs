use crate::Examples::rd_examples::{SETTINGS_FILE, rd_examples, run_with_noise};
use crate::settings::SimulationSettings;
use log::error;
use std::io::{self, Write};
use std::path::Path;

pub fn run_interactive_menu() {
    loop {
        show_main_menu();
        let Some(choice) = get_user_input() else {
            break;
        };
        match choice.trim() {
            "1" => rd_examples(0),
            "2" => rd_examples(1),
            "3" => rd_examples(2),
            "4" => settings_file_menu(),
            "0" => {
                println!("Goodbye!");
                break;
            }
            _ => println!("Invalid choice. Please try again."),
        }
    }
}

/* colors
Blue (\x1b[34m) - header
Yellow (\x1b[33m) - menu options
Cyan (\x1b[36m) - prompt
Reset (\x1b[0m) - back to normal after each colored section
*/
fn show_main_menu() {
    println!(
        "\x1b[34m\n RDTuring: two-species reaction-diffusion on a periodic grid\n
    explicit Euler and IMEX integrators for Turing pattern formation \n\x1b[0m"
    );
    println!("\x1b[33m1. Explicit reference run (m = 150)\x1b[0m");
    println!("\x1b[33m2. IMEX reference run (m = 150, JSON snapshots)\x1b[0m");
    println!("\x1b[33m3. Pure diffusion: explicit vs IMEX\x1b[0m");
    println!("\x1b[33m4. Run from settings file\x1b[0m");
    println!("\x1b[33m0. Exit\x1b[0m");
    prompt("\x1b[36mEnter your choice: \x1b[0m");
}

fn settings_file_menu() {
    println!("\n=== Settings file ===");
    prompt(&format!("Path to settings JSON [{}]: ", SETTINGS_FILE));
    let Some(input) = get_user_input() else {
        return;
    };
    let path = match input.trim() {
        "" => SETTINGS_FILE.to_string(),
        other => other.to_string(),
    };
    match SimulationSettings::load_from_file(&path) {
        Ok(settings) => {
            prompt("Random seed [0]: ");
            let seed = get_user_input()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(0);
            match run_with_noise(settings, seed, None) {
                Ok((summary, _)) => println!("{:#?}", summary),
                Err(e) => error!("run failed: {}", e),
            }
        }
        Err(e) => {
            error!("cannot load '{}': {}", path, e);
            if !Path::new(&path).exists() {
                match SimulationSettings::default().save_to_file(&path) {
                    Ok(()) => println!("Default settings written to '{}', edit and retry.", path),
                    Err(e) => error!("cannot write '{}': {}", path, e),
                }
            }
        }
    }
}

fn prompt(text: &str) {
    print!("{}", text);
    if let Err(e) = io::stdout().flush() {
        error!("cannot flush stdout: {}", e);
    }
}

/// None on end of input or a read error
fn get_user_input() -> Option<String> {
    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) => None,
        Ok(_) => Some(input),
        Err(e) => {
            error!("failed to read input: {}", e);
            None
        }
    }
}

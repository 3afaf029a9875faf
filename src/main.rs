use RDTuring::Utils::logger::init_logger;
use RDTuring::cli::cli_main::run_interactive_menu;
use simplelog::LevelFilter;

pub fn main() {
    if let Err(e) = init_logger(LevelFilter::Info, Some("rd_turing.log")) {
        eprintln!("{}", e);
    }
    run_interactive_menu();
}

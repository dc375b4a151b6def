use driftscan::{cli, ui};

fn main() {
    if let Err(e) = cli::run() {
        ui::output::error(e);
        std::process::exit(1);
    }
}

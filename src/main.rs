fn main() {
    if let Err(err) = gitgud::cli::run() {
        gitgud::ui::output::error(format!("{err:#}"));
        std::process::exit(1);
    }
}

use hatchery::cli::Cli;

fn main() {
    // Errors are printed by the CLI itself; only the exit code remains
    if Cli::run().is_err() {
        std::process::exit(1);
    }
}

fn main() {
    if let Err(err) = terminal_insights::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

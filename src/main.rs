fn main() {
    if let Err(e) = council::cli::main() {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}

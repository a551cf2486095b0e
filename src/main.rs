fn main() {
    if let Err(err) = badge_composer::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn main() {
    if let Err(err) = zonetag::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

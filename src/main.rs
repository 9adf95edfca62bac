fn main() {
    if let Err(err) = magcore::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

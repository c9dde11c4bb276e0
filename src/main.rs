fn main() {
    if let Err(err) = csv2db::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

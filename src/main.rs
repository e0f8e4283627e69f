fn main() {
    if let Err(err) = solfocus_lib::run() {
        eprintln!("solfocus: {err:#}");
        std::process::exit(1);
    }
}

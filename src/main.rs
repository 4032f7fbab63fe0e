fn main() {
    if let Err(e) = carelink_lib::run() {
        eprintln!("carelink: {e}");
        std::process::exit(1);
    }
}

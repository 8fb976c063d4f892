fn main() {
    if let Err(err) = swimlane_editor::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

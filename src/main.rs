fn main() {
    if let Err(e) = pii_redactor_lib::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

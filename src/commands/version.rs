//! Version command

/// Run the version command.
pub fn run() {
    println!("gantry {}", env!("CARGO_PKG_VERSION"));
}

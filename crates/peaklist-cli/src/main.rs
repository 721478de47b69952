use std::process;

fn main() {
    match peaklist_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("peaklist error: {err}");
            process::exit(1);
        }
    }
}

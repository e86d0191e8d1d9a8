mod builtins;
mod exec;
mod jobs;
mod mask;
mod parser;
mod shell;
mod signals;
mod utils;

use std::env;

fn main() {
    let mut emit_prompt = true;
    let mut verbose = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" => utils::print_usage(),
            "-v" => verbose = true,
            "-p" => emit_prompt = false,
            _ => utils::print_usage(),
        }
    }

    // The table must exist before any handler that might touch it.
    jobs::init(verbose);
    signals::install();

    shell::run_shell(emit_prompt, verbose);
}

use std::env;
use std::fs::File;
use std::io::prelude::*;
use std::process::ExitCode;

use lantern::interpreter::Interpreter;
use lantern::vm::VM;
use lantern::zio::ConsoleIo;
use log::{debug, info};

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("lantern - Z-Machine interpreter for Infocom story files (v1-3)");
        println!();
        println!("Usage: {} <story_file> [--limit N]", args[0]);
        println!();
        println!("The --limit option stops execution after N instructions.");
        return ExitCode::SUCCESS;
    }
    let story_path = &args[1];

    let mut limit = None;
    if args.len() >= 4 && args[2] == "--limit" {
        match args[3].parse::<u64>() {
            Ok(n) => limit = Some(n),
            Err(_) => {
                eprintln!("Error: invalid instruction limit '{}'", args[3]);
                return ExitCode::FAILURE;
            }
        }
    }

    debug!("loading story file {story_path}");
    let mut story = Vec::new();
    match File::open(story_path) {
        Ok(mut f) => {
            if let Err(e) = f.read_to_end(&mut story) {
                eprintln!("Error: cannot read story file '{story_path}': {e}");
                return ExitCode::FAILURE;
            }
        }
        Err(e) => {
            eprintln!("Error: cannot open story file '{story_path}': {e}");
            return ExitCode::FAILURE;
        }
    }

    let vm = match VM::new(story) {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "story version {}, release {}, initial pc {:#06x}",
        vm.header.version, vm.header.release, vm.header.initial_pc
    );

    let mut interpreter = Interpreter::new(vm, Box::new(ConsoleIo::new()));
    match interpreter.run_with_limit(limit) {
        Ok(()) => {
            println!("Completed execution.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("\nError: {e}");
            ExitCode::FAILURE
        }
    }
}

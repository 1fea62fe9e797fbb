use pexp::PortableExecutable;
use std::env;
use std::fs::File;
use std::process::ExitCode;

fn main() -> ExitCode {
    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: pexp <path-to-pe-image>");
            return ExitCode::FAILURE;
        }
    };

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("failed to open {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut pe = match PortableExecutable::new(file) {
        Ok(pe) => pe,
        Err(e) => {
            eprintln!("failed to parse {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("{pe}");
    match pe.section_table() {
        Ok(sections) => {
            println!("sections:");
            for section in sections.iter() {
                println!(
                    "  {:<8} vaddr={:#010x} vsize={:#010x} praw={:#010x} psize={:#010x} char={:#010x}",
                    section.name(),
                    section.virtual_address(),
                    section.virtual_size(),
                    section.pointer_to_raw_data(),
                    section.size_of_raw_data(),
                    section.characteristics().bits(),
                );
            }
        }
        Err(e) => eprintln!("failed to read section table: {e}"),
    }

    ExitCode::SUCCESS
}

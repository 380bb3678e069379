use epiwalk::runner::run_with_args;

fn main() {
    match run_with_args(|_, _, _| Ok(None)) {
        Ok(summary) => println!("{summary}"),
        Err(e) => {
            eprintln!("epiwalk: {e}");
            std::process::exit(1);
        }
    }
}

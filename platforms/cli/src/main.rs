use clap::Parser;
use std::io::{self, BufRead};
use std::path::Path;
use std::process;
use tmc::loader::ProgramLoader;
use tmc::machine::Machine;
use tmc::optimizer::{self, OptConfig};
use tmc::types::{Step, Tm, MAX_STEPS};

#[derive(Parser)]
#[clap(author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// The decision-procedure program to compile (.tmc)
    source: String,

    /// Write the compiled machine to this file instead of stdout
    #[clap(short, long)]
    output: Option<String>,

    /// Run the compiled machine on these inputs (also read from piped stdin)
    #[clap(short = 't', long = "input")]
    inputs: Vec<String>,

    /// Print every configuration while running test inputs
    #[clap(short = 'd', long)]
    debug: bool,

    /// Step budget per test run
    #[clap(long, default_value_t = MAX_STEPS)]
    max_steps: usize,

    /// Skip the cleanup passes
    #[clap(long)]
    no_opt: bool,

    /// Print machine statistics to stderr
    #[clap(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let program = match ProgramLoader::load_program(Path::new(&cli.source)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error loading program: {}", e);
            process::exit(1);
        }
    };

    let mut tm = match tmc::compile(&program) {
        Ok(tm) => tm,
        Err(e) => {
            eprintln!("error compiling program: {}", e);
            process::exit(1);
        }
    };

    if !cli.no_opt {
        optimizer::optimize(&mut tm, &OptConfig::default());
    }

    if let Err(e) = tmc::validate(&tm) {
        eprintln!("error: compiled machine is invalid: {}", e);
        process::exit(1);
    }

    let text = tmc::encode(&tm);
    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &text) {
                eprintln!("error writing {}: {}", path, e);
                process::exit(1);
            }
            if cli.verbose {
                eprintln!("wrote {}", path);
            }
        }
        None => print!("{}", text),
    }

    if cli.verbose {
        eprintln!("states: {}", tm.states.len());
        eprintln!("tape alphabet: {}", tm.tape_alphabet.len());
        eprintln!("transitions: {}", tm.transition_count());
    }

    let inputs = match read_test_inputs(&cli.inputs) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    for input in &inputs {
        run_test(&tm, input, cli.max_steps, cli.debug);
    }
}

/// Runs the machine on one input, reporting the verdict, step count and
/// final tape.
fn run_test(tm: &Tm, input: &str, max_steps: usize, debug: bool) {
    let mut machine = Machine::with_max_steps(tm, max_steps);

    if debug {
        machine.reset(input);
        print_config(&machine);
        while !machine.halted() && machine.steps() < max_steps {
            if machine.step() == Step::Continue {
                print_config(&machine);
            }
        }
    }

    let result = machine.run(input);
    println!("input: {:?}", input);
    println!(
        "result: {}",
        if result.accepted { "ACCEPT" } else { "REJECT" }
    );
    println!("steps: {}", result.steps);
    if !result.final_tape.is_empty() {
        println!("final tape: {}", result.final_tape);
    }
    if result.hit_limit {
        println!("warning: hit step limit");
    }
}

fn print_config(machine: &Machine) {
    let config = machine.current_config();
    let tape: String = config.tape.iter().collect();
    println!(
        "step {:>6}  state {:<16} head {:>4}  tape {}",
        machine.steps(),
        config.state,
        config.head,
        tape
    );
}

/// Test inputs come from `-t` flags, or one per line from piped stdin.
fn read_test_inputs(inputs: &[String]) -> Result<Vec<String>, String> {
    if !inputs.is_empty() {
        return Ok(inputs.to_vec());
    }

    if atty::isnt(atty::Stream::Stdin) {
        let stdin = io::stdin();
        let mut lines = Vec::new();
        for line in stdin.lock().lines() {
            match line {
                Ok(content) => lines.push(content.trim().to_string()),
                Err(e) => return Err(format!("error reading from stdin: {}", e)),
            }
        }
        return Ok(lines);
    }

    Ok(Vec::new())
}

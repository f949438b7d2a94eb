use clap::{Parser as ClapParser, Subcommand};
use std::{fs, process};

use ast::{Kind, Tree};
use bytecode::listing;
use linker::Environment;

use vm::{Compiler, EvaluationSettings, Interpreter, MAX_FRAMES, link_packages};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Package trees to link, in order
    #[arg(required = true, help = "JSON files holding arrays of package trees")]
    files: Vec<String>,

    /// Frame stack limit before StackOverflow is raised
    #[arg(long, default_value_t = MAX_FRAMES)]
    max_frames: usize,

    /// Link without the wollok standard library
    #[arg(long)]
    no_prelude: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a program by its fully-qualified name
    Run { program: String },
    /// Run every test and describe
    Test,
    /// Print the bytecode of a program, test or `module.method`
    Dump { entity: String },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut packages = Vec::new();
    for filename in &cli.files {
        match read_packages(filename) {
            Ok(trees) => packages.extend(trees),
            Err(err) => {
                eprintln!("Error reading file '{}': {}", filename, err);
                process::exit(1);
            }
        }
    }

    let environment = match link_packages(packages, !cli.no_prelude) {
        Ok(environment) => environment,
        Err(err) => {
            eprintln!("Error linking: {}", err);
            process::exit(1);
        }
    };

    let settings = EvaluationSettings {
        max_frames: cli.max_frames,
        echo_console: true,
    };

    match cli.command {
        Command::Run { program } => {
            let interpreter = Interpreter::new(environment).with_settings(settings);
            if let Err(err) = interpreter.run_program(&program) {
                eprintln!("Error running {}: {}", program, err);
                process::exit(1);
            }
        }
        Command::Test => {
            let interpreter = Interpreter::new(environment).with_settings(settings);
            let report = match interpreter.run_tests() {
                Ok(report) => report,
                Err(err) => {
                    eprintln!("Error initializing globals: {}", err);
                    process::exit(1);
                }
            };
            for failure in &report.failures {
                println!("FAIL {}: {}", failure.name, failure.error);
            }
            println!("{}/{} tests passed", report.passed, report.total);
            if !report.is_success() {
                process::exit(1);
            }
        }
        Command::Dump { entity } => match dump(&environment, &entity) {
            Ok(text) => print!("{}", text),
            Err(err) => {
                eprintln!("Error dumping {}: {}", entity, err);
                process::exit(1);
            }
        },
    }
}

fn read_packages(filename: &str) -> Result<Vec<Tree>, String> {
    let text = fs::read_to_string(filename).map_err(|err| err.to_string())?;
    serde_json::from_str(&text).map_err(|err| err.to_string())
}

fn dump(environment: &Environment, entity: &str) -> Result<String, String> {
    let compiler = Compiler::new(environment);
    if let Some(id) = environment.entity(entity) {
        let code = match environment.kind(id) {
            Kind::Program { body, .. } | Kind::Test { body, .. } => compiler.block(*body),
            other => return Err(format!("cannot dump a {}", other.kind_name())),
        };
        return code.map(|code| listing(&code)).map_err(|err| err.to_string());
    }
    let (module, selector) = entity
        .rsplit_once('.')
        .ok_or_else(|| format!("no entity named `{}`", entity))?;
    let module = environment
        .entity(module)
        .ok_or_else(|| format!("no entity named `{}`", module))?;
    let mut out = String::new();
    for &member in environment.kind(module).members() {
        if matches!(environment.kind(member), Kind::Method { .. })
            && environment.name(member) == Some(selector)
        {
            let code = compiler.method(member).map_err(|err| err.to_string())?;
            out.push_str(&format!("{}:\n", compiler.method_name(member)));
            out.push_str(&listing(&code));
        }
    }
    if out.is_empty() {
        return Err(format!("no method `{}` in `{}`", selector, entity));
    }
    Ok(out)
}

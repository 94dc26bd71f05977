use std::env;
use std::fs;
use std::io::{self, Read, Write};

use clap::{values_t, App, AppSettings, Arg};
use env_logger::{fmt, Builder, Target};

use anyhow::Error;
use log::{error, info};
use log::{Level, LevelFilter, Record};

use ipasat::dimacs::Strict;
use ipasat::{ProofFormat, Solver, Status};

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "c {}", record.args())
        } else {
            writeln!(buf, "c {}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("IPASAT_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn banner() {
    info!("This is ipasat {}", env!("CARGO_PKG_VERSION"));
}

fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("ipasat")
        .version(env!("CARGO_PKG_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .arg_from_usage("[INPUT] 'The input file to use (stdin if omitted)'")
        .arg(
            Arg::from_usage("[option] -O --option")
                .value_name("OPTION")
                .help("Set a solver option, using --name, --no-name or --name=value syntax.")
                .multiple(true)
                .number_of_values(1),
        )
        .arg_from_usage("[configure] --configure=[PRESET] 'Apply a configuration preset'")
        .arg_from_usage("[optimize] --optimize=[LEVEL] 'Scale inprocessing budgets by 10^LEVEL'")
        .arg_from_usage("[proof-file] --proof=[FILE] 'Write a DRAT proof to the specified file'")
        .arg(
            Arg::from_usage(
                "[proof-format] --proof-format=[FORMAT] 'Specify the proof format to use.'",
            )
            .possible_values(&["drat", "binary-drat"])
            .default_value("drat")
            .case_insensitive(true),
        )
        .arg(
            Arg::from_usage("[strict] --strict=[LEVEL] 'DIMACS parsing strictness'")
                .possible_values(&["0", "1", "2"])
                .default_value("1"),
        )
        .arg_from_usage("[conflict-limit] --conflict-limit=[N] 'Stop after N conflicts'")
        .arg_from_usage("--statistics 'Print statistics after solving'")
        .get_matches();

    init_logging();
    banner();

    let mut solver = Solver::new();

    if let Some(preset) = matches.value_of("configure") {
        solver.configure(preset)?;
    }

    for option in values_t!(matches, "option", String).unwrap_or_default() {
        solver.set_long_option(&option)?;
    }

    if let Some(level) = matches.value_of("optimize") {
        solver.optimize(level.parse()?);
    }

    if let Some(path) = matches.value_of("proof-file") {
        let proof_format = match matches
            .value_of("proof-format")
            .unwrap()
            .to_ascii_lowercase()
            .as_str()
        {
            "drat" => ProofFormat::Drat,
            "binary-drat" => ProofFormat::BinaryDrat,
            _ => unreachable!(),
        };

        info!("Writing proof to file '{}'", path);
        solver.write_proof_path(path, proof_format)?;
    }

    let strict = match matches.value_of("strict").unwrap() {
        "0" => Strict::Lenient,
        "1" => Strict::Normal,
        "2" => Strict::Pedantic,
        _ => unreachable!(),
    };

    if let Some(limit) = matches.value_of("conflict-limit") {
        solver.limit("conflicts", Some(limit.parse()?));
    }

    let stdin = io::stdin();

    let mut locked_stdin;
    let mut opened_file;

    let file = match matches.value_of("INPUT") {
        Some(path) => {
            info!("Reading file '{}'", path);
            opened_file = fs::File::open(path)?;
            &mut opened_file as &mut dyn Read
        }
        None => {
            info!("Reading from stdin");
            locked_stdin = stdin.lock();
            &mut locked_stdin as &mut dyn Read
        }
    };

    let cubes = solver.add_dimacs(file, strict)?;

    if !cubes.is_empty() {
        info!("Ignoring {} cubes of incremental input", cubes.len());
    }

    let status = solver.solve();

    if matches.is_present("statistics") {
        solver.statistics();
    }

    solver.close_proof()?;

    match status {
        Status::Satisfiable => {
            println!("s SATISFIABLE");
            print!("v");
            for lit in solver.model() {
                print!(" {}", lit);
            }
            println!(" 0");
        }
        Status::Unsatisfiable => {
            println!("s UNSATISFIABLE");
        }
        Status::Unknown => {
            println!("s UNKNOWN");
        }
    }

    Ok(status.exit_code())
}

#![allow(clippy::cognitive_complexity)]

use std::fmt::Display;
use std::path::{Path, PathBuf};

use clap::{App, Arg};
use indexmap::IndexMap;
use reslint::error::StructuralError;
use reslint::model::ProjectModel;
use reslint::{unarchiver, Linter};
use tracing_subscriber::EnvFilter;

fn main() {
  tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

  let args = App::new(env!("CARGO_PKG_NAME"))
    .version(env!("CARGO_PKG_VERSION"))
    .author(env!("CARGO_PKG_AUTHORS"))
    .about(env!("CARGO_PKG_DESCRIPTION"))
    .arg(
      Arg::with_name("PROJECT")
        .help("Path to the .xcodeproj directory to lint")
        .required(true),
    )
    .arg(Arg::with_name("TARGET").help("Name of the target to lint").required(true))
    .arg(
      Arg::with_name("CONFIGURATION")
        .help("Name of the build configuration to resolve settings against")
        .required(true),
    )
    .arg(
      Arg::with_name("config")
        .long("config")
        .value_name("FILE")
        .help("Additional default-config text file to load")
        .takes_value(true),
    )
    .arg(
      Arg::with_name("no-default-config")
        .long("no-default-config")
        .help("Skip the target's default-config text file"),
    )
    .arg(
      Arg::with_name("environment")
        .long("environment")
        .value_name("KEY=VALUE")
        .help("Extra build-setting environment entry, may be repeated")
        .multiple(true)
        .number_of_values(1),
    )
    .get_matches();

  let project_dir = PathBuf::from(args.value_of("PROJECT").unwrap())
    .canonicalize()
    .check(|| "Failed to resolve project directory");
  let target_name = args.value_of("TARGET").unwrap();
  let configuration_name = args.value_of("CONFIGURATION").unwrap();
  let config_path = args.value_of("config").map(PathBuf::from);
  let parse_default_config = !args.is_present("no-default-config");

  let environment: IndexMap<String, String> = args
    .values_of("environment")
    .into_iter()
    .flatten()
    .map(|pair| {
      pair
        .split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .check(|| format!("Malformed --environment entry (expected KEY=VALUE): {:?}", pair))
    })
    .collect();

  let mut model = load_project(&project_dir);

  if !model.prepare(environment, target_name, configuration_name) {
    fatal(format!(
      "target {:?} has no configuration named {:?}",
      target_name, configuration_name
    ));
  }

  let source = model.build_linter_source(config_path.as_deref());
  let linter = Linter::run(&source, parse_default_config);

  print_report(&linter);
}

fn load_project(project_dir: &Path) -> ProjectModel {
  let project_path = project_dir.join("project.pbxproj");
  let text = read_project_file(&project_path).check(|| format!("Failed to read {:?}", project_path));
  let value = reslint::plist::parse(&text).check(|| format!("Failed to parse {:?}", project_path));
  unarchiver::unarchive(&value, &project_path).check(|| format!("Failed to unarchive {:?}", project_path))
}

fn read_project_file(path: &Path) -> Result<String, StructuralError> {
  std::fs::read_to_string(path).map_err(|source| StructuralError::Io { path: path.to_path_buf(), source })
}

fn print_report(linter: &Linter) {
  for error in &linter.config_errors {
    println!("config error: {}", error);
  }

  for reference in &linter.missing_references {
    match &reference.missing_resource_hint {
      Some(hint) => println!(
        "{}:{}: missing resource {:?} ({}, did you mean {:?}?)",
        reference.reference_path, reference.location, reference.resource_path, reference.reference_hint, hint
      ),
      None => println!(
        "{}:{}: missing resource {:?} ({})",
        reference.reference_path, reference.location, reference.resource_path, reference.reference_hint
      ),
    }
  }

  for warning in &linter.case_mismatch_warnings {
    println!(
      "warning: {:?} referenced as {:?} but bundled as {:?}",
      warning.resource_path, warning.requested, warning.actual
    );
  }

  for resource in &linter.unused_resources {
    println!("unused resource: {}", resource);
  }

  for warning in &linter.lint_warnings {
    println!("warning: {}", warning);
  }

  for error in &linter.lint_errors {
    println!("error: {}", error);
  }

  for ignore in linter
    .missing_ignore_configs
    .iter()
    .chain(&linter.unused_ignore_configs)
    .chain(&linter.warning_ignore_configs)
    .chain(&linter.error_ignore_configs)
  {
    println!("{}:{}: ignore rule {:?} never matched anything", ignore.file, ignore.line, ignore.pattern);
  }

  println!(
    "{} missing, {} unused, {} warnings, {} errors, {} config errors",
    linter.missing_references.len(),
    linter.unused_resources.len(),
    linter.lint_warnings.len(),
    linter.lint_errors.len(),
    linter.config_errors.len(),
  );
}

trait Check {
  type R;
  fn check<F, S>(self, msg: F) -> Self::R
  where
    F: FnOnce() -> S,
    S: Display;
}

impl<T, E: Display> Check for Result<T, E> {
  type R = T;
  fn check<F, S>(self, msg: F) -> T
  where
    F: FnOnce() -> S,
    S: Display,
  {
    match self {
      Ok(v) => v,
      Err(e) => fatal(format!("{}: {}", msg(), e)),
    }
  }
}

impl<T> Check for Option<T> {
  type R = T;
  fn check<F, S>(self, msg: F) -> T
  where
    F: FnOnce() -> S,
    S: Display,
  {
    match self {
      Some(v) => v,
      None => fatal(msg()),
    }
  }
}

fn fatal<S: Display>(msg: S) -> ! {
  eprintln!("{}", msg);
  std::process::exit(1)
}

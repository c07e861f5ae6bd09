use std::env;
use std::fs;
use std::path::Path;
use std::process;

use rnmc::compile;

fn main() {
  let args: Vec<String> = env::args().collect();
  let program = args.first().map(String::as_str).unwrap_or("rnmc");

  // accept "-v file" as well as "file -v"
  let mut verbose = false;
  let mut file = None;
  for arg in args.iter().skip(1) {
    if arg.eq_ignore_ascii_case("-v") {
      verbose = true;
    } else if file.is_none() {
      file = Some(arg.as_str());
    } else {
      eprintln!("unrecognised argument: {arg}");
      eprintln!("usage: {program} [-v] <file>");
      process::exit(1);
    }
  }
  let Some(file) = file else {
    eprintln!("usage: {program} [-v] <file>");
    process::exit(1);
  };

  let source = match fs::read_to_string(file) {
    Ok(source) => source,
    Err(err) => {
      eprintln!("could not read file {file}: {err}");
      process::exit(1);
    }
  };

  let stem = Path::new(file)
    .file_stem()
    .and_then(|stem| stem.to_str())
    .unwrap_or("out");

  let lines = match compile(stem, &source) {
    Ok(lines) => lines,
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  };

  if verbose {
    for line in &lines {
      println!("{line}");
    }
  }

  let out_name = format!("{stem}.masm");
  if let Err(err) = fs::write(&out_name, lines.join("\n") + "\n") {
    eprintln!("could not write file {out_name}: {err}");
    process::exit(1);
  }
}

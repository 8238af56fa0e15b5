use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, Command, value_parser};
use dialoguer::Confirm;
use indoc::indoc;
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use xmlbench::harness::{IterationPlan, run_suite};
use xmlbench::suite::SuiteConfig;

#[derive(Copy, Clone, PartialEq, Eq)]
enum ReportFormat {
    Text,
    Json,
}

struct XmlBenchRun {
    config: SuiteConfig,
    plan: IterationPlan,
    fail_fast: bool,
    format: ReportFormat,
    output: Box<dyn Write>,
    verbosity_level: Option<LevelFilter>,
}

impl XmlBenchRun {
    pub fn from_cli_matches(matches: &clap::ArgMatches) -> Result<Self> {
        let suite_path = matches
            .get_one::<PathBuf>("SUITE")
            .expect("SUITE is required");

        let config = if suite_path == Path::new("-") {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read suite configuration from stdin")?;
            let mut config =
                SuiteConfig::from_json_str(&raw).context("malformed suite configuration")?;
            let cwd = std::env::current_dir().context("cannot resolve the working directory")?;
            config.resolve_inputs(&cwd);
            config
        } else {
            SuiteConfig::from_path(suite_path)?
        };

        let plan = IterationPlan {
            warmup: matches.get_one::<u64>("warmup").copied(),
            runs: matches.get_one::<u64>("iterations").copied(),
        };

        let format = match matches
            .get_one::<String>("output-format")
            .map(String::as_str)
        {
            Some("json") => ReportFormat::Json,
            _ => ReportFormat::Text,
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(LevelFilter::Info),
            2 => Some(LevelFilter::Debug),
            3 => Some(LevelFilter::Trace),
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                Some(LevelFilter::Trace)
            }
        };

        let threads = matches.get_one::<usize>("num-threads").copied();
        match (cfg!(feature = "multithreading"), threads) {
            (true, Some(number)) => {
                #[cfg(feature = "multithreading")]
                rayon::ThreadPoolBuilder::new()
                    .num_threads(number)
                    .build_global()
                    .context("failed to configure the thread pool")?;
            }
            (true, None) => {}
            (false, Some(_)) => {
                eprintln!(
                    "requested threads, but binary was compiled without the `multithreading` feature; running pairs sequentially"
                );
            }
            (false, None) => {}
        }

        let output: Box<dyn Write> = if let Some(path) = matches.get_one::<PathBuf>("output-target")
        {
            let file =
                create_output_file(path, !matches.get_flag("no-confirm-overwrite")).with_context(
                    || format!("failed to create output file at `{}`", path.display()),
                )?;
            Box::new(file)
        } else {
            Box::new(io::stdout())
        };

        Ok(XmlBenchRun {
            config,
            plan,
            fail_fast: matches.get_flag("fail-fast"),
            format,
            output,
            verbosity_level,
        })
    }

    pub fn run(mut self) -> Result<()> {
        self.try_to_initialize_logging();

        let report = run_suite(&self.config, self.plan, self.fail_fast)?;

        match self.format {
            ReportFormat::Text => {
                self.output.write_all(report.render_text().as_bytes())?;
            }
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut self.output, &report.to_json())?;
                writeln!(self.output)?;
            }
        }
        self.output.flush()?;

        if report.has_failures() {
            eprintln!("one or more (driver, case) pairs failed; see the report");
            exit(1);
        }
        Ok(())
    }

    fn try_to_initialize_logging(&self) {
        if let Some(filter) = self.verbosity_level {
            if let Err(e) = TermLogger::init(
                filter,
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ) {
                eprintln!("Failed to initialize logging: {e:?}");
            }
        }
    }
}

/// If `prompt` is set, will display a confirmation prompt before
/// overwriting files.
fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
    let p = path.as_ref();

    if p.is_dir() {
        bail!(
            "There is a directory at {}, refusing to overwrite",
            p.display()
        );
    }

    if p.exists() {
        if prompt {
            match Confirm::new()
                .with_prompt(format!(
                    "Are you sure you want to override output file at {}",
                    p.display()
                ))
                .default(false)
                .interact()
            {
                Ok(true) => Ok(File::create(p)?),
                Ok(false) => bail!("Cancelled"),
                Err(e) => bail!("Failed to display confirmation prompt: {e}"),
            }
        } else {
            Ok(File::create(p)?)
        }
    } else {
        match p.parent() {
            Some(parent) => {
                if !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
                Ok(File::create(p)?)
            }
            None => bail!("Output file cannot be root."),
        }
    }
}

fn main() -> Result<()> {
    let matches = Command::new("xmlbench")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs a suite of XML codec micro-benchmarks under one timing protocol")
        .arg(
            Arg::new("SUITE")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the JSON suite configuration, or `-` to read it from stdin"),
        )
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("format")
                .value_parser(["text", "json"])
                .default_value("text")
                .help("Sets the report format")
                .long_help(indoc! {"Sets the report format:
                    \"text\" - a human-readable table.
                    \"json\" - machine-readable, one row per (driver, case) pair.
                "}),
        )
        .arg(
            Arg::new("output-target")
                .short('f')
                .long("output")
                .value_parser(value_parser!(PathBuf))
                .help(
                    "Writes the report to the file specified instead of stdout. \
                     Will ask for confirmation before overwriting files, \
                     to allow overwriting, pass `--no-confirm-overwrite`. \
                     Will create parent directories if needed.",
                ),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
        )
        .arg(
            Arg::new("iterations")
                .short('n')
                .long("iterations")
                .value_parser(value_parser!(u64).range(1..))
                .help("Overrides the number of timed iterations per (driver, case) pair"),
        )
        .arg(
            Arg::new("warmup")
                .long("warmup")
                .value_parser(value_parser!(u64))
                .help("Overrides the number of untimed warmup iterations per (driver, case) pair"),
        )
        .arg(
            Arg::new("num-threads")
                .short('t')
                .long("threads")
                .value_parser(value_parser!(usize))
                .help("Sets the number of worker threads, defaults to number of CPU cores."),
        )
        .arg(
            Arg::new("fail-fast")
                .long("fail-fast")
                .action(ArgAction::SetTrue)
                .help("Aborts the whole suite on the first failed (driver, case) pair instead of recording it and continuing"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("-v - info, -vv - debug, -vvv - trace."),
        )
        .get_matches();

    XmlBenchRun::from_cli_matches(&matches)?.run()
}

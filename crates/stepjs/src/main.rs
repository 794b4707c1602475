use anyhow::{Context as _, bail};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use stepjs::{Context, Hints, StepConfig, compile_source, read_python};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

/// A timer that prints nothing, keeping log lines short.
struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(&self, _w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        Ok(())
    }
}

/// Compile a Python teaching program to steppable JavaScript.
#[derive(Debug, Parser)]
#[command(name = "stepjs", version)]
struct Cli {
    /// Python source file
    input: PathBuf,

    /// JavaScript module to write
    #[arg(required_unless_present = "dump_ast")]
    output: Option<PathBuf>,

    /// Optional JSON hints file, validated and carried with the compile
    hints: Option<PathBuf>,

    /// TOML config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the resource filenames passed to `open` as a JSON array
    #[arg(long, value_name = "PATH")]
    files: Option<PathBuf>,

    /// Import runtime helpers and library bindings from this module
    #[arg(long, value_name = "MODULE")]
    runtime: Option<String>,

    /// Do not append an export list
    #[arg(long)]
    no_exports: bool,

    /// Treat NAME as a function compiled elsewhere (calls are awaited)
    #[arg(long = "ours-function", value_name = "NAME")]
    ours_functions: Vec<String>,

    /// Treat NAME as a class compiled elsewhere
    #[arg(long = "ours-class", value_name = "NAME")]
    ours_classes: Vec<String>,

    /// Treat NAME as a method compiled elsewhere
    #[arg(long = "ours-method", value_name = "NAME")]
    ours_methods: Vec<String>,

    /// Print the parsed syntax tree as JSON instead of compiling
    #[arg(long)]
    dump_ast: bool,
}

fn main() -> ExitCode {
    // STEPJS_LOG takes an EnvFilter directive, e.g. `stepjs=debug`.
    if let Ok(filter) = EnvFilter::try_from_env("STEPJS_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_timer(NoTimestamp)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    if cli.dump_ast {
        let module = read_python(&source)?;
        println!("{}", serde_json::to_string_pretty(&module)?);
        return Ok(());
    }
    let Some(output) = &cli.output else {
        bail!("no output path given");
    };

    let config = match &cli.config {
        Some(path) => StepConfig::load(path)?,
        None => StepConfig::default(),
    };

    let mut ctx = Context::new();
    config.apply(&mut ctx);
    for name in &cli.ours_functions {
        ctx.register_function(name.as_str());
    }
    for name in &cli.ours_classes {
        ctx.register_class(name.as_str());
    }
    for name in &cli.ours_methods {
        ctx.register_method(name.as_str());
    }
    if let Some(path) = &cli.hints {
        let hints = Hints::load(path)?;
        tracing::debug!(entries = hints.len(), "loaded hints");
        ctx.set_hints(Some(hints));
    }

    let mut options = config.compile_options();
    if let Some(runtime) = &cli.runtime {
        options.runtime_module = Some(runtime.clone());
    }
    if cli.no_exports {
        options.exports = false;
    }

    let compiled = compile_source(&source, &mut ctx, &options)
        .with_context(|| format!("failed to compile {}", cli.input.display()))?;

    std::fs::write(output, &compiled.code)
        .with_context(|| format!("failed to write {}", output.display()))?;
    if let Some(path) = &cli.files {
        std::fs::write(path, serde_json::to_string(&compiled.files)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    tracing::info!(
        input = %cli.input.display(),
        output = %output.display(),
        files = compiled.files.len(),
        "done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("lab.py");
        let output = dir.path().join("lab.js");
        let files = dir.path().join("files.json");
        let config = dir.path().join("stepjs.toml");
        std::fs::write(&input, "def main():\n    data = open(\"index.html\")\n    return paint(data)\n").unwrap();
        std::fs::write(&config, "[output]\nruntime_module = \"./from-config.js\"\n").unwrap();

        let cli = Cli::parse_from([
            "stepjs".as_ref(),
            input.as_os_str(),
            output.as_os_str(),
            "--config".as_ref(),
            config.as_os_str(),
            "--files".as_ref(),
            files.as_os_str(),
            "--runtime".as_ref(),
            "./runtime.js".as_ref(),
            "--no-exports".as_ref(),
            "--ours-function".as_ref(),
            "paint".as_ref(),
        ]
        .map(std::ffi::OsStr::new));
        run(&cli).unwrap();

        let code = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            code,
            "import { filesystem } from \"./runtime.js\";\nasync function main() {\n  let data;\n  data = filesystem.open(\"index.html\");\n  return await paint(data);\n}\n"
        );
        assert_eq!(std::fs::read_to_string(&files).unwrap(), "[\"index.html\"]");
    }

    #[test]
    fn test_config_options_apply_without_flags() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("lab.py");
        let output = dir.path().join("lab.js");
        let config = dir.path().join("stepjs.toml");
        std::fs::write(&input, "def main():\n    return open(\"a.html\")\n").unwrap();
        std::fs::write(&config, "[output]\nruntime_module = \"./from-config.js\"\nexports = false\n").unwrap();

        let cli = Cli::parse_from([
            "stepjs".as_ref(),
            input.as_os_str(),
            output.as_os_str(),
            "--config".as_ref(),
            config.as_os_str(),
        ]
        .map(std::ffi::OsStr::new));
        run(&cli).unwrap();

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "import { filesystem } from \"./from-config.js\";\nasync function main() {\n  return filesystem.open(\"a.html\");\n}\n"
        );
    }

    #[test]
    fn test_compile_failure_names_line_and_construct() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.py");
        let output = dir.path().join("bad.js");
        std::fs::write(&input, "x = 1\nif a < b < c:\n    pass\n").unwrap();

        let cli = Cli::parse_from([
            "stepjs".as_ref(),
            input.as_os_str(),
            output.as_os_str(),
        ]
        .map(std::ffi::OsStr::new));
        let err = run(&cli).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("line 2: unsupported chained comparison: a < b < c"), "{message}");
        assert!(!output.exists());
    }
}

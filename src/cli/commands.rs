//! CLI command definitions for exam-forge.
//!
//! `generate` runs a full batch and streams progress to the terminal,
//! `validate` checks a template, roster and bank without generating,
//! `check-compiler` probes the configured compiler and `list` shows the
//! stored templates and rosters.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::bank::QuestionBank;
use crate::compile::LatexCompiler;
use crate::model::{AssessmentTemplate, Student};
use crate::pipeline::{BatchOrchestrator, GenerationProgress, GeneratorConfig};
use crate::render::{LatexRenderer, Locale};
use crate::storage::{
    load_template_file, FileStudentRepository, JsonQuestionRepository, JsonTemplateRepository,
    QuestionRepository, StudentRepository, TemplateRepository,
};
use crate::validation::{validate_roster, validate_template, ValidationReport};

/// Default directory holding question files.
const DEFAULT_QUESTIONS_DIR: &str = "./data/questions";

/// Default directory holding roster files.
const DEFAULT_ROSTERS_DIR: &str = "./data/rosters";

/// Default directory holding template files.
const DEFAULT_TEMPLATES_DIR: &str = "./data/templates";

/// Capacity of the progress channel between the batch and the terminal.
const PROGRESS_BUFFER: usize = 64;

/// Per-student assessment document generator.
#[derive(Parser)]
#[command(name = "exam-forge")]
#[command(about = "Generate individualized assessment documents for every student of a roster")]
#[command(version)]
#[command(
    long_about = "exam-forge assembles one document per student from a question bank, a roster and an assessment template, then compiles each one with LaTeX.\n\nEvery run gets its own directory under the output directory with the rendered sources, compiled documents and a generation log.\n\nExample usage:\n  exam-forge generate --template midterm --output ./output"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate one document per student.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Check a template, its roster and the question bank without generating.
    Validate(ValidateArgs),

    /// Check that the document compiler can be run.
    CheckCompiler(CheckCompilerArgs),

    /// List stored templates and rosters.
    List(ListArgs),
}

/// Where templates, rosters and questions are read from.
#[derive(clap::Args, Debug)]
pub struct SourceArgs {
    /// Template file, or the name of a template in the templates directory.
    #[arg(short = 't', long)]
    pub template: String,

    /// Roster file. Defaults to the roster named by the template.
    #[arg(short = 'r', long)]
    pub roster: Option<String>,

    /// Directory of question files.
    #[arg(short = 'q', long, default_value = DEFAULT_QUESTIONS_DIR)]
    pub questions: PathBuf,

    /// Directory searched for relative roster paths.
    #[arg(long, default_value = DEFAULT_ROSTERS_DIR)]
    pub rosters_dir: PathBuf,

    /// Directory searched for templates given by name.
    #[arg(long, default_value = DEFAULT_TEMPLATES_DIR)]
    pub templates_dir: PathBuf,
}

/// Arguments for the generate command.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Base output directory (env: EXAM_FORGE_OUTPUT_DIR).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Compiler executable (env: EXAM_FORGE_COMPILER).
    #[arg(short = 'c', long)]
    pub compiler: Option<String>,

    /// Compiler passes per document (env: EXAM_FORGE_PASSES).
    #[arg(long)]
    pub passes: Option<u32>,

    /// Time limit in seconds for one compiler pass (env: EXAM_FORGE_PASS_TIMEOUT_SECS).
    #[arg(long)]
    pub pass_timeout: Option<u64>,

    /// Document language: en or pt_br (env: EXAM_FORGE_LOCALE).
    #[arg(long)]
    pub locale: Option<Locale>,

    /// Logo file copied when the template asks for a logo (env: EXAM_FORGE_LOGO).
    #[arg(long)]
    pub logo: Option<PathBuf>,

    /// Custom LaTeX layout (env: EXAM_FORGE_LAYOUT).
    #[arg(long)]
    pub layout: Option<PathBuf>,

    /// Seed for random selection (env: EXAM_FORGE_SEED).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print progress events as JSON lines instead of text.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for the validate command.
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output the report as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for the check-compiler command.
#[derive(Parser, Debug)]
pub struct CheckCompilerArgs {
    /// Compiler executable (env: EXAM_FORGE_COMPILER).
    #[arg(short = 'c', long)]
    pub compiler: Option<String>,
}

/// Arguments for the list command.
#[derive(Parser, Debug)]
pub struct ListArgs {
    #[arg(long, default_value = DEFAULT_TEMPLATES_DIR)]
    pub templates_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_ROSTERS_DIR)]
    pub rosters_dir: PathBuf,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => run_generate_command(args).await,
        Commands::Validate(args) => run_validate_command(args).await,
        Commands::CheckCompiler(args) => run_check_compiler_command(args).await,
        Commands::List(args) => run_list_command(args).await,
    }
}

// ============================================================================
// Generate Command Implementation
// ============================================================================

/// Environment configuration with the command line flags applied on top.
fn build_config(args: &GenerateArgs) -> anyhow::Result<GeneratorConfig> {
    let mut config = GeneratorConfig::from_env()?;

    if let Some(output) = &args.output {
        config = config.with_output_dir(output.clone());
    }
    if let Some(compiler) = &args.compiler {
        config = config.with_compiler(compiler.clone());
    }
    if let Some(passes) = args.passes {
        config = config.with_passes(passes);
    }
    if let Some(secs) = args.pass_timeout {
        config = config.with_pass_timeout(Duration::from_secs(secs));
    }
    if let Some(locale) = args.locale {
        config = config.with_locale(locale);
    }
    if let Some(logo) = &args.logo {
        config = config.with_logo(logo.clone());
    }
    if let Some(layout) = &args.layout {
        config = config.with_layout(layout.clone());
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    config.validate()?;
    Ok(config)
}

async fn run_generate_command(args: GenerateArgs) -> anyhow::Result<()> {
    let config = build_config(&args)?;

    let template = load_template(&args.source).await?;
    validate_template(&template)
        .map_err(|e| anyhow::anyhow!("Invalid template '{}': {}", template.name, e))?;

    let students = load_students(&args.source, &template).await?;
    validate_roster(&students).map_err(|e| anyhow::anyhow!("Invalid roster: {}", e))?;

    let bank = load_bank(&args.source.questions).await?;

    let renderer = LatexRenderer::from_optional_file(config.layout_path.as_deref())
        .context("Failed to load document layout")?;
    let compiler = LatexCompiler::new(config.compiler.clone())
        .with_passes(config.passes)
        .with_pass_timeout(config.pass_timeout);
    if !compiler.check_available().await {
        warn!(compiler = %config.compiler, "Compiler not available, documents will fail to compile");
    }

    let orchestrator = BatchOrchestrator::from_config(
        &config,
        template,
        students,
        bank,
        Arc::new(renderer),
        Arc::new(compiler),
    )
    .with_context(|| format!("Failed to create run under '{}'", config.output_dir.display()))?;
    let pdf_dir = orchestrator.pdf_dir();

    let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
    let handle = tokio::spawn(orchestrator.run(tx));

    let mut events = ReceiverStream::new(rx);
    while let Some(event) = events.next().await {
        print_event(&event, args.json)?;
    }

    let success = handle.await.context("Generation task panicked")?;
    if !success {
        anyhow::bail!("Generation completed with errors");
    }
    info!(path = %pdf_dir.display(), "Documents generated");
    Ok(())
}

fn print_event(event: &GenerationProgress, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        println!("{}", event);
    }
    Ok(())
}

// ============================================================================
// Validate Command Implementation
// ============================================================================

async fn run_validate_command(args: ValidateArgs) -> anyhow::Result<()> {
    let template = load_template(&args.source).await?;
    let students = match load_students(&args.source, &template).await {
        Ok(students) => students,
        Err(e) => {
            warn!(error = %e, "Could not load roster");
            Vec::new()
        }
    };
    let bank = load_bank(&args.source.questions).await?;

    let report = ValidationReport::for_run(&template, &students, &bank);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for check in &report.checks {
            let mark = if check.passed { "ok" } else { "FAIL" };
            match &check.message {
                Some(message) => println!("[{:>4}] {}: {}", mark, check.check_name, message),
                None => println!("[{:>4}] {}", mark, check.check_name),
            }
        }
        println!("{}", report.summary);
    }

    if !report.valid {
        anyhow::bail!("Validation failed: {}", report.summary);
    }
    Ok(())
}

// ============================================================================
// Check Compiler Command Implementation
// ============================================================================

async fn run_check_compiler_command(args: CheckCompilerArgs) -> anyhow::Result<()> {
    let mut config = GeneratorConfig::from_env()?;
    if let Some(compiler) = args.compiler {
        config = config.with_compiler(compiler);
    }

    let compiler = LatexCompiler::new(config.compiler.clone());
    match compiler.version().await {
        Some(version) => {
            println!("{}: {}", config.compiler, version);
            Ok(())
        }
        None => anyhow::bail!("Compiler '{}' is not available", config.compiler),
    }
}

// ============================================================================
// List Command Implementation
// ============================================================================

async fn run_list_command(args: ListArgs) -> anyhow::Result<()> {
    let templates = JsonTemplateRepository::new(&args.templates_dir).names().await?;
    println!("Templates ({}):", args.templates_dir.display());
    for name in &templates {
        println!("  {}", name);
    }

    let rosters = FileStudentRepository::new(&args.rosters_dir)
        .available_rosters()
        .await?;
    println!("Rosters ({}):", args.rosters_dir.display());
    for name in &rosters {
        println!("  {}", name);
    }
    Ok(())
}

// ============================================================================
// Loading helpers
// ============================================================================

/// Loads the template from a file path, or by name from the templates
/// directory.
async fn load_template(source: &SourceArgs) -> anyhow::Result<AssessmentTemplate> {
    let path = Path::new(&source.template);
    if path.is_file() {
        return load_template_file(path)
            .await
            .with_context(|| format!("Failed to load template '{}'", path.display()));
    }

    let repository = JsonTemplateRepository::new(&source.templates_dir);
    match repository.get_by_name(&source.template).await? {
        Some(template) => Ok(template),
        None => {
            let available = repository.names().await.unwrap_or_default();
            anyhow::bail!(
                "Template '{}' not found (available: {})",
                source.template,
                if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                }
            )
        }
    }
}

async fn load_students(
    source: &SourceArgs,
    template: &AssessmentTemplate,
) -> anyhow::Result<Vec<Student>> {
    let reference = source
        .roster
        .as_deref()
        .or(template.roster_path.as_deref())
        .ok_or_else(|| anyhow::anyhow!("Class roster (CSV path) must be specified"))?;

    FileStudentRepository::new(&source.rosters_dir)
        .load_roster(reference)
        .await
        .with_context(|| format!("Failed to load roster '{}'", reference))
}

async fn load_bank(questions_dir: &Path) -> anyhow::Result<QuestionBank> {
    let questions = JsonQuestionRepository::new(questions_dir)
        .get_all()
        .await
        .with_context(|| format!("Failed to load questions from '{}'", questions_dir.display()))?;
    Ok(QuestionBank::new(questions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_command_defaults() {
        let cli = Cli::try_parse_from(["exam-forge", "generate", "--template", "midterm"])
            .expect("should parse");

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.source.template, "midterm");
                assert!(args.source.roster.is_none());
                assert_eq!(args.source.questions, PathBuf::from(DEFAULT_QUESTIONS_DIR));
                assert!(args.output.is_none());
                assert!(args.locale.is_none());
                assert!(!args.json);
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_generate_command_with_all_options() {
        let cli = Cli::try_parse_from([
            "exam-forge",
            "gen",
            "-t",
            "exam.json",
            "-r",
            "class.csv",
            "-q",
            "/data/q",
            "-o",
            "/tmp/out",
            "-c",
            "xelatex",
            "--passes",
            "3",
            "--pass-timeout",
            "30",
            "--locale",
            "pt_br",
            "--seed",
            "9",
            "-j",
        ])
        .expect("should parse");

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.source.roster.as_deref(), Some("class.csv"));
                assert_eq!(args.compiler.as_deref(), Some("xelatex"));
                assert_eq!(args.passes, Some(3));
                assert_eq!(args.locale, Some(Locale::PtBr));
                assert_eq!(args.seed, Some(9));
                assert!(args.json);

                let config = build_config(&args).expect("config");
                assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
                assert_eq!(config.compile_timeout(), Duration::from_secs(90));
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_generate_requires_template() {
        assert!(Cli::try_parse_from(["exam-forge", "generate"]).is_err());
    }

    #[test]
    fn test_invalid_locale_rejected() {
        let result = Cli::try_parse_from([
            "exam-forge",
            "generate",
            "-t",
            "x",
            "--locale",
            "fr",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_log_level() {
        let cli = Cli::try_parse_from(["exam-forge", "check-compiler", "--log-level", "debug"])
            .expect("should parse");
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::CheckCompiler(_)));
    }

    #[tokio::test]
    async fn test_load_students_requires_roster() {
        let source = SourceArgs {
            template: "t".to_string(),
            roster: None,
            questions: PathBuf::from(DEFAULT_QUESTIONS_DIR),
            rosters_dir: PathBuf::from(DEFAULT_ROSTERS_DIR),
            templates_dir: PathBuf::from(DEFAULT_TEMPLATES_DIR),
        };
        let template = AssessmentTemplate::new("t", "Exam", "exam");
        let err = load_students(&source, &template).await.unwrap_err();
        assert!(err.to_string().contains("roster"));
    }
}

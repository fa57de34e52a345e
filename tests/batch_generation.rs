//! Integration tests for batch generation.
//!
//! The orchestrator runs against in-memory renderer and compiler fakes so the
//! tests need no LaTeX installation.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::StreamExt;
use tempfile::TempDir;

use exam_forge::compile::{CompileOutcome, DocumentCompiler};
use exam_forge::error::{CompileError, RenderError};
use exam_forge::model::{AssessmentTemplate, Question, QuestionImage, SelectionBlock, Student};
use exam_forge::pipeline::{
    filename_base, BatchOrchestrator, GenerationProgress, GenerationRun, Stage,
};
use exam_forge::render::{DocumentRenderer, LatexRenderer, RenderContext};
use exam_forge::QuestionBank;

/// Renders the student id and the selected question ids, one per line.
/// Fails for the listed student ids.
struct FakeRenderer {
    fail_for: Vec<String>,
}

impl FakeRenderer {
    fn new() -> Self {
        Self { fail_for: Vec::new() }
    }

    fn failing_for(id: &str) -> Self {
        Self {
            fail_for: vec![id.to_string()],
        }
    }
}

impl DocumentRenderer for FakeRenderer {
    fn extension(&self) -> &str {
        "tex"
    }

    fn render(&self, context: &RenderContext) -> Result<String, RenderError> {
        if self.fail_for.contains(&context.student.student_id) {
            return Err(RenderError::InvalidContext("layout exploded".to_string()));
        }
        let mut lines = vec![format!("student:{}", context.student.student_id)];
        for block in &context.question_blocks {
            for question in &block.questions {
                lines.push(format!("{}:{}", block.title, question.question_id));
            }
        }
        Ok(lines.join("\n"))
    }
}

/// Records the image path of every rendered question.
#[derive(Default)]
struct ImageRecorder {
    seen: Arc<Mutex<Vec<(String, String)>>>,
}

impl DocumentRenderer for ImageRecorder {
    fn extension(&self) -> &str {
        "tex"
    }

    fn render(&self, context: &RenderContext) -> Result<String, RenderError> {
        let mut seen = self.seen.lock().expect("lock");
        for block in &context.question_blocks {
            for question in &block.questions {
                if let Some(image) = &question.image {
                    seen.push((question.question_id.clone(), image.path.clone()));
                }
            }
        }
        Ok(String::from("document"))
    }
}

/// Writes `<base>.pdf` holding the source, unless the base name contains one
/// of `no_output_for`.
struct FakeCompiler {
    no_output_for: Vec<String>,
    delay: Option<Duration>,
}

impl FakeCompiler {
    fn new() -> Self {
        Self {
            no_output_for: Vec::new(),
            delay: None,
        }
    }
}

#[async_trait]
impl DocumentCompiler for FakeCompiler {
    fn name(&self) -> &str {
        "fakelatex"
    }

    fn passes(&self) -> u32 {
        1
    }

    async fn compile(
        &self,
        source: &str,
        output_base: &Path,
        _working_dir: &Path,
    ) -> Result<CompileOutcome, CompileError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let pdf = PathBuf::from(format!("{}.pdf", output_base.display()));
        let base = output_base.to_string_lossy();
        if self.no_output_for.iter().any(|id| base.contains(id.as_str())) {
            return Ok(CompileOutcome::failed(pdf, "Compiled output not created"));
        }
        tokio::fs::write(&pdf, source).await?;
        Ok(CompileOutcome::succeeded(pdf))
    }
}

fn bank() -> QuestionBank {
    let questions = (1..=6)
        .map(|i| {
            let topic = if i % 2 == 0 { "algebra" } else { "geometry" };
            Question::new(format!("Q{}", i), format!("Prompt {}", i), vec![topic.to_string()])
        })
        .collect();
    QuestionBank::new(questions)
}

fn template() -> AssessmentTemplate {
    AssessmentTemplate::new("midterm", "Midterm Exam", "midterm")
        .with_course_info("course", "Mathematics")
        .with_block(SelectionBlock::manual("Warm-up", ["Q1", "Q2"]))
        .with_block(SelectionBlock::random_all("Mixed", 2))
}

fn students() -> Vec<Student> {
    vec![
        Student::new("Ana Souza", "1"),
        Student::new("Bruno Lima", "2"),
        Student::new("Carla Dias", "3"),
    ]
}

fn orchestrator(
    output: &Path,
    students: Vec<Student>,
    bank: QuestionBank,
    renderer: impl DocumentRenderer + 'static,
    compiler: impl DocumentCompiler + 'static,
) -> BatchOrchestrator {
    let run = GenerationRun::create(output).expect("run");
    BatchOrchestrator::new(
        run,
        template(),
        students,
        bank,
        Arc::new(renderer),
        Arc::new(compiler),
    )
    .with_date(NaiveDate::from_ymd_opt(2024, 3, 15).expect("date"))
}

async fn collect(orchestrator: BatchOrchestrator) -> Vec<GenerationProgress> {
    orchestrator.generate().collect().await
}

fn for_student<'a>(events: &'a [GenerationProgress], id: &str) -> Vec<&'a GenerationProgress> {
    events
        .iter()
        .filter(|e| e.student_id.as_deref() == Some(id))
        .collect()
}

#[tokio::test]
async fn test_all_students_succeed() {
    let out = TempDir::new().expect("tempdir");
    let orchestrator = orchestrator(
        out.path(),
        students(),
        bank(),
        FakeRenderer::new(),
        FakeCompiler::new(),
    );
    let pdf_dir = orchestrator.pdf_dir();

    let events = collect(orchestrator).await;

    assert_eq!(events.len(), 3 + 5 * 3 + 1);
    assert!(events[..3].iter().all(|e| e.stage == Stage::Loading));
    assert!(events[0].message.starts_with("Output will be saved in: "));
    assert_eq!(events[1].message, "Loaded 6 questions from database");
    assert_eq!(events[2].message, "Found 3 students");

    let stages: Vec<Stage> = for_student(&events, "1").iter().map(|e| e.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::Selecting,
            Stage::Rendering,
            Stage::Rendering,
            Stage::Compiling,
            Stage::Compiling
        ]
    );

    let last = events.last().expect("complete event");
    assert!(last.is_complete());
    assert!(last.success);
    assert!(last.message.contains("All documents were generated successfully!"));
    assert_eq!(events.iter().filter(|e| e.is_complete()).count(), 1);

    for (i, student) in students().iter().enumerate() {
        let base = filename_base(&template(), student);
        assert!(pdf_dir.join(format!("{}.pdf", base)).is_file());
        let student_events = for_student(&events, &student.student_id);
        assert!(student_events.iter().all(|e| e.current == i + 1 && e.total == 3));
    }
}

#[tokio::test]
async fn test_render_failure_is_isolated() {
    let out = TempDir::new().expect("tempdir");
    let orchestrator = orchestrator(
        out.path(),
        students(),
        bank(),
        FakeRenderer::failing_for("2"),
        FakeCompiler::new(),
    );
    let run_dir = orchestrator.run_dir().to_path_buf();

    let events = collect(orchestrator).await;

    let failed = for_student(&events, "2");
    assert_eq!(failed.len(), 3);
    let error = failed.last().expect("error event");
    assert!(error.is_error());
    assert!(!error.success);
    assert!(error
        .message
        .starts_with("Failed to render document for Bruno Lima:"));

    assert_eq!(for_student(&events, "1").len(), 5);
    assert_eq!(for_student(&events, "3").len(), 5);
    assert!(for_student(&events, "3")
        .last()
        .expect("event")
        .message
        .contains("generated successfully using fakelatex"));

    let completes: Vec<_> = events.iter().filter(|e| e.is_complete()).collect();
    assert_eq!(completes.len(), 1);
    assert!(!completes[0].success);
    assert!(completes[0].message.contains("Completed with one or more errors."));

    let tex_files = std::fs::read_dir(run_dir.join("tex"))
        .expect("tex dir")
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().map_or(false, |x| x == "tex"))
        .count();
    assert_eq!(tex_files, 2);
}

#[tokio::test]
async fn test_missing_output_reports_error() {
    let out = TempDir::new().expect("tempdir");
    let compiler = FakeCompiler {
        no_output_for: vec!["_3".to_string()],
        delay: None,
    };
    let events = collect(orchestrator(
        out.path(),
        students(),
        bank(),
        FakeRenderer::new(),
        compiler,
    ))
    .await;

    let third = for_student(&events, "3");
    assert_eq!(third.len(), 5);
    assert_eq!(
        third.last().expect("event").message,
        "  -> ERROR: document not created. Compiled output not created"
    );
    assert!(!events.last().expect("complete").success);
}

#[tokio::test]
async fn test_compile_timeout_reports_error() {
    let out = TempDir::new().expect("tempdir");
    let compiler = FakeCompiler {
        no_output_for: Vec::new(),
        delay: Some(Duration::from_secs(30)),
    };
    let orchestrator = orchestrator(
        out.path(),
        vec![Student::new("Ana Souza", "1")],
        bank(),
        FakeRenderer::new(),
        compiler,
    )
    .with_compile_timeout(Duration::from_millis(50));

    let events = collect(orchestrator).await;

    let error = events.iter().find(|e| e.is_error()).expect("error event");
    assert!(error.message.starts_with("Failed to compile document for Ana Souza:"));
    assert!(error.message.contains("timed out after 0.05 seconds"));
    assert!(!events.last().expect("complete").success);
}

#[tokio::test]
async fn test_inconsistent_bank_fails_selection() {
    let out = TempDir::new().expect("tempdir");
    let bank = QuestionBank::new(vec![
        Question::new("Q1", "First", vec!["algebra".to_string()]),
        Question::new("Q1", "Again", vec!["algebra".to_string()]),
        Question::new("Q2", "Second", vec!["algebra".to_string()]),
    ]);
    let template = AssessmentTemplate::new("quiz", "Quiz", "quiz")
        .with_block(SelectionBlock::random_all("Everything", 3));
    let run = GenerationRun::create(out.path()).expect("run");
    let orchestrator = BatchOrchestrator::new(
        run,
        template,
        students(),
        bank,
        Arc::new(FakeRenderer::new()),
        Arc::new(FakeCompiler::new()),
    );
    let events = collect(orchestrator).await;

    assert_eq!(events.len(), 3 + 2 * 3 + 1);
    for student in students() {
        let student_events = for_student(&events, &student.student_id);
        assert_eq!(student_events[0].stage, Stage::Selecting);
        assert!(student_events[1].is_error());
        assert!(student_events[1]
            .message
            .starts_with(&format!("Failed to select questions for {}:", student.student_name)));
    }
    assert!(!events.last().expect("complete").success);
}

#[tokio::test]
async fn test_empty_roster_completes() {
    let out = TempDir::new().expect("tempdir");
    let events = collect(orchestrator(
        out.path(),
        Vec::new(),
        bank(),
        FakeRenderer::new(),
        FakeCompiler::new(),
    ))
    .await;

    assert_eq!(events.len(), 4);
    assert_eq!(events[2].message, "Found 0 students");
    assert!(events[3].is_complete());
    assert!(events[3].success);
}

#[tokio::test]
async fn test_run_forwards_to_channel() {
    let out = TempDir::new().expect("tempdir");
    let orchestrator = orchestrator(
        out.path(),
        students(),
        bank(),
        FakeRenderer::failing_for("1"),
        FakeCompiler::new(),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel(4);
    let handle = tokio::spawn(orchestrator.run(tx));

    let mut received = Vec::new();
    while let Some(event) = rx.recv().await {
        received.push(event);
    }
    let success = handle.await.expect("join");

    assert!(!success);
    assert_eq!(received.len(), 3 + 3 + 5 + 5 + 1);
    assert!(received.last().expect("event").is_complete());
}

#[tokio::test]
async fn test_dropped_receiver_abandons_run() {
    let out = TempDir::new().expect("tempdir");
    let orchestrator = orchestrator(
        out.path(),
        students(),
        bank(),
        FakeRenderer::new(),
        FakeCompiler::new(),
    );

    let (tx, rx) = tokio::sync::mpsc::channel(1);
    drop(rx);
    assert!(!orchestrator.run(tx).await);
}

#[tokio::test]
async fn test_generation_log_mirrors_events() {
    let out = TempDir::new().expect("tempdir");
    let orchestrator = orchestrator(
        out.path(),
        students(),
        bank(),
        FakeRenderer::failing_for("3"),
        FakeCompiler::new(),
    );
    let log_file = orchestrator.run_dir().join("log").join("generation.log");

    let events = collect(orchestrator).await;

    let log = std::fs::read_to_string(&log_file).expect("log file");
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), events.len());
    assert!(lines[0].contains("[loading] Output will be saved in: "));
    assert!(lines.iter().any(|l| l.contains("[error] Failed to render document for Carla Dias")));
    assert!(lines
        .last()
        .expect("line")
        .contains("[complete] --- PROCESS FINISHED --- Completed with one or more errors."));
}

#[tokio::test]
async fn test_manual_then_random_never_repeats() {
    let out = TempDir::new().expect("tempdir");
    let orchestrator = orchestrator(
        out.path(),
        students(),
        bank(),
        FakeRenderer::new(),
        FakeCompiler::new(),
    );
    let pdf_dir = orchestrator.pdf_dir();
    collect(orchestrator).await;

    for student in students() {
        let base = filename_base(&template(), &student);
        let body = std::fs::read_to_string(pdf_dir.join(format!("{}.pdf", base))).expect("pdf");
        let ids: Vec<&str> = body
            .lines()
            .skip(1)
            .filter_map(|l| l.split(':').nth(1))
            .collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(&ids[..2], &["Q1", "Q2"]);
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 4);
    }
}

#[tokio::test]
async fn test_seeded_runs_select_the_same_questions() {
    let out = TempDir::new().expect("tempdir");

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let orchestrator = orchestrator(
            out.path(),
            students(),
            bank(),
            FakeRenderer::new(),
            FakeCompiler::new(),
        )
        .with_seed(1234);
        let pdf_dir = orchestrator.pdf_dir();
        collect(orchestrator).await;

        let base = filename_base(&template(), &students()[1]);
        bodies.push(std::fs::read_to_string(pdf_dir.join(format!("{}.pdf", base))).expect("pdf"));
    }

    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn test_builtin_layout_with_logo() {
    let out = TempDir::new().expect("tempdir");
    let logo_dir = TempDir::new().expect("tempdir");
    let logo = logo_dir.path().join("school.png");
    std::fs::write(&logo, b"png").expect("write logo");

    let run = GenerationRun::create(out.path()).expect("run");
    let orchestrator = BatchOrchestrator::new(
        run,
        template().with_logo("school.png"),
        vec![Student::new("Ana Souza", "1")],
        bank(),
        Arc::new(LatexRenderer::new().expect("layout")),
        Arc::new(FakeCompiler::new()),
    )
    .with_logo_source(&logo);
    let run_dir = orchestrator.run_dir().to_path_buf();

    let events = collect(orchestrator).await;
    assert!(events.last().expect("complete").success);

    assert!(run_dir.join("tex").join("assets").join("school.png").is_file());

    let tex = std::fs::read_to_string(run_dir.join("tex").join("midterm_ana_souza_1.tex"))
        .expect("tex source");
    assert!(tex.contains("school.png"));
    assert!(tex.contains("Ana Souza"));
    assert!(tex.contains("Midterm Exam"));
}

#[tokio::test]
async fn test_question_images_are_relocated_into_run() {
    let out = TempDir::new().expect("tempdir");
    let images = TempDir::new().expect("tempdir");
    let triangle = images.path().join("triangle.png");
    std::fs::write(&triangle, b"png").expect("write image");

    let mut questions = bank().questions().to_vec();
    questions[0] = questions[0]
        .clone()
        .with_image(QuestionImage::new(triangle.display().to_string()));
    questions[1] = questions[1]
        .clone()
        .with_image(QuestionImage::new("/nonexistent/graph.png"));

    let renderer = ImageRecorder::default();
    let seen = Arc::clone(&renderer.seen);
    let orchestrator = orchestrator(
        out.path(),
        vec![Student::new("Ana Souza", "1")],
        QuestionBank::new(questions),
        renderer,
        FakeCompiler::new(),
    );
    let run_dir = orchestrator.run_dir().to_path_buf();

    let events = collect(orchestrator).await;
    assert!(events.last().expect("complete").success);

    let copied = run_dir.join("tex").join("assets").join("triangle.png");
    assert_eq!(std::fs::read(&copied).expect("relocated image"), b"png");
    assert!(triangle.is_file());

    let seen = seen.lock().expect("lock").clone();
    assert_eq!(
        seen,
        vec![
            ("Q1".to_string(), "triangle.png".to_string()),
            ("Q2".to_string(), "/nonexistent/graph.png".to_string()),
        ]
    );
}

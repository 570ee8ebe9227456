use chrono::Utc;
use clap::{Parser, Subcommand};
use onboard_core::certificate::{certificate_data, quiz_completion_percent, quiz_stats};
use onboard_core::gating::{
    completed_lessons_in_module, dashboard_stats, is_lesson_locked, is_module_locked,
    module_progress_percent, module_status, next_incomplete_lesson,
};
use onboard_core::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "onboard")]
#[command(about = "Corporate onboarding training tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Learner whose progress to use
    #[arg(long, global = true)]
    user: Option<String>,

    /// Load course content from this catalog document
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show overall progress and the next lesson (default)
    Status,

    /// List modules with their status
    Modules,

    /// Show the lessons of one module
    Module { module_id: String },

    /// Read a lesson
    Lesson { module_id: String, lesson_id: String },

    /// Mark a lesson as finished
    Complete { module_id: String, lesson_id: String },

    /// Take the quiz of a module
    Quiz {
        module_id: String,

        /// Scripted answers (1-4, comma separated) instead of prompting
        #[arg(long, value_delimiter = ',')]
        answers: Option<Vec<usize>>,
    },

    /// Check certificate requirements
    Certificate {
        /// Issue the certificate and print its data as JSON
        #[arg(long)]
        issue: bool,
    },

    /// Search the glossary
    Glossary { query: Option<String> },

    /// Export a per-module progress report as CSV
    Report {
        #[arg(long)]
        out: PathBuf,
    },

    /// Erase all progress for the learner
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

/// Everything a command needs, resolved once at startup
struct App {
    catalog: Catalog,
    store: FileProgressStore,
    user_id: String,
    config: Config,
}

impl App {
    fn progress(&self) -> Result<UserProgress> {
        self.store.get(&self.user_id)
    }

    /// Apply a change to the learner's progress and persist it
    fn save<F>(&self, f: F) -> Result<UserProgress>
    where
        F: FnOnce(&mut UserProgress) -> Result<()>,
    {
        self.store.update(&self.user_id, f).map_err(|e| {
            if matches!(e, Error::Io(_) | Error::Json(_) | Error::Storage(_)) {
                tracing::error!("Saving progress for {} failed: {}", self.user_id, e);
                eprintln!("Could not save progress: {}", e);
            }
            e
        })
    }
}

fn main() -> Result<()> {
    // Initialize logging
    onboard_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    let user_id = cli
        .user
        .unwrap_or_else(|| config.learner.user_id.clone());

    // Catalog problems are fatal before anything else runs
    let catalog = match cli.catalog.as_ref().or(config.catalog.path.as_ref()) {
        Some(path) => {
            tracing::info!("Using catalog from {:?}", path);
            Catalog::from_path(path)?
        }
        None => {
            tracing::debug!("Using embedded catalog");
            default_catalog()?.clone()
        }
    };
    tracing::debug!(
        "Learner {} with progress under {:?}",
        user_id,
        data_dir.join("progress")
    );

    let app = App {
        catalog,
        store: FileProgressStore::new(data_dir.join("progress")),
        user_id,
        config,
    };

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => cmd_status(&app),
        Commands::Modules => cmd_modules(&app),
        Commands::Module { module_id } => cmd_module(&app, &module_id),
        Commands::Lesson {
            module_id,
            lesson_id,
        } => cmd_lesson(&app, &module_id, &lesson_id),
        Commands::Complete {
            module_id,
            lesson_id,
        } => cmd_complete(&app, &module_id, &lesson_id),
        Commands::Quiz { module_id, answers } => cmd_quiz(&app, &module_id, answers),
        Commands::Certificate { issue } => cmd_certificate(&app, issue),
        Commands::Glossary { query } => cmd_glossary(&app, query.as_deref().unwrap_or("")),
        Commands::Report { out } => cmd_report(&app, out),
        Commands::Reset { yes } => cmd_reset(&app, yes),
    }
}

fn cmd_status(app: &App) -> Result<()> {
    let progress = app.progress()?;
    let stats = dashboard_stats(&app.catalog, &progress);

    println!("Overall progress: {}%", stats.overall_percent);
    println!(
        "  Modules: {} of {}",
        stats.modules_completed, stats.total_modules
    );
    println!(
        "  Lessons: {} of {}",
        stats.lessons_completed, stats.total_lessons
    );
    println!("  Study time: {}", format_minutes(stats.study_minutes));
    println!("  Experience: {} xp", progress.experience);
    println!(
        "  Quizzes: {}% attempted",
        quiz_completion_percent(&app.catalog, &progress)
    );

    match next_incomplete_lesson(&app.catalog, &progress) {
        Some(next) => {
            let title = app
                .catalog
                .lesson_by_id(&next.module_id, &next.lesson_id)
                .map_or("", |l| l.title.as_str());
            println!("\nNext lesson: {} / {} ({})", next.module_id, next.lesson_id, title);
        }
        None => println!("\nNo lessons left to take."),
    }

    Ok(())
}

fn cmd_modules(app: &App) -> Result<()> {
    let progress = app.progress()?;

    for module in app.catalog.modules() {
        let status = module_status(&app.catalog, &progress, &module.id);
        println!(
            "{:>2}. [{}] {} - {} ({}%, {})",
            module.order,
            module.id,
            module.title,
            status.as_str(),
            module_progress_percent(&app.catalog, &progress, &module.id),
            format_minutes(module.duration_minutes)
        );
    }

    Ok(())
}

fn cmd_module(app: &App, module_id: &str) -> Result<()> {
    let Some(module) = app.catalog.module_by_id(module_id) else {
        println!("Module not found: {}", module_id);
        return Err(Error::NotFound(format!("module '{}'", module_id)));
    };
    let progress = app.progress()?;

    if is_module_locked(&app.catalog, &progress, module_id) {
        println!("Module '{}' is locked. Complete the previous module first.", module.title);
        return Ok(());
    }

    println!("{}", module.title);
    if !module.description.is_empty() {
        println!("{}", module.description);
    }
    println!(
        "{} of {} lessons complete\n",
        completed_lessons_in_module(&app.catalog, &progress, module_id),
        module.lessons.len()
    );

    for lesson in &module.lessons {
        let marker = if progress.completed_lesson_ids.contains(&lesson.id) {
            "done"
        } else if is_lesson_locked(&app.catalog, &progress, module_id, &lesson.id) {
            "locked"
        } else {
            "open"
        };
        println!(
            "  [{}] {} {} ({})",
            marker,
            lesson.id,
            lesson.title,
            format_minutes(lesson.duration_minutes)
        );
    }

    if let Some(quiz) = app.catalog.quiz_by_module_id(module_id) {
        match progress.quiz_results.get(&quiz.id) {
            Some(result) => println!(
                "\nQuiz: {}% ({}/{} correct)",
                result.percent, result.correct_count, result.total_count
            ),
            None => println!("\nQuiz: not taken ({} questions)", quiz.questions.len()),
        }
    }

    Ok(())
}

fn cmd_lesson(app: &App, module_id: &str, lesson_id: &str) -> Result<()> {
    let Some(lesson) = app.catalog.lesson_by_id(module_id, lesson_id) else {
        println!("Lesson not found: {} / {}", module_id, lesson_id);
        return Err(Error::NotFound(format!("lesson '{}'", lesson_id)));
    };

    let progress = app.progress()?;
    if is_module_locked(&app.catalog, &progress, module_id)
        || is_lesson_locked(&app.catalog, &progress, module_id, lesson_id)
    {
        println!("Lesson '{}' is locked.", lesson.title);
        return Ok(());
    }

    println!("{} ({})\n", lesson.title, format_minutes(lesson.duration_minutes));
    for block in &lesson.content {
        display_block(block);
    }

    app.save(|progress| {
        progress.set_current_position(module_id, lesson_id, Utc::now());
        Ok(())
    })?;

    Ok(())
}

fn display_block(block: &ContentBlock) {
    match block {
        ContentBlock::Text { body } => println!("{}\n", body),
        ContentBlock::Highlight { body, .. } => println!("  > {}\n", body),
        ContentBlock::Important { body } => println!("  ! {}\n", body),
        ContentBlock::Definition { term, explanation } => {
            println!("  {}: {}\n", term, explanation)
        }
        ContentBlock::List { title, items } => {
            println!("{}", title);
            for item in items {
                println!("  - {}", item);
            }
            println!();
        }
        ContentBlock::Example { title, body } => println!("  Example - {}: {}\n", title, body),
    }
}

fn cmd_complete(app: &App, module_id: &str, lesson_id: &str) -> Result<()> {
    let mut outcome = None;
    let progress = app.save(|progress| {
        outcome = Some(progress.finish_lesson(
            &app.config.progress,
            &app.catalog,
            module_id,
            lesson_id,
            Utc::now(),
        )?);
        Ok(())
    })?;

    let Some(outcome) = outcome else {
        return Ok(());
    };

    if outcome.lesson_newly_completed {
        println!("✓ Lesson completed!");
    } else {
        println!("Lesson already completed (review).");
    }
    if outcome.module_completed {
        println!("✓ Module {} completed!", module_id);
    }
    println!(
        "  Module progress: {}%",
        module_progress_percent(&app.catalog, &progress, module_id)
    );
    if let Some(next) = outcome.next {
        println!("  Next: {} / {}", next.module_id, next.lesson_id);
    }

    Ok(())
}

fn cmd_quiz(app: &App, module_id: &str, answers: Option<Vec<usize>>) -> Result<()> {
    let Some(quiz) = app.catalog.quiz_by_module_id(module_id) else {
        println!("Quiz not found for module: {}", module_id);
        return Err(Error::NotFound(format!("quiz for module '{}'", module_id)));
    };

    let progress = app.progress()?;
    if is_module_locked(&app.catalog, &progress, module_id) {
        println!("Module is locked. Complete the previous module first.");
        return Ok(());
    }
    if let Some(previous) = progress.quiz_results.get(&quiz.id) {
        println!(
            "Previous result: {}% ({}/{})\n",
            previous.percent, previous.correct_count, previous.total_count
        );
    }

    let mut scripted = answers.map(|a| a.into_iter());
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    let mut session = QuizSession::new(quiz, app.config.quiz.clone());
    let mut shown = None;
    let result = loop {
        if let SessionState::Presenting { question_index, .. } = *session.state() {
            if shown != Some(question_index) {
                if let Some(question) = session.current_question() {
                    println!("Question {} of {}", question_index + 1, quiz.questions.len());
                    display_question(question);
                }
                shown = Some(question_index);
            }
        }

        if matches!(session.state(), SessionState::Answered { .. })
            || quiz.questions.is_empty()
        {
            if let Some(result) = session.advance(Utc::now())? {
                break result;
            }
            continue;
        }

        let choice = match scripted.as_mut() {
            Some(script) => script
                .next()
                .ok_or_else(|| Error::Quiz("ran out of scripted answers".into()))?,
            None => {
                print!("> ");
                io::stdout().flush()?;
                match lines.next() {
                    Some(line) => match line?.trim().parse::<usize>() {
                        Ok(n) => n,
                        Err(_) => {
                            println!("Enter a number between 1 and 4.");
                            continue;
                        }
                    },
                    None => return Err(Error::Quiz("input closed before quiz finished".into())),
                }
            }
        };

        let Some(index) = choice.checked_sub(1) else {
            println!("Enter a number between 1 and 4.");
            continue;
        };

        match session.select(index) {
            Ok(Selection::Correct { explanation }) => {
                println!("✓ Correct! {}\n", explanation);
            }
            Ok(Selection::Retry { attempts_left }) => {
                println!("✗ Not quite. {} attempt(s) left.", attempts_left);
            }
            Ok(Selection::Exhausted {
                correct_option_index,
                explanation,
            }) => {
                println!(
                    "✗ Out of attempts. The answer was {}. {}\n",
                    correct_option_index + 1,
                    explanation
                );
            }
            Err(Error::Quiz(msg)) if scripted.is_none() => {
                tracing::debug!("Rejected selection {}: {}", choice, msg);
                println!("Enter a number between 1 and 4.");
            }
            Err(e) => return Err(e),
        }
    };

    app.save(|progress| {
        progress.record_quiz_result(result.clone());
        Ok(())
    })?;

    let verdict = if app.config.quiz.passed(&result) {
        "Passed"
    } else {
        "Keep studying"
    };
    println!(
        "Quiz finished: {}/{} correct ({}%) - {}",
        result.correct_count, result.total_count, result.percent, verdict
    );

    Ok(())
}

fn display_question(question: &Question) {
    println!("{}", question.prompt);
    for (i, option) in question.options.iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
}

fn cmd_certificate(app: &App, issue: bool) -> Result<()> {
    let progress = app.progress()?;
    let reqs = verify_certificate_requirements(&app.catalog, &progress);

    println!(
        "Lessons: {}/{}",
        reqs.lessons_completed, reqs.total_lessons
    );
    println!(
        "Quizzes: {}/{}",
        reqs.quizzes_completed, reqs.total_quizzes
    );
    println!("Average quiz score: {}%", reqs.average_quiz_percent);

    let stats = quiz_stats(&app.catalog, &progress);
    println!(
        "Questions answered correctly: {}/{}",
        stats.correct_answers, stats.total_questions
    );

    if !reqs.can_issue {
        println!("Certificate requirements not met yet.");
        return Ok(());
    }
    println!("Certificate requirements met.");

    if !issue {
        return Ok(());
    }

    let progress = app.save(|progress| {
        progress.earn_certificate(Utc::now());
        Ok(())
    })?;

    let profile = app.config.learner.profile(&app.user_id);
    let data = certificate_data(&app.catalog, &progress, &profile)?;
    println!("{}", serde_json::to_string_pretty(&data)?);

    Ok(())
}

fn cmd_glossary(app: &App, query: &str) -> Result<()> {
    let terms = app.catalog.search_glossary(query);
    if terms.is_empty() {
        println!("No glossary terms match '{}'.", query);
        return Ok(());
    }

    for term in terms {
        match &term.acronym {
            Some(acronym) => println!("{} ({})", term.term, acronym),
            None => println!("{}", term.term),
        }
        println!("  {}", term.definition);
        if let Some(example) = &term.example {
            println!("  e.g. {}", example);
        }
    }

    Ok(())
}

fn cmd_report(app: &App, out: PathBuf) -> Result<()> {
    let progress = app.progress()?;
    let rows = onboard_core::report::export_module_report(&app.catalog, &progress, &out)?;

    println!("✓ Wrote {} modules to {}", rows, out.display());
    Ok(())
}

fn cmd_reset(app: &App, yes: bool) -> Result<()> {
    if !yes {
        println!("This erases all progress for '{}'. Re-run with --yes to confirm.", app.user_id);
        return Ok(());
    }

    app.save(|progress| {
        progress.reset();
        Ok(())
    })?;

    println!("✓ Progress reset for '{}'.", app.user_id);
    Ok(())
}

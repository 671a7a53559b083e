//! Pathtrack CLI - learning path progress tracking.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pathtrack_core::{
    Category, Curriculum, CurriculumDraft, CurriculumId, Difficulty, LearnerId, ModuleDraft, ModuleId,
};
use pathtrack_progress::{LedgerConfig, ProgressApi, ProgressReport, ProgressService};
use pathtrack_storage::JsonStorage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pathtrack")]
#[command(about = "Learning path progress tracking", long_about = None)]
struct Cli {
    /// Storage directory
    #[arg(long, global = true, default_value = ".pathtrack")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage learning paths
    #[command(subcommand)]
    Curriculum(CurriculumCommand),
    /// Print a fresh learner ID
    NewLearner,
    /// Enroll a learner in a learning path
    Enroll {
        learner: LearnerId,
        curriculum: CurriculumId,
    },
    /// Remove a learner from a learning path
    Unenroll {
        learner: LearnerId,
        curriculum: CurriculumId,
        /// Also delete the learner's progress
        #[arg(long)]
        purge: bool,
    },
    /// Mark a module complete
    Complete {
        learner: LearnerId,
        curriculum: CurriculumId,
        module: ModuleId,
    },
    /// Pause a learner's progress
    Pause {
        learner: LearnerId,
        curriculum: CurriculumId,
    },
    /// Clear a learner's pause
    Resume {
        learner: LearnerId,
        curriculum: CurriculumId,
    },
    /// Move a learner's resume pointer
    Goto {
        learner: LearnerId,
        curriculum: CurriculumId,
        index: usize,
    },
    /// Show a learner's progress
    Progress {
        learner: LearnerId,
        curriculum: CurriculumId,
    },
}

#[derive(Subcommand)]
enum CurriculumCommand {
    /// Create a learning path
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "other", value_parser = parse_category)]
        category: Category,
        #[arg(long, default_value = "beginner", value_parser = parse_difficulty)]
        difficulty: Difficulty,
        /// Module as TITLE:MINUTES, repeatable
        #[arg(long = "module", value_parser = parse_module)]
        modules: Vec<ModuleDraft>,
    },
    /// List learning paths
    List,
    /// Show a learning path and its modules
    Show { id: CurriculumId },
    /// Add a module
    AddModule {
        id: CurriculumId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        minutes: u32,
        /// Insert at this position instead of appending
        #[arg(long)]
        position: Option<usize>,
    },
    /// Remove a module
    RemoveModule { id: CurriculumId, module: ModuleId },
    /// Move a module to a new position
    MoveModule {
        id: CurriculumId,
        module: ModuleId,
        position: usize,
    },
    /// List learners of a learning path with their progress
    Learners { id: CurriculumId },
    /// Delete a learning path and all progress in it
    Delete { id: CurriculumId },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli.data_dir).await?;
    let storage = JsonStorage::new(&cli.data_dir).await?;
    let service = ProgressService::new(Arc::new(storage)).with_config(config);

    match cli.command {
        Commands::Curriculum(cmd) => run_curriculum(&service, cmd).await?,
        Commands::NewLearner => println!("{}", LearnerId::new()),
        Commands::Enroll { learner, curriculum } => {
            let progress = service.enroll(learner, curriculum).await?;
            println!("Enrolled: progress {}", progress.id);
        }
        Commands::Unenroll { learner, curriculum, purge } => {
            let was_enrolled = service.unenroll(learner, curriculum).await?;
            if !was_enrolled {
                println!("Learner was not enrolled");
            }
            if purge && service.purge_progress(learner, curriculum).await? {
                println!("Progress deleted");
            }
        }
        Commands::Complete { learner, curriculum, module } => {
            let progress = service
                .complete_module(learner, curriculum, module, chrono::Utc::now())
                .await?;
            println!("{}% ({})", progress.progress_percentage(), progress.status());
        }
        Commands::Pause { learner, curriculum } => {
            let progress = service.set_paused(learner, curriculum, true).await?;
            println!("Status: {}", progress.status());
        }
        Commands::Resume { learner, curriculum } => {
            let progress = service.set_paused(learner, curriculum, false).await?;
            println!("Status: {}", progress.status());
        }
        Commands::Goto { learner, curriculum, index } => {
            let progress = service.set_current_module(learner, curriculum, index).await?;
            println!("Current module: {}", progress.current_module());
        }
        Commands::Progress { learner, curriculum } => {
            let report = service.report(learner, curriculum).await?;
            let path = service.curricula().get(curriculum).await?;
            print_report(&path, &report);
        }
    }

    Ok(())
}

async fn run_curriculum(service: &ProgressService, cmd: CurriculumCommand) -> Result<()> {
    let store = service.curricula();
    match cmd {
        CurriculumCommand::Create { title, description, category, difficulty, modules } => {
            let curriculum = store
                .create(CurriculumDraft {
                    title,
                    description,
                    category,
                    difficulty,
                    modules,
                    ..Default::default()
                })
                .await?;
            println!("Created learning path: {} - {}", curriculum.id, curriculum.title);
        }
        CurriculumCommand::List => {
            let all = store.list().await?;
            println!("Learning paths ({})", all.len());
            for c in all {
                println!(
                    "  {} | {} | {:?} | {} modules, {} min | {} enrolled",
                    c.id,
                    c.category.as_str(),
                    c.difficulty,
                    c.module_count(),
                    c.total_duration(),
                    c.enrolled_learners().len(),
                );
            }
        }
        CurriculumCommand::Show { id } => print_curriculum(&store.get(id).await?),
        CurriculumCommand::AddModule { id, title, minutes, position } => {
            let draft = ModuleDraft::new(title, minutes);
            let (_, module) = match position {
                Some(position) => store.insert_module(id, draft, position).await?,
                None => store.add_module(id, draft).await?,
            };
            service.notify_modules_changed(id).await;
            println!("Added module: {}", module);
        }
        CurriculumCommand::RemoveModule { id, module } => {
            let (_, removed) = store.remove_module(id, module).await?;
            service.notify_modules_changed(id).await;
            println!("Removed module: {} - {}", removed.id, removed.title);
        }
        CurriculumCommand::MoveModule { id, module, position } => {
            store.move_module(id, module, position).await?;
            service.notify_modules_changed(id).await;
            println!("Moved module {} to position {}", module, position);
        }
        CurriculumCommand::Learners { id } => {
            let entries = service.curriculum_progress(id).await?;
            println!("Learners ({})", entries.len());
            for p in entries {
                println!(
                    "  {} | {}% | {} | last accessed {}",
                    p.learner_id,
                    p.progress_percentage(),
                    p.status(),
                    p.last_accessed
                );
            }
        }
        CurriculumCommand::Delete { id } => {
            store.delete(id).await?;
            println!("Deleted learning path {}", id);
        }
    }
    Ok(())
}

async fn load_config(data_dir: &Path) -> Result<LedgerConfig> {
    let path = data_dir.join("config.json");
    match tokio::fs::read_to_string(&path).await {
        Ok(json) => {
            info!("Loading config from {}", path.display());
            LedgerConfig::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LedgerConfig::default()),
        Err(e) => Err(e).with_context(|| format!("Reading {}", path.display())),
    }
}

fn print_curriculum(c: &Curriculum) {
    println!("Learning path: {}", c.id);
    println!("  Title: {}", c.title);
    println!("  Description: {}", c.description);
    println!("  Category: {}", c.category.as_str());
    println!("  Difficulty: {:?}", c.difficulty);
    println!("  Total duration: {} min", c.total_duration());
    println!("  Enrolled: {}", c.enrolled_learners().len());
    println!("  Modules:");
    for (i, m) in c.modules().iter().enumerate() {
        println!("    {}. {} | {} | {} min", i, m.id, m.title, m.duration_minutes);
    }
}

fn print_report(c: &Curriculum, report: &ProgressReport) {
    let p = &report.progress;
    let r = &report.reconciliation;
    println!("Progress: {}", p.id);
    println!("  Learning path: {}", c.title);
    println!("  Status: {}", p.status());
    println!("  Completed: {}/{} ({}%)", r.valid_completed, r.total_modules, p.progress_percentage());
    if let Some(current) = c.modules().get(p.current_module()) {
        println!("  Current module: {}. {}", p.current_module(), current.title);
    }
    println!("  Remaining: {} min", report.remaining_minutes);
    if !r.stale_completions.is_empty() {
        println!("  Completions of removed modules: {}", r.stale_completions.len());
    }
    println!("  Last accessed: {}", p.last_accessed);
}

fn parse_category(s: &str) -> std::result::Result<Category, String> {
    Category::parse(s).ok_or_else(|| format!("unknown category '{}'", s))
}

fn parse_difficulty(s: &str) -> std::result::Result<Difficulty, String> {
    Difficulty::parse(s).ok_or_else(|| format!("unknown difficulty '{}'", s))
}

fn parse_module(s: &str) -> std::result::Result<ModuleDraft, String> {
    let (title, minutes) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected TITLE:MINUTES, got '{}'", s))?;
    let minutes = minutes
        .trim()
        .parse()
        .map_err(|_| format!("invalid minutes in '{}'", s))?;
    Ok(ModuleDraft::new(title.trim(), minutes))
}

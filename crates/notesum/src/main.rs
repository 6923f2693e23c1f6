use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use serde::Serialize;

use notesum::logging::init_logging;
use notesum::service::RetryPolicy;
use notesum::{
    load_config, Config, Database, DocumentKind, DocumentStorage, JobQueue, JobStore, JobView,
    NotesumError, PipelineConfig, SqliteQueue, SubmissionService, Upload, WorkerPool,
};

#[derive(Parser)]
#[command(name = "notesum")]
#[command(about = "Summarize PDF and text documents through a durable job queue")]
#[command(version)]
struct Cli {
    /// Config file (JSON). Built-in defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the worker pool until interrupted
    Worker {
        /// Number of workers (overrides config)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Submit a document and print its job id
    Submit {
        /// Principal submitting the document
        #[arg(long)]
        owner: String,
        /// Document to summarize
        file: PathBuf,
        /// Document kind; guessed from the name and content when omitted
        #[arg(long)]
        kind: Option<DocumentKind>,
    },

    /// Show one job
    Status {
        #[arg(long)]
        owner: String,
        job_id: String,
    },

    /// List an owner's jobs, newest first
    List {
        #[arg(long)]
        owner: String,
    },
}

#[derive(Serialize)]
struct Accepted<'a> {
    job_id: &'a str,
    status: &'static str,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config.as_deref().map(load_config).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: Config) -> notesum::Result<()> {
    let db = Database::open(&config.database_path)?;
    let store = JobStore::new(db.clone());
    let sqlite_queue = Arc::new(SqliteQueue::from_config(db, &config.queue));
    let queue: Arc<dyn JobQueue> = sqlite_queue.clone();

    match command {
        Commands::Worker { workers } => {
            sqlite_queue.requeue_orphans()?;
            let worker_count = workers.unwrap_or(config.worker_count);
            let pipeline_config = Arc::new(PipelineConfig::from_config(&config));
            let pool = WorkerPool::start(pipeline_config, store, queue, worker_count)?;

            let signal = pool.shutdown_signal();
            if let Err(e) = ctrlc::set_handler(move || {
                info!("Interrupt received, finishing in-flight jobs");
                signal.trigger();
            }) {
                warn!("Could not install Ctrl-C handler: {}", e);
            }

            pool.wait();
        }

        Commands::Submit { owner, file, kind } => {
            let service = submission_service(&config, store, queue);
            let upload = read_upload(&file, kind)?;
            let job_id = service.submit(upload, &owner)?;
            print_json(&Accepted {
                job_id: &job_id,
                status: "accepted",
            });
        }

        Commands::Status { owner, job_id } => {
            let service = submission_service(&config, store, queue);
            let job = service.get_status(&job_id, &owner)?;
            print_json(&JobView::from(&job));
        }

        Commands::List { owner } => {
            let service = submission_service(&config, store, queue);
            print_json(&service.list_jobs(&owner)?);
        }
    }

    Ok(())
}

fn submission_service(
    config: &Config,
    store: JobStore,
    queue: Arc<dyn JobQueue>,
) -> SubmissionService {
    SubmissionService::new(
        store,
        queue,
        DocumentStorage::new(&config.documents_directory),
        RetryPolicy::from_config(&config.queue),
    )
}

fn read_upload(path: &Path, kind: Option<DocumentKind>) -> notesum::Result<Upload> {
    let bytes = std::fs::read(path).map_err(|e| NotesumError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut upload = Upload::new(bytes);
    if let Some(name) = path.file_name() {
        upload = upload.with_filename(name.to_string_lossy());
    }
    if let Some(kind) = kind {
        upload = upload.with_kind(kind);
    }
    Ok(upload)
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize output: {}", e),
    }
}

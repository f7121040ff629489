//! cms-sync - CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::{fmt, EnvFilter};

use cms_sync::{
    api::{Attachment, ContentKind, ContentRef, Course, MoodleApi},
    cli::{Args, Command},
    config::{validate_config, Config},
    download::{
        DownloadFacility, DownloadFinished, FileManager, HttpDownloadFacility, SystemLauncher,
    },
    error::{exit_codes, Error, Result},
    fs::{sanitize_filename, Storage},
    notify::{ConsoleSink, NotificationEmitter},
    output::{
        create_spinner, print_banner, print_config_summary, print_error, print_info,
        print_run_summary, print_success, print_warning,
    },
    sync::{
        ConfigSession, JsonCourseStore, LocalStore, PeriodicScheduler, RunEnd, Scheduler, Session,
        SyncEngine,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            if e.is_isolated() {
                print_warning(&format!("{}", e));
            } else {
                print_error(&format!("{}", e));
            }
            let code = match e {
                Error::Config(_)
                | Error::ConfigValidation { .. }
                | Error::MissingConfig(_)
                | Error::TomlParse(_) => exit_codes::CONFIG_ERROR,
                Error::Authentication(_)
                | Error::Api(_)
                | Error::Http(_)
                | Error::SessionExpired
                | Error::TransientFetch(_)
                | Error::CourseFetch { .. }
                | Error::CourseNotFound(_) => exit_codes::API_ERROR,
                Error::DownloadEnqueue(_) | Error::Download(_) => exit_codes::DOWNLOAD_ERROR,
                Error::FileNotFound(_)
                | Error::NoViewerApp(_)
                | Error::NoShareHandler(_)
                | Error::InvalidFilename(_)
                | Error::Storage(_)
                | Error::Index(_)
                | Error::Io(_) => exit_codes::FILE_ERROR,
                _ => exit_codes::UNEXPECTED_ERROR,
            };
            ExitCode::from(code as u8)
        }
    }
}

async fn run() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    print_banner();

    // Load configuration
    let config_path = args.config.clone();
    let mut config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        print_warning(&format!(
            "Configuration file not found: {}",
            config_path.display()
        ));
        print_info("Using default configuration with CLI arguments");
        Config::default()
    };
    let persist_path = config_path.exists().then(|| config_path.clone());

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    validate_config(&config)?;

    print_config_summary(
        &config.account.site_url,
        &config.storage.backend.to_string(),
        &config.download_root().display().to_string(),
    );

    let logged_in = !config.account.token.is_empty();
    if args.command.needs_login() && !logged_in {
        return Err(Error::MissingConfig(
            "account.token (or CMS_TOKEN) is required for this command".into(),
        ));
    }

    // Course lists are per user; learn the id once
    if logged_in && config.account.user_id == 0 {
        let api = MoodleApi::new(&config.account.site_url, config.account.token.clone(), 0)?;
        let info = api.get_site_info().await?;
        print_info(&format!("Logged in as: {}", info.full_name));
        config.update_user_id(info.user_id, persist_path.as_deref())?;
    }

    let api = Arc::new(MoodleApi::new(
        &config.account.site_url,
        config.account.token.clone(),
        config.account.user_id,
    )?);
    let session = Arc::new(ConfigSession::new(
        config.clone(),
        persist_path,
        logged_in.then(|| api.clone()),
    ));
    let store = Arc::new(JsonCourseStore::open(&config.state_dir())?);

    match args.command {
        Command::Sync => {
            let scheduler = Arc::new(PeriodicScheduler::from_config(&config.sync));
            let engine = build_engine(&config, api, store, session, scheduler)?;

            let spinner = create_spinner("Syncing courses...");
            let outcome = engine.run_once().await;
            spinner.finish_and_clear();
            print_run_summary(&outcome);

            match outcome.end {
                RunEnd::NotLoggedIn => Err(Error::SessionExpired),
                RunEnd::ListFetchFailed | RunEnd::StoreFailed => Err(Error::TransientFetch(
                    "course list was not synced, try again later".into(),
                )),
                _ => Ok(()),
            }
        }
        Command::Daemon => {
            let scheduler = Arc::new(PeriodicScheduler::from_config(&config.sync));
            let engine = build_engine(&config, api, store, session.clone(), scheduler.clone())?;

            let stopper = scheduler.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    print_info("Stopping after the current run...");
                    stopper.cancel_all();
                }
            });

            print_info(&format!(
                "Syncing every {} minutes",
                config.sync.interval_secs / 60
            ));
            let runs = scheduler.run_with(&engine, print_run_summary).await;
            print_info(&format!("Stopped after {} sync run(s)", runs));

            if !session.is_logged_in() {
                return Err(Error::SessionExpired);
            }
            Ok(())
        }
        Command::Courses => {
            let courses = api.get_course_list().await?;
            if courses.is_empty() {
                print_info("Not enrolled in any course");
            }
            for course in &courses {
                println!("  {:>6}  {:<16} {}", course.id, course.short_name, course.full_name);
            }
            Ok(())
        }
        Command::List { course_id } => {
            let course = find_course(course_id, store.as_ref(), &api, logged_in).await?;
            let (manager, _) = file_manager(&config, &course, session)?;

            let names = manager.list_downloaded()?;
            if names.is_empty() {
                print_info(&format!("No downloaded files for {}", course.name()));
            }
            for name in names {
                println!("  {}", name);
            }
            Ok(())
        }
        Command::Download {
            course_id,
            file_name,
            url,
            description,
            attachment,
            timeout_secs,
        } => {
            let course = find_course(course_id, store.as_ref(), &api, logged_in).await?;
            let (manager, facility) = file_manager(&config, &course, session)?;
            manager.set_callback(|name| print_success(&format!("Downloaded {}", name)));

            let expected = sanitize_filename(&file_name)?;
            let finished = facility.subscribe();
            let description = description.unwrap_or_default();

            match url {
                Some(url) if attachment => {
                    let attachment = Attachment {
                        file_name,
                        file_url: url,
                        mime_type: None,
                    };
                    manager.download_attachment(&attachment, &description)?;
                }
                Some(url) => {
                    manager.download(&ContentRef {
                        file_name,
                        url,
                        description,
                        kind: ContentKind::Module,
                    })?;
                }
                None if attachment => {
                    return Err(Error::MissingConfig(
                        "--url is required for attachment downloads".into(),
                    ));
                }
                None => {
                    let sections = api.get_course_contents(course.id).await?;
                    let (content, module) = sections
                        .iter()
                        .flat_map(|s| s.modules.iter())
                        .find_map(|m| {
                            m.contents
                                .iter()
                                .find(|c| c.file_name == file_name)
                                .map(|c| (c, m))
                        })
                        .ok_or_else(|| {
                            Error::FileNotFound(format!("{} in {}", file_name, course.name()))
                        })?;
                    manager.download_content(content, module)?;
                }
            }

            wait_for_download(
                &manager,
                finished,
                &expected,
                Duration::from_secs(timeout_secs),
            )
            .await
        }
        Command::Open {
            course_id,
            file_name,
        } => {
            let course = find_course(course_id, store.as_ref(), &api, logged_in).await?;
            let (manager, _) = file_manager(&config, &course, session)?;
            manager.open(&file_name)?;
            print_success(&format!("Opened {}", file_name));
            Ok(())
        }
        Command::Share {
            course_id,
            file_name,
        } => {
            let course = find_course(course_id, store.as_ref(), &api, logged_in).await?;
            let (manager, _) = file_manager(&config, &course, session)?;
            manager.share(&file_name)?;
            print_success(&format!("Shared {}", file_name));
            Ok(())
        }
        Command::Delete {
            course_id,
            file_name,
        } => {
            let course = find_course(course_id, store.as_ref(), &api, logged_in).await?;
            let (manager, _) = file_manager(&config, &course, session)?;
            if !manager.is_downloaded(&file_name) {
                print_warning(&format!("{} is not downloaded", file_name));
                return Ok(());
            }
            manager.delete(&file_name)?;
            print_success(&format!("Deleted {}", file_name));
            Ok(())
        }
    }
}

/// Wire the sync engine to the site, the snapshot store and console output.
fn build_engine(
    config: &Config,
    api: Arc<MoodleApi>,
    store: Arc<JsonCourseStore>,
    session: Arc<ConfigSession>,
    scheduler: Arc<PeriodicScheduler>,
) -> Result<SyncEngine> {
    let emitter = Arc::new(NotificationEmitter::new(
        Arc::new(ConsoleSink),
        session.clone(),
        &config.account.site_url,
    )?);
    Ok(SyncEngine::new(api, store, session, emitter, scheduler))
}

/// Build the file manager for one course on the configured backend.
fn file_manager(
    config: &Config,
    course: &Course,
    session: Arc<ConfigSession>,
) -> Result<(FileManager, Arc<HttpDownloadFacility>)> {
    let download_root = config.download_root();
    let storage = Storage::open(
        config.storage.backend,
        &download_root,
        &config.storage.root_folder,
    )?;
    let facility = Arc::new(HttpDownloadFacility::new(
        download_root,
        storage.index.clone(),
    )?);
    let manager = FileManager::new(
        &storage,
        course.name(),
        facility.clone(),
        Arc::new(SystemLauncher),
        session,
    );
    Ok((manager, facility))
}

/// Look a course up in the last snapshot, then on the site.
async fn find_course(
    course_id: u64,
    store: &dyn LocalStore,
    api: &MoodleApi,
    logged_in: bool,
) -> Result<Course> {
    if let Some(course) = store.courses()?.into_iter().find(|c| c.id == course_id) {
        return Ok(course);
    }

    if logged_in {
        if let Some(course) = api
            .get_course_list()
            .await?
            .into_iter()
            .find(|c| c.id == course_id)
        {
            return Ok(course);
        }
    }

    Err(Error::CourseNotFound(course_id))
}

/// Wait for the single queued job to end and report how it went.
async fn wait_for_download(
    manager: &FileManager,
    mut finished: broadcast::Receiver<DownloadFinished>,
    file_name: &str,
    timeout: Duration,
) -> Result<()> {
    let spinner = create_spinner(&format!("Downloading {}...", file_name));

    // Only one job was queued, so the first wake-up is ours
    let signal = tokio::time::timeout(timeout, finished.recv()).await;
    spinner.finish_and_clear();

    match signal {
        Err(_) => Err(Error::Download(format!(
            "{} did not finish within {}s",
            file_name,
            timeout.as_secs()
        ))),
        Ok(Err(RecvError::Closed)) => Err(Error::Download("download facility stopped".into())),
        Ok(Ok(_)) | Ok(Err(RecvError::Lagged(_))) => {
            let completed = manager.handle_download_finished();
            if completed.iter().any(|name| name == file_name) {
                Ok(())
            } else {
                Err(Error::Download(format!("{} could not be downloaded", file_name)))
            }
        }
    }
}

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clonectl::api::client::ApiClient;
use clonectl::api::types::{PreprocessRequest, SynthesisRequest, TrainRequest};
use clonectl::audio::scheduler::SchedulerConfig;
use clonectl::cli::{Cli, Commands, ConfigAction};
use clonectl::config::Config;
use clonectl::sink::ConsoleSink;
use clonectl::stream::session::{CancelHandle, SessionState, StreamSession, forward_progress};
use clonectl::workflow::WorkflowController;
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let client = ApiClient::new(&config.api.base_url);

    match cli.command {
        Commands::Check => {
            let ok = clonectl::diagnostics::check_environment(&client, &config).await;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Profiles => {
            let profiles = client.profiles().await?;
            if profiles.is_empty() {
                println!("No profiles on {}", client.base_url());
            } else {
                for profile in &profiles {
                    println!("{}", format_profile(profile));
                }
            }
        }
        Commands::Devices => {
            list_audio_devices()?;
        }
        Commands::Upload { profile, file } => {
            let pb = indicatif::ProgressBar::new_spinner();
            pb.set_message(format!("Uploading {}...", file.display()));
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            let response = client.upload(&profile, &file).await?;
            pb.finish_and_clear();
            println!(
                "Uploaded {} for profile '{}' ({})",
                response.filename, profile, response.saved_path
            );
        }
        Commands::Preprocess { profile, filename } => {
            let request = PreprocessRequest { profile, filename };
            let stream = client.preprocess(&request).await?;
            let mut sink = ConsoleSink::new(cli.quiet);
            forward_progress(stream, &mut sink).await?;
        }
        Commands::Train {
            profile,
            batch_size,
            epochs,
            max_len,
            no_auto_select,
            no_auto_tune,
            no_lexicon,
            thorough,
            no_wer,
            no_early_stop,
        } => {
            let request = TrainRequest {
                profile,
                batch_size,
                epochs,
                max_len,
                auto_select_epoch: !no_auto_select,
                auto_tune_profile: !no_auto_tune,
                auto_build_lexicon: !no_lexicon,
                select_thorough: thorough,
                select_use_wer: !no_wer,
                early_stop: !no_early_stop,
            };
            let stream = client.train(&request).await?;
            let mut sink = ConsoleSink::new(cli.quiet);
            forward_progress(stream, &mut sink).await?;
        }
        Commands::Speak {
            speaker,
            text,
            model_path,
            ref_wav,
            save,
        } => {
            let mut request = SynthesisRequest::new(&speaker, &text);
            request.model_path = model_path;
            request.ref_wav_path = ref_wav;
            run_speak(&config, &client, request, save, cli.quiet, cli.verbose).await?;
        }
        Commands::Run {
            profile,
            file,
            text,
        } => {
            run_workflow(&config, &client, &profile, &file, &text, cli.quiet, cli.verbose).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "clonectl",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load config from disk, then layer env and CLI overrides on top.
fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&path)?.with_env_overrides();
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(device) = &cli.device {
        config.audio.device = Some(device.clone());
    }
    Ok(config)
}

fn format_profile(profile: &clonectl::api::types::ProfileInfo) -> String {
    let status = if profile.best_checkpoint.is_some() || profile.latest_checkpoint.is_some() {
        "[trained]"
    } else if profile.processed_wavs > 0 {
        "[preprocessed]"
    } else if profile.has_data {
        "[uploaded]"
    } else {
        "[empty]"
    };
    let checkpoint = profile
        .best_checkpoint
        .as_deref()
        .or(profile.latest_checkpoint.as_deref())
        .unwrap_or("-");
    format!(
        "{:16} {:>3} raw  {:>4} wavs  {:24} {}",
        profile.name, profile.raw_files, profile.processed_wavs, checkpoint, status
    )
}

fn list_audio_devices() -> Result<()> {
    #[cfg(feature = "playback")]
    {
        let devices = clonectl::audio::output::list_output_devices()?;
        if devices.is_empty() {
            println!("No audio output devices found");
        } else {
            println!("Available audio output devices:");
            for device in devices {
                println!("  {}", device);
            }
        }
    }
    #[cfg(not(feature = "playback"))]
    println!("Built without playback support; use `speak --save <file>`");
    Ok(())
}

/// Wire Ctrl-C to a session cancel handle.
fn spawn_ctrl_c(cancel: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
}

/// Stream one synthesis request, playing it live or rendering to a file.
async fn run_speak(
    config: &Config,
    client: &ApiClient,
    request: SynthesisRequest,
    save: Option<PathBuf>,
    quiet: bool,
    verbose: u8,
) -> Result<()> {
    let scheduler = SchedulerConfig::from_audio_config(&config.audio);
    let cancel = CancelHandle::new();
    spawn_ctrl_c(cancel.clone());
    let mut session = StreamSession::with_cancel(scheduler, cancel);
    let mut sink = ConsoleSink::new(quiet);

    if let Some(path) = save {
        // Offline path: schedule into a detached mixer, then render the same
        // crossfaded output playback would have produced.
        let mixer = std::sync::Arc::new(std::sync::Mutex::new(clonectl::Mixer::new(
            clonectl::defaults::FALLBACK_SAMPLE_RATE,
        )));
        let byte_stream = client.stream(&request).await?;
        let outcome = session.run(byte_stream, &mixer, &mut sink).await;
        report_session(&session, quiet, verbose);
        outcome?;

        if session.state() == SessionState::Completed {
            let samples = lock_or_bail(&mixer)?.render_all();
            clonectl::audio::wav::write_mono_wav(
                &path,
                &samples,
                clonectl::defaults::FALLBACK_SAMPLE_RATE,
            )?;
            println!("Saved {}", path.display());
        }
        return Ok(());
    }

    #[cfg(feature = "playback")]
    {
        let mut audio = clonectl::audio::output::AudioOutput::new(config.audio.device.as_deref())?;
        audio.resume()?;
        let mixer = audio.mixer();

        let byte_stream = client.stream(&request).await?;
        let outcome = session.run(byte_stream, &mixer, &mut sink).await;

        if session.state() == SessionState::Completed {
            // Everything is scheduled; let the tail play out before teardown.
            audio.drain().await;
        }
        audio.close();

        report_session(&session, quiet, verbose);
        outcome?;
        Ok(())
    }
    #[cfg(not(feature = "playback"))]
    {
        anyhow::bail!("built without playback support; use --save <file>")
    }
}

/// Full workflow: upload → preprocess → train → generate.
async fn run_workflow(
    config: &Config,
    client: &ApiClient,
    profile: &str,
    file: &std::path::Path,
    text: &str,
    quiet: bool,
    verbose: u8,
) -> Result<()> {
    let mut controller = WorkflowController::new();
    let mut sink = ConsoleSink::new(quiet);

    eprintln!("{}", "[1/4] upload".bold());
    controller.upload(client, profile, file, &mut sink).await?;

    eprintln!("{}", "[2/4] preprocess".bold());
    controller.preprocess(client, &mut sink).await?;

    eprintln!("{}", "[3/4] train".bold());
    let request = TrainRequest::for_profile(profile);
    controller.train(client, request, &mut sink).await?;

    eprintln!("{}", "[4/4] generate".bold());
    let cancel = CancelHandle::new();
    spawn_ctrl_c(cancel.clone());
    let scheduler = SchedulerConfig::from_audio_config(&config.audio);

    #[cfg(feature = "playback")]
    {
        let mut audio = clonectl::audio::output::AudioOutput::new(config.audio.device.as_deref())?;
        audio.resume()?;
        let mixer = audio.mixer();
        let metrics = controller
            .generate(client, text, &mixer, scheduler, cancel, &mut sink)
            .await?;
        audio.drain().await;
        audio.close();
        if !quiet {
            metrics.print_summary();
        }
        let _ = verbose;
        Ok(())
    }
    #[cfg(not(feature = "playback"))]
    {
        let _ = (text, scheduler, cancel, verbose);
        anyhow::bail!("built without playback support; use `speak --save` for synthesis")
    }
}

fn report_session(session: &StreamSession, quiet: bool, verbose: u8) {
    match session.state() {
        SessionState::Cancelled => {
            // A user abort is an interruption, not a failure.
            eprintln!("Cancelled.");
        }
        SessionState::Completed => {
            if verbose > 0 {
                for chunk in &session.metrics().chunks {
                    eprintln!(
                        "  chunk {:>3}  {:.3}s  scheduled at {:.3}s",
                        chunk.index, chunk.duration_secs, chunk.start_secs
                    );
                }
            }
            if !quiet {
                session.metrics().print_summary();
            }
        }
        _ => {}
    }
}

fn lock_or_bail(
    mixer: &std::sync::Arc<std::sync::Mutex<clonectl::Mixer>>,
) -> Result<std::sync::MutexGuard<'_, clonectl::Mixer>> {
    mixer
        .lock()
        .map_err(|_| anyhow::anyhow!("mixer lock poisoned"))
}

fn handle_config_command(action: ConfigAction, config_path: Option<&std::path::Path>) -> Result<()> {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Get { key } => {
            let config = Config::load_or_default(&path)?;
            match config.get_value(&key) {
                Some(value) => println!("{}", value),
                None => {
                    eprintln!("{}", format!("Unknown or unset key: {}", key).red());
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_or_default(&path)?;
            config.set_value(&key, &value)?;
            config.save(&path)?;
            println!("{} = {}", key, value);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }
    Ok(())
}

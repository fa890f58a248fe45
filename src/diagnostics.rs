//! Environment checks for the `check` command.

use crate::api::client::ApiClient;
use crate::config::Config;
use owo_colors::OwoColorize;

fn report(ok: bool, label: &str, detail: &str) {
    if ok {
        println!("  {} {} {}", "✓".green(), label, detail);
    } else {
        println!("  {} {} {}", "✗".red(), label, detail);
    }
}

/// Probe the inference service and the local audio setup.
///
/// Returns true when everything required for `speak` is available.
pub async fn check_environment(client: &ApiClient, config: &Config) -> bool {
    println!("clonectl {} environment check", crate::version_string());
    println!();

    let mut all_ok = true;

    // Service liveness (GET /docs)
    match client.probe().await {
        Ok(()) => report(true, "service", client.base_url()),
        Err(e) => {
            report(false, "service", &format!("{} ({e})", client.base_url()));
            all_ok = false;
        }
    }

    // Profile inventory
    match client.profiles().await {
        Ok(profiles) => report(
            true,
            "profiles",
            &format!("{} known to the service", profiles.len()),
        ),
        Err(_) => {
            report(false, "profiles", "endpoint unavailable");
            all_ok = false;
        }
    }

    // Audio output
    #[cfg(feature = "playback")]
    {
        match crate::audio::output::list_output_devices() {
            Ok(devices) if !devices.is_empty() => {
                let detail = match &config.audio.device {
                    Some(name) if devices.iter().any(|d| d == name) => {
                        format!("{} (configured: {})", devices.len(), name)
                    }
                    Some(name) => {
                        all_ok = false;
                        format!("configured device '{}' not found", name)
                    }
                    None => format!("{} available", devices.len()),
                };
                report(
                    config.audio.device.is_none()
                        || devices.iter().any(|d| Some(d) == config.audio.device.as_ref()),
                    "audio output",
                    &detail,
                );
            }
            _ => {
                report(false, "audio output", "no output devices");
                all_ok = false;
            }
        }
    }
    #[cfg(not(feature = "playback"))]
    {
        let _ = config;
        report(true, "audio output", "disabled at build time (--save only)");
    }

    // Config file
    let path = Config::default_path();
    report(
        true,
        "config",
        &format!(
            "{} ({})",
            path.display(),
            if path.exists() { "present" } else { "defaults" }
        ),
    );

    println!();
    if all_ok {
        println!("All checks passed.");
    } else {
        println!("Some checks failed; see above.");
    }
    all_ok
}

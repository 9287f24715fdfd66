//! Entry point for the gridtop console. Parses args and runs the App.

use std::env;
use std::io::{self, Write};

use gridtop::api::DeviceClient;
use gridtop::app::App;
use gridtop::history::{FileHistoryRepository, HistoryRepository, MemoryHistoryRepository};
use gridtop::profiles::{ProfileEntry, ProfileRequest, ProfilesFile, ResolveProfile};

struct ParsedArgs {
    url: Option<String>,
    token: Option<String>,
    profile: Option<String>,
    save: bool,
    demo: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "gridtop".into());
    let mut url: Option<String> = None;
    let mut token: Option<String> = None;
    let mut profile: Option<String> = None;
    let mut save = false; // --save
    let mut demo = false; // --demo

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                return Err(format!(
                    "Usage: {prog} [--token SECRET|-t SECRET] [--profile NAME|-P NAME] [--save] [--demo] [http://HOST:PORT]"
                ));
            }
            "--token" | "-t" => {
                token = it.next();
            }
            "--profile" | "-P" => {
                profile = it.next();
            }
            "--save" => {
                save = true;
            }
            "--demo" => {
                demo = true;
            }
            _ if arg.starts_with("--token=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        token = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--profile=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        profile = Some(v.to_string());
                    }
                }
            }
            _ => {
                if url.is_none() {
                    url = Some(arg);
                } else {
                    return Err(format!(
                        "Unexpected argument. Usage: {prog} [--token SECRET|-t SECRET] [--profile NAME|-P NAME] [--save] [--demo] [http://HOST:PORT]"
                    ));
                }
            }
        }
    }
    Ok(ParsedArgs {
        url,
        token,
        profile,
        save,
        demo,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reuse the same parsing logic for testability
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    // Demo mode short-circuit (ignore other args except conflicting ones)
    if parsed.demo || matches!(parsed.profile.as_deref(), Some("demo")) {
        return run_demo_mode().await;
    }

    let profiles_file = ProfilesFile::load();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        token: parsed.token.clone(),
    };
    let resolved = req.resolve(&profiles_file);

    // Determine final connection parameters (and maybe mutated profiles to persist)
    let mut profiles_mut = profiles_file.clone();
    let (url, token): (String, Option<String>) = match resolved {
        ResolveProfile::Direct(u, t) => {
            // Possibly save if profile specified and --save or new entry
            if let Some(name) = parsed.profile.as_ref() {
                let entry = ProfileEntry {
                    url: u.clone(),
                    token: t.clone(),
                };
                match profiles_mut.profiles.get(name) {
                    None => {
                        // New profile: auto-save immediately
                        profiles_mut.profiles.insert(name.clone(), entry);
                        let _ = profiles_mut.save();
                    }
                    Some(existing) if *existing != entry => {
                        let overwrite = parsed.save
                            || prompt_yes_no(&format!("Overwrite existing profile '{name}'? [y/N]: "));
                        if overwrite {
                            profiles_mut.profiles.insert(name.clone(), entry);
                            let _ = profiles_mut.save();
                        }
                    }
                    Some(_) => {}
                }
            }
            (u, t)
        }
        ResolveProfile::Loaded(u, t) => (u, t),
        ResolveProfile::PromptSelect(mut names) => {
            // The built-in demo always rides along in the pick list
            if !names.iter().any(|n| n == "demo") {
                names.push("demo".into());
            }
            let Some(name) = pick_profile(&names) else {
                return Ok(());
            };
            if name == "demo" {
                return run_demo_mode().await;
            }
            match profiles_mut.profiles.get(&name) {
                Some(entry) => (entry.url.clone(), entry.token.clone()),
                None => return Ok(()),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter URL (http://HOST:PORT or https://...): ")?;
            if url.trim().is_empty() {
                return Ok(());
            }
            let token = prompt_string("Enter API token (or leave blank): ")?;
            let token_opt = if token.trim().is_empty() {
                None
            } else {
                Some(token.trim().to_string())
            };
            profiles_mut.profiles.insert(
                name.clone(),
                ProfileEntry {
                    url: url.trim().to_string(),
                    token: token_opt.clone(),
                },
            );
            let _ = profiles_mut.save();
            (url.trim().to_string(), token_opt)
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select.");
            return Ok(());
        }
    };

    let client = DeviceClient::new(&url, token.as_deref().unwrap_or_default())?;
    let repo: Box<dyn HistoryRepository> =
        Box::new(FileHistoryRepository::new(FileHistoryRepository::default_path()));
    let mut app = App::new(client, repo);
    app.run().await
}

fn pick_profile(names: &[String]) -> Option<String> {
    eprintln!("Select profile:");
    for (i, n) in names.iter().enumerate() {
        eprintln!("  {}. {}", i + 1, n);
    }
    eprint!("Enter number (or blank to abort): ");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line).ok()?;
    let idx = line.trim().parse::<usize>().ok()?;
    if idx == 0 || idx > names.len() {
        return None;
    }
    Some(names[idx - 1].clone())
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

// --- Demo Mode ---

async fn run_demo_mode() -> anyhow::Result<()> {
    let port = 3231;
    let url = format!("http://127.0.0.1:{port}");
    let child = spawn_demo_device(port)?;
    let client = DeviceClient::new(&url, "demo")?;
    // Demo history is throwaway; keep it out of the real cache file
    let repo: Box<dyn HistoryRepository> = Box::new(MemoryHistoryRepository::default());
    let mut app = App::new(client, repo);
    // Use select to handle Ctrl-C and normal quit
    tokio::select! {
        res = app.run() => { drop(child); res }
        _ = tokio::signal::ctrl_c() => {
            // Drop child (kills simulated device) then return
            drop(child);
            Ok(())
        }
    }
}

struct DemoGuard(std::sync::Arc<std::sync::Mutex<Option<std::process::Child>>>);
impl Drop for DemoGuard {
    fn drop(&mut self) {
        if let Some(mut ch) = self.0.lock().unwrap().take() {
            let _ = ch.kill();
        }
    }
}

fn spawn_demo_device(port: u16) -> anyhow::Result<DemoGuard> {
    let candidate = find_simdev_executable();
    let mut cmd = std::process::Command::new(candidate);
    cmd.arg("--port").arg(port.to_string());
    cmd.env("GRIDTOP_SIMDEV_TOKEN", "demo");
    let child = cmd.spawn()?;
    // Give the simulated device a brief moment to start
    std::thread::sleep(std::time::Duration::from_millis(300));
    Ok(DemoGuard(std::sync::Arc::new(std::sync::Mutex::new(Some(
        child,
    )))))
}

fn find_simdev_executable() -> std::path::PathBuf {
    let self_exe = std::env::current_exe().ok();
    if let Some(exe) = self_exe {
        if let Some(parent) = exe.parent() {
            #[cfg(windows)]
            let name = "gridtop_simdev.exe";
            #[cfg(not(windows))]
            let name = "gridtop_simdev";
            let candidate = parent.join(name);
            if candidate.exists() {
                return candidate;
            }
        }
    }
    // Fallback to relying on PATH
    std::path::PathBuf::from("gridtop_simdev")
}

#[cfg(test)]
mod tests {
    use super::parse_args;

    fn args(v: &[&str]) -> Vec<String> {
        std::iter::once("gridtop")
            .chain(v.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn url_token_and_profile() {
        let p = parse_args(args(&["-t", "secret", "-P", "plant", "http://dev:8080"])).unwrap();
        assert_eq!(p.url.as_deref(), Some("http://dev:8080"));
        assert_eq!(p.token.as_deref(), Some("secret"));
        assert_eq!(p.profile.as_deref(), Some("plant"));
        assert!(!p.save);
        assert!(!p.demo);
    }

    #[test]
    fn assignment_forms() {
        let p = parse_args(args(&["--token=abc", "--profile=site"])).unwrap();
        assert_eq!(p.token.as_deref(), Some("abc"));
        assert_eq!(p.profile.as_deref(), Some("site"));
    }

    #[test]
    fn demo_and_save_flags() {
        let p = parse_args(args(&["--demo", "--save"])).unwrap();
        assert!(p.demo);
        assert!(p.save);
    }

    #[test]
    fn help_and_extra_positional_reject() {
        assert!(parse_args(args(&["--help"])).is_err());
        assert!(parse_args(args(&["http://a", "http://b"])).is_err());
    }
}

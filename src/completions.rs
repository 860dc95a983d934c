use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap_complete::{generate, Shell};
use directories::BaseDirs;

use crate::app::AppError;

const BIN_NAME: &str = "leadsheet";

pub fn generate_completions(shell: Shell, buf: &mut dyn Write) {
    let mut cmd = crate::cli::styled_command();
    generate(shell, &mut cmd, BIN_NAME, buf);
}

/// User-level directories completions are installed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRoots {
    pub data_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl InstallRoots {
    pub fn from_user_dirs() -> Option<Self> {
        let dirs = BaseDirs::new()?;
        Some(Self {
            data_dir: dirs.data_dir().to_path_buf(),
            config_dir: dirs.config_dir().to_path_buf(),
        })
    }

    /// Where each shell autoloads user completions from. Zsh has no such
    /// default, so its file goes to a `site-functions` dir the user adds to
    /// `fpath`.
    pub fn target(&self, shell: Shell) -> Option<PathBuf> {
        match shell {
            Shell::Bash => Some(
                self.data_dir
                    .join("bash-completion/completions")
                    .join(BIN_NAME),
            ),
            Shell::Zsh => Some(
                self.data_dir
                    .join("zsh/site-functions")
                    .join(format!("_{BIN_NAME}")),
            ),
            Shell::Fish => Some(
                self.config_dir
                    .join("fish/completions")
                    .join(format!("{BIN_NAME}.fish")),
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installed {
    pub path: PathBuf,
    /// Extra setup the user still has to do, if any.
    pub hint: Option<String>,
}

pub fn install_completions(shell: Shell, roots: &InstallRoots) -> Result<Installed, AppError> {
    let path = roots.target(shell).ok_or_else(|| {
        AppError::InvalidArgument(format!(
            "--install supports bash, zsh and fish; print {shell} completions and place them yourself"
        ))
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut script = Vec::new();
    generate_completions(shell, &mut script);
    std::fs::write(&path, script)?;
    tracing::info!(%shell, path = %path.display(), "completions installed");

    let hint = match (shell, path.parent()) {
        (Shell::Zsh, Some(dir)) => Some(zsh_hint(dir)),
        _ => None,
    };
    Ok(Installed { path, hint })
}

fn zsh_hint(dir: &Path) -> String {
    format!(
        "add `fpath=(\"{}\" $fpath)` before `compinit` in your zsh config",
        dir.display()
    )
}

pub fn run_completions_command(shell: Option<Shell>, install: bool) -> Result<(), AppError> {
    let shell = shell.or_else(Shell::from_env).ok_or_else(|| {
        AppError::InvalidArgument("could not detect a shell from $SHELL; pass one".to_string())
    })?;

    if install {
        let roots = InstallRoots::from_user_dirs().ok_or_else(|| {
            AppError::InvalidArgument("no home directory to install completions into".to_string())
        })?;
        let installed = install_completions(shell, &roots)?;
        println!("completions installed to {}", installed.path.display());
        if let Some(hint) = installed.hint {
            println!("{hint}");
        }
    } else {
        let mut stdout = io::stdout().lock();
        generate_completions(shell, &mut stdout);
    }
    Ok(())
}

//! Purpose: Seam to the external build-modeling capability behind the `stats` command.
//! Exports: `StatsProvider`, `BuildStats`, `PlaceholderStats`, `ExternalStats`, `StatsBackend`.
//! Role: Availability is decided once at startup; the dispatcher only reads it.
//! Invariants: A missing or broken backend never prevents encode/decode/ping.
//! Invariants: `PlaceholderStats` always reports unavailable and returns all-zero stats.
//! Notes: `ExternalStats` speaks JSON over the child's stdin/stdout, one process per request.
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::core::build::Build;
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildStats {
    pub life: f64,
    pub energy_shield: f64,
    pub mana: f64,
    pub fire_res: f64,
    pub cold_res: f64,
    pub lightning_res: f64,
    pub chaos_res: f64,
    pub dps: f64,
    pub attack_speed: f64,
    pub crit_chance: f64,
}

pub trait StatsProvider {
    fn is_available(&self) -> bool;
    fn calculate(&self, build: &Build) -> Result<BuildStats, Error>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PlaceholderStats;

impl StatsProvider for PlaceholderStats {
    fn is_available(&self) -> bool {
        false
    }

    fn calculate(&self, _build: &Build) -> Result<BuildStats, Error> {
        Ok(BuildStats::default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalStats {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalStats {
    /// Resolves `program` as a path, or through `PATH` for a bare name.
    pub fn locate(program: &Path, args: Vec<String>) -> Option<Self> {
        let resolved = if program.components().count() > 1 {
            program.is_file().then(|| program.to_path_buf())
        } else {
            search_path(program, std::env::var_os("PATH"))
        }?;
        Some(Self {
            program: resolved,
            args,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl StatsProvider for ExternalStats {
    fn is_available(&self) -> bool {
        true
    }

    fn calculate(&self, build: &Build) -> Result<BuildStats, Error> {
        let payload = serde_json::to_vec(build).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode build for stats backend")
                .with_source(err)
        })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| {
                Error::new(ErrorKind::Capability)
                    .with_message(format!(
                        "failed to start stats backend {}",
                        self.program.display()
                    ))
                    .with_source(err)
            })?;

        let stdin = child.stdin.take();
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut pipe) => pipe.write_all(&payload),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            (written, output)
        });

        let output = output.map_err(|err| {
            Error::new(ErrorKind::Capability)
                .with_message("failed to read stats backend output")
                .with_source(err)
        })?;
        if !output.status.success() {
            return Err(Error::new(ErrorKind::Capability)
                .with_message(format!("stats backend exited with {}", output.status)));
        }
        match written {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("stats backend exited before reading the whole build");
            }
            Err(err) => {
                return Err(Error::new(ErrorKind::Capability)
                    .with_message("failed to send build to stats backend")
                    .with_source(err));
            }
        }

        serde_json::from_slice(&output.stdout).map_err(|err| {
            Error::new(ErrorKind::Capability)
                .with_message("stats backend returned malformed stats")
                .with_source(err)
        })
    }
}

/// The backend chosen at startup.
#[derive(Clone, Debug)]
pub enum StatsBackend {
    Placeholder(PlaceholderStats),
    External(ExternalStats),
}

impl StatsBackend {
    pub fn detect(program: Option<&Path>, args: Vec<String>) -> Self {
        let Some(program) = program else {
            tracing::warn!("no stats backend configured; stats will report zeros");
            return StatsBackend::Placeholder(PlaceholderStats);
        };
        match ExternalStats::locate(program, args) {
            Some(external) => {
                tracing::info!(program = %external.program().display(), "stats backend available");
                StatsBackend::External(external)
            }
            None => {
                tracing::warn!(
                    program = %program.display(),
                    "stats backend not found; stats will report zeros"
                );
                StatsBackend::Placeholder(PlaceholderStats)
            }
        }
    }
}

impl StatsProvider for StatsBackend {
    fn is_available(&self) -> bool {
        match self {
            StatsBackend::Placeholder(stats) => stats.is_available(),
            StatsBackend::External(stats) => stats.is_available(),
        }
    }

    fn calculate(&self, build: &Build) -> Result<BuildStats, Error> {
        match self {
            StatsBackend::Placeholder(stats) => stats.calculate(build),
            StatsBackend::External(stats) => stats.calculate(build),
        }
    }
}

fn search_path(program: &Path, path_var: Option<OsString>) -> Option<PathBuf> {
    let path_var = path_var?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

//! Builder sugar over [`Options`] (§6 "[EXPANDED]"), grounded directly in
//! the teacher's `Command` (`arg`, `args`, `env`, `envs`, `current_dir`,
//! `stdin`/`stdout`/`stderr`), adapted to this crate's `Redirect` enum.

use crate::{
    error::Result,
    options::{Options, Stdio},
    process::Process,
    redirect::Redirect,
};
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

/// Child process builder.
#[derive(Default, Debug)]
pub struct Command {
    path: Option<PathBuf>,
    args: Vec<OsString>,
    environment: Option<Vec<(OsString, OsString)>>,
    current_dir: Option<PathBuf>,
    stdin: Option<Redirect>,
    stdout: Option<Redirect>,
    stderr: Option<Redirect>,
    input: Option<Vec<u8>>,
}

impl Command {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Command {
            path: Some(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    pub fn arg(&mut self, a: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(a.as_ref().to_os_string());
        self
    }

    pub fn args(&mut self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> &mut Self {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env(&mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> &mut Self {
        self.environment
            .get_or_insert_with(Vec::new)
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn envs<K, V>(&mut self, items: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        let entries = self.environment.get_or_insert_with(Vec::new);
        entries.extend(
            items
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_os_string(), v.as_ref().to_os_string())),
        );
        self
    }

    pub fn current_dir(&mut self, dir: impl AsRef<Path>) -> &mut Self {
        self.current_dir.replace(dir.as_ref().to_path_buf());
        self
    }

    pub fn stdin(&mut self, redirect: Redirect) -> &mut Self {
        self.stdin.replace(redirect);
        self
    }

    pub fn stdout(&mut self, redirect: Redirect) -> &mut Self {
        self.stdout.replace(redirect);
        self
    }

    pub fn stderr(&mut self, redirect: Redirect) -> &mut Self {
        self.stderr.replace(redirect);
        self
    }

    /// Bytes to write to stdin before exec completes; stdin is then closed
    /// (§4.4 step 5). Implies `stdin(Redirect::Pipe)` unless already set.
    pub fn input(&mut self, data: impl Into<Vec<u8>>) -> &mut Self {
        self.input.replace(data.into());
        self
    }

    pub fn build(&self) -> Options {
        Options {
            environment: self.environment.clone(),
            working_directory: self.current_dir.clone(),
            redirect: Stdio {
                stdin: self.stdin.clone().unwrap_or_else(|| {
                    if self.input.is_some() {
                        Redirect::Pipe
                    } else {
                        Redirect::Inherit
                    }
                }),
                stdout: self.stdout.clone().unwrap_or(Redirect::Pipe),
                stderr: self.stderr.clone().unwrap_or(Redirect::Pipe),
            },
            input: self.input.clone(),
            ..Default::default()
        }
    }

    /// Builds a [`Process`] and starts it in one step.
    pub fn spawn(&self) -> Result<Process> {
        let path = self.path.clone().expect("Command::new was not called");
        let options = self.build();
        let mut process = Process::new();
        process.start(path, &self.args, options)?;
        Ok(process)
    }
}

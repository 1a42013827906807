use std::{env, path::PathBuf};

use anyhow::{bail, Error};
use xshell::cmd;

type Result<T> = std::result::Result<T, Error>;

/// One of the two cargo workspaces.
#[derive(Debug, Clone, Copy)]
enum Workspace {
    /// Hardware independent library, built for the development machine.
    Host,
    /// Firmware and on-target tests, built for the RP2040.
    Target,
}

impl Workspace {
    const ALL: [Workspace; 2] = [Workspace::Host, Workspace::Target];

    fn dir(self) -> PathBuf {
        match self {
            Workspace::Host => root_dir(),
            Workspace::Target => root_dir().join("cross"),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Workspace::Host => "host",
            Workspace::Target => "target",
        }
    }

    fn cargo(self, args: &[&str]) -> Result<()> {
        let _p = xshell::pushd(self.dir())?;
        println!("{} {}...", args.join(" "), self.name());
        cmd!("cargo {args...}").run()?;
        Ok(())
    }

    fn build(self) -> Result<()> {
        match self {
            Workspace::Host => self.cargo(&["build"]),
            Workspace::Target => self.cargo(&["build", "--release"]),
        }
    }

    fn test(self) -> Result<()> {
        match self {
            Workspace::Host => self.cargo(&["test"]),
            Workspace::Target => self.cargo(&["test", "--package", "self_tests"]),
        }
    }
}

fn main() -> Result<()> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let args = args.iter().map(|s| &**s).collect::<Vec<_>>();

    let (command, workspaces) = match &args[..] {
        [command] => (*command, &Workspace::ALL[..]),
        [command, "host"] => (*command, &[Workspace::Host][..]),
        [command, "target"] => (*command, &[Workspace::Target][..]),
        _ => bail!("usage: cargo xtask <build|test|run|clippy> [host|target]"),
    };

    match command {
        "run" => Workspace::Target.cargo(&["run", "--release"]),
        "build" => workspaces.iter().try_for_each(|w| w.build()),
        "test" => workspaces.iter().try_for_each(|w| w.test()),
        "clippy" => workspaces.iter().try_for_each(|w| w.cargo(&["clippy"])),
        other => bail!("unknown command `{other}`"),
    }
}

fn root_dir() -> PathBuf {
    let mut xtask_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    xtask_dir.pop();
    xtask_dir
}

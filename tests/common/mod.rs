//! Shared test utilities and fixtures
//!
//! A fake `ghc-mod` written as a POSIX shell script. It answers `version`,
//! a handful of query commands in both batch and `legacy-interactive` mode,
//! reads mapped buffers up to their end-of-transmission line,
//! and appends one line per probe, spawn and command to a log file so tests
//! can count what actually ran.

#![cfg(unix)]
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gmod_backend::BackendManager;
use gmod_config::{Settings, SettingsProvider, StaticSettings, ToolConfig};
use tempfile::TempDir;

const SCRIPT: &str = r#"#!/bin/sh
LOG='@LOG@'
EOT=$(printf '\004')
STX=$(printf '\002')
ETX=$(printf '\003')

respond() {
  case "$1" in
    type) echo '1 1 1 5 "Int"'; echo '1 1 1 30 "IO ()"' ;;
    info)
      case " $* " in
        *" crash "*) exit 3 ;;
        *" hang "*) sleep 10 ;;
      esac
      echo 'main :: IO ()'
      ;;
    find) echo 'Data.List' ;;
    list) echo 'Data.List'; echo 'Main' ;;
    lang) echo 'OverloadedStrings' ;;
    flag) echo '-Wall' ;;
    browse) echo 'foldr :: (a -> b -> b) -> b -> [a] -> b'; echo 'Maybe :: data Maybe a' ;;
    check)
      echo 'A.hs:2:1:Warning: Top-level binding with no type signature'
      echo 'Dummy:0:0:Warning: tool note'
      ;;
    lint) echo 'A.hs:3:5: Redundant bracket' ;;
    sig) echo 'function'; echo '2 1 2 20'; echo 'f x = _f_body' ;;
    split) printf '%s\n' '2 1 2 9 "f [] = _f_body"' ;;
  esac
}

for arg in "$@"; do
  case "$arg" in
    version)
      echo probe >> "$LOG"
      echo 'ghc-mod version @VERSION@ compiled by GHC 8.0.2'
      exit 0
      ;;
    legacy-interactive) interactive=1 ;;
  esac
done

if [ -n "$interactive" ]; then
  echo "spawn $*" >> "$LOG"
  while IFS= read -r line; do
    line=$(printf '%s' "$line" | tr -d "$STX$ETX")
    set -- $line
    [ "$1" = ascii-escape ] && shift
    echo "interactive $*" >> "$LOG"
    case "$1" in
      map-file)
        while IFS= read -r payload; do
          [ "$payload" = "$EOT" ] && break
        done
        ;;
      unmap-file) ;;
      *) respond "$@" ;;
    esac
    echo OK
  done
  exit 0
fi

echo "batch $*" >> "$LOG"
while [ $# -gt 0 ]; do
  case "$1" in
    --map-file)
      mapped=
      while IFS= read -r payload; do
        [ "$payload" = "$EOT" ] && { mapped=1; break; }
      done
      if [ -z "$mapped" ]; then
        echo 'hGetLine: end of file' >&2
        exit 1
      fi
      shift 2
      ;;
    --ghc-option) shift 2 ;;
    -*) shift ;;
    *) break ;;
  esac
done
respond "$@"
"#;

const FAILING_PROBE: &str = r#"#!/bin/sh
echo probe >> '@LOG@'
sleep 1
echo 'ghc-mod: cannot satisfy -package-id' >&2
exit 1
"#;

/// A project directory with a cabal file, a source file and the fake tool.
pub struct FakeProject {
    dir: TempDir,
    pub root: PathBuf,
    pub tool: PathBuf,
    pub log: PathBuf,
}

impl FakeProject {
    /// Project whose tool reports version `5.6.0.0`.
    pub fn new() -> Self {
        Self::with_version("5.6.0.0")
    }

    pub fn with_version(version: &str) -> Self {
        Self::with_script(&SCRIPT.replace("@VERSION@", version))
    }

    /// Project whose tool fails its version probe after a delay.
    pub fn failing_probe() -> Self {
        Self::with_script(FAILING_PROBE)
    }

    fn with_script(script: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::write(root.join("proj.cabal"), "name: proj\n").unwrap();
        fs::write(root.join("A.hs"), "module A where\nmain = pure ()\n").unwrap();

        let log = root.join("tool.log");
        let tool = root.join("ghc-mod");
        let script = script.replace("@LOG@", &log.display().to_string());
        fs::write(&tool, script).unwrap();
        make_executable(&tool);

        Self {
            dir,
            root,
            tool,
            log,
        }
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn config(&self) -> ToolConfig {
        ToolConfig {
            path: self.tool.display().to_string(),
            interactive_action_timeout_secs: 10,
            init_timeout_secs: 10,
            ..ToolConfig::default()
        }
    }

    pub fn manager(&self) -> BackendManager {
        self.manager_with(self.config(), Settings::default())
    }

    pub fn manager_with(&self, config: ToolConfig, settings: Settings) -> BackendManager {
        let settings: Arc<dyn SettingsProvider> = Arc::new(StaticSettings(settings));
        BackendManager::new(config, settings)
    }

    /// Every line the fake tool logged so far.
    pub fn log_lines(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.log_lines()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

use crate::suite::BenchError;
use crate::suite::BenchResult;
use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PROFILE_ITERS: u32 = 1;
pub const DEFAULT_BENCH_ITERS: u32 = 10;
pub const DEFAULT_TRIALS: usize = 3;

/// Upper bound for a single benchmark subprocess. Exceeding it is fatal.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(1800);
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(30);
pub const LIST_TIMEOUT: Duration = Duration::from_secs(60);

/// JVM flags passed in every mode. The add-exports flag is required for the
/// profilecheckpoint API in the modified JDK build.
pub const BASE_JVM_ARGS: &[&str] = &[
  "--add-exports=java.base/jdk.internal.profilecheckpoint=ALL-UNNAMED",
  "-XX:+UnlockDiagnosticVMOptions",
  "-Xlog:compilation=info",
];

// Known JDK build output locations, relative to the directory that holds this
// repo, the jdk25u checkout, and the suite checkouts side by side.
const DEFAULT_JAVA_PATTERNS: &[&str] = &[
  "jdk25u/build/macosx-aarch64-server-release/jdk/bin/java",
  "jdk25u/build/linux-x86_64-server-release/jdk/bin/java",
  "jdk25u/build/linux-aarch64-server-release/jdk/bin/java",
];

static DACAPO_JAR_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^dacapo-evaluation-git-.*\.jar$").unwrap());

static RENAISSANCE_JAR_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^renaissance-gpl-.*\.jar$").unwrap());

fn base_dir() -> PathBuf {
  let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
  cwd.parent().map(|p| p.to_path_buf()).unwrap_or(cwd)
}

fn find_in_path(bin: &str) -> Option<PathBuf> {
  let paths = env::var_os("PATH")?;
  env::split_paths(&paths)
    .map(|dir| dir.join(bin))
    .find(|p| p.is_file())
}

/// Auto-detect the java binary from the known build paths, falling back to
/// whatever is on PATH.
pub fn detect_java() -> BenchResult<PathBuf> {
  let base = base_dir();
  for pattern in DEFAULT_JAVA_PATTERNS {
    let path = base.join(pattern);
    if path.exists() {
      return Ok(path);
    }
  }
  if let Some(java) = find_in_path("java") {
    return Ok(java);
  }
  Err(BenchError::Setup(
    "could not find java binary, use --java to specify the path".to_string(),
  ))
}

pub fn detect_dacapo_jar() -> BenchResult<PathBuf> {
  let dir = base_dir().join("dacapobench").join("benchmarks");
  newest_jar(&dir, &DACAPO_JAR_RE).ok_or_else(|| {
    BenchError::Setup("could not find DaCapo jar, use --jar to specify the path".to_string())
  })
}

pub fn detect_renaissance_jar() -> BenchResult<PathBuf> {
  let dir = base_dir().join("renaissance").join("target");
  newest_jar(&dir, &RENAISSANCE_JAR_RE).ok_or_else(|| {
    BenchError::Setup("could not find Renaissance jar, use --jar to specify the path".to_string())
  })
}

/// Newest matching jar in `dir`, by name. Both suites version-suffix their
/// jars, so the lexicographically last match is the newest build.
pub(crate) fn newest_jar(dir: &Path, name_re: &Regex) -> Option<PathBuf> {
  let entries = fs::read_dir(dir).ok()?;
  let mut matches: Vec<PathBuf> = entries
    .filter_map(|entry| {
      let entry = entry.ok()?;
      let name = entry.file_name().to_str()?.to_string();
      if name_re.is_match(&name) {
        Some(entry.path())
      } else {
        None
      }
    })
    .collect();
  matches.sort();
  matches.pop()
}

#[cfg(test)]
mod tests {
  use crate::config::newest_jar;
  use crate::config::DACAPO_JAR_RE;
  use crate::config::RENAISSANCE_JAR_RE;
  use std::env;
  use std::fs;

  #[test]
  fn test_newest_jar_picks_last_by_name() {
    let dir = env::temp_dir().join(format!("newest-jar-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("dacapo-evaluation-git-2023.jar"), b"").unwrap();
    fs::write(dir.join("dacapo-evaluation-git-2024.jar"), b"").unwrap();
    fs::write(dir.join("unrelated.jar"), b"").unwrap();
    let jar = newest_jar(&dir, &DACAPO_JAR_RE).unwrap();
    assert_eq!(
      jar.file_name().unwrap().to_str().unwrap(),
      "dacapo-evaluation-git-2024.jar"
    );
    fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn test_newest_jar_missing_dir() {
    let dir = env::temp_dir().join("newest-jar-test-nonexistent");
    assert!(newest_jar(&dir, &DACAPO_JAR_RE).is_none());
  }

  #[test]
  fn test_jar_patterns() {
    assert!(DACAPO_JAR_RE.is_match("dacapo-evaluation-git-071e5040.jar"));
    assert!(!DACAPO_JAR_RE.is_match("dacapo-evaluation-git-071e5040.jar.bak"));
    assert!(RENAISSANCE_JAR_RE.is_match("renaissance-gpl-0.16.0.jar"));
    assert!(!RENAISSANCE_JAR_RE.is_match("renaissance-mit-0.16.0.jar"));
  }
}

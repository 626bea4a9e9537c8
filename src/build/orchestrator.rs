/// Build orchestration: signature, cache layout, external steps, verification
use chrono::Utc;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};

use super::defines::{compute_defines, parse_extra_definitions, DefineInputs};
use super::normalize::{ensure_canonical_library, has_shared_library, Normalized, Platform};
use super::runner::{ToolCommand, ToolRunner};
use super::BuildRequest;
use crate::config::GeneratorChoice;
use crate::error::{list_dir, BuildError, Result};
use crate::logging::{operations, status};
use crate::signature::{Signature, SignatureInputs};
use crate::storage::{ensure_symlink, BuildLock, BuildManifest, CacheLayout, LinkAction};
use crate::toolchain::runtime_link_flags;

/// Validated, side-effect-free view of a request
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub version: String,
    pub signature: Signature,
    pub layout: CacheLayout,
    pub extra_definitions: Vec<String>,
    pub source_dir: PathBuf,
}

impl BuildPlan {
    /// Validate the request and derive its signature and cache paths.
    ///
    /// Nothing is written to disk.
    pub fn new(request: &BuildRequest) -> Result<Self> {
        let extra_definitions = parse_extra_definitions(&request.extra)?;

        let source_dir = request.cmake_source_dir();
        if !source_dir.join("CMakeLists.txt").is_file() {
            return Err(BuildError::MissingSourceLayout(
                source_dir.join("CMakeLists.txt"),
            ));
        }

        let signature = SignatureInputs {
            version: &request.version,
            env: &request.toolchain,
            toggles: request.toggles,
            extra: &request.extra,
        }
        .compute();
        let cache_root = std::path::absolute(&request.cache_root).map_err(|e| {
            BuildError::io(
                format!("Failed to resolve cache root {}", request.cache_root.display()),
                e,
            )
        })?;
        let layout = CacheLayout::new(&cache_root, &request.version, &signature);

        debug!(
            operation = operations::SIGNATURE,
            signature = %signature,
            version = %request.version,
            "computed build signature"
        );

        Ok(Self {
            version: request.version.clone(),
            signature,
            layout,
            extra_definitions,
            source_dir,
        })
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub signature: Signature,
    pub layout: CacheLayout,
    /// False when the external steps were skipped
    pub built: bool,
    pub library: Normalized,
}

/// Drives one build request through a [`ToolRunner`]
pub struct Orchestrator<R: ToolRunner> {
    runner: R,
    platform: Platform,
}

impl<R: ToolRunner> Orchestrator<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            platform: Platform::current(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn run(&mut self, request: &BuildRequest) -> Result<BuildOutcome> {
        let start = Instant::now();
        let plan = BuildPlan::new(request)?;
        let layout = &plan.layout;

        info!(
            signature = %plan.signature,
            version = %plan.version,
            "build dir: {}",
            layout.build_dir.display()
        );
        info!(
            signature = %plan.signature,
            version = %plan.version,
            "install dir: {}",
            layout.install_dir.display()
        );

        let _lock = BuildLock::acquire(&layout.lock_path())?;

        if request.force {
            info!(
                operation = operations::INVALIDATE,
                signature = %plan.signature,
                "forced rebuild, removing build and install trees"
            );
            layout.invalidate()?;
        }

        layout.ensure_dirs()?;
        link_visible(&request.visible_build, &layout.build_dir)?;
        link_visible(&request.visible_install, &layout.install_dir)?;

        let lib_dir = layout.lib_dir();
        let reuse = request.skip_if_built
            && has_shared_library(&lib_dir, &request.dependency.library, self.platform);

        if reuse {
            info!(
                operation = operations::BUILD,
                status = status::SKIPPED,
                signature = %plan.signature,
                "shared library already installed, skipping configure/build/install"
            );
        } else {
            self.run_external_steps(request, &plan)?;
        }

        if !lib_dir.is_dir() {
            return Err(BuildError::MissingLibDir {
                listing: list_dir(&layout.install_dir),
                path: lib_dir,
            });
        }

        let library = ensure_canonical_library(&lib_dir, &request.dependency.library, self.platform)?;

        let manifest = BuildManifest {
            dependency: request.dependency.name.clone(),
            version: plan.version.clone(),
            signature: plan.signature.to_string(),
            toggles: request.toggles,
            extra: request.extra.clone(),
            toolchain: request.toolchain.clone(),
            library: library.source().map(str::to_string).or_else(|| {
                BuildManifest::load(&layout.install_dir).and_then(|m| m.library)
            }),
            reused: reuse,
            finished_at: Utc::now(),
        };
        if let Err(e) = manifest.save(&layout.install_dir) {
            warn!(error = %e, "failed to write build manifest");
        }

        touch(&request.stamp)?;
        info!(
            operation = operations::STAMP,
            status = status::SUCCESS,
            signature = %plan.signature,
            duration_secs = start.elapsed().as_secs_f64(),
            path = %request.stamp.display(),
            "build finished"
        );

        Ok(BuildOutcome {
            signature: plan.signature,
            layout: plan.layout,
            built: !reuse,
            library,
        })
    }

    fn run_external_steps(&mut self, request: &BuildRequest, plan: &BuildPlan) -> Result<()> {
        let layout = &plan.layout;
        let runtime_flags = if request.probe_runtime {
            runtime_link_flags(&request.toolchain)
        } else {
            Vec::new()
        };

        let defines = compute_defines(&DefineInputs {
            prefix: &request.dependency.name,
            install_dir: &layout.install_dir,
            fetch_dir: &layout.fetch_dir,
            toggles: request.toggles,
            env: &request.toolchain,
            runtime_link_flags: runtime_flags,
        });

        let build_dir = layout.build_dir.display().to_string();

        let mut configure = ToolCommand::new(operations::CONFIGURE, &request.cmake)
            .arg("-S")
            .arg(plan.source_dir.display().to_string())
            .arg("-B")
            .arg(build_dir.as_str());
        if use_ninja(request.generator) {
            configure = configure.args(["-G", "Ninja"]);
        }
        let configure = configure
            .args(defines.to_args())
            .args(plan.extra_definitions.iter().map(|d| format!("-D{}", d)));

        let build = ToolCommand::new(operations::BUILD, &request.cmake)
            .args(["--build", build_dir.as_str(), "--config", "Release", "--parallel"])
            .arg(request.jobs.max(1).to_string());

        let install = ToolCommand::new(operations::INSTALL, &request.cmake).args([
            "--install",
            build_dir.as_str(),
            "--config",
            "Release",
        ]);

        for command in [configure, build, install] {
            self.runner.run(&command)?;
        }
        Ok(())
    }
}

fn link_visible(visible: &Path, target: &Path) -> Result<()> {
    let action = ensure_symlink(visible, target)?;
    if action != LinkAction::Unchanged {
        info!(
            operation = operations::LINK,
            path = %visible.display(),
            target = %target.display(),
            "{:?} visible link",
            action
        );
    }
    Ok(())
}

fn use_ninja(choice: GeneratorChoice) -> bool {
    match choice {
        GeneratorChoice::Ninja => true,
        GeneratorChoice::Default => false,
        GeneratorChoice::Auto => which::which("ninja").is_ok(),
    }
}

/// Create `path` if missing and bump its modification time.
pub fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| BuildError::io(format!("Failed to create {}", parent.display()), e))?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| BuildError::io(format!("Failed to open stamp {}", path.display()), e))?;
    file.set_modified(SystemTime::now())
        .map_err(|e| BuildError::io(format!("Failed to touch stamp {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Toggles;
    use crate::config::DependencyConfig;
    use crate::toolchain::ToolchainEnv;
    use serial_test::serial;
    use tempfile::TempDir;

    /// Records commands; the install step drops a versioned library into the prefix.
    #[derive(Default)]
    struct FakeRunner {
        commands: Vec<ToolCommand>,
        fail_step: Option<&'static str>,
        install_library: bool,
    }

    impl FakeRunner {
        fn installing() -> Self {
            Self {
                install_library: true,
                ..Default::default()
            }
        }

        fn steps(&self) -> Vec<&'static str> {
            self.commands.iter().map(|c| c.step).collect()
        }

        fn prefix(&self) -> Option<PathBuf> {
            self.commands
                .iter()
                .flat_map(|c| c.args.iter())
                .find_map(|a| a.strip_prefix("-DCMAKE_INSTALL_PREFIX="))
                .map(PathBuf::from)
        }
    }

    impl ToolRunner for FakeRunner {
        fn run(&mut self, command: &ToolCommand) -> Result<()> {
            self.commands.push(command.clone());
            if self.fail_step == Some(command.step) {
                return Err(BuildError::ToolFailed {
                    step: command.step,
                    command: command.display(),
                    status: "exit status: 1".to_string(),
                });
            }
            if command.step == operations::INSTALL && self.install_library {
                let lib = self.prefix().unwrap().join("lib");
                fs::create_dir_all(&lib).unwrap();
                fs::write(lib.join("libonnxruntime.so.1.23.2"), b"elf").unwrap();
            }
            Ok(())
        }
    }

    struct Fixture {
        temp: TempDir,
        request: BuildRequest,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("cmake")).unwrap();
        fs::write(src.join("cmake/CMakeLists.txt"), "project(x)").unwrap();

        let request = BuildRequest {
            dependency: DependencyConfig::default(),
            cmake: PathBuf::from("cmake"),
            source_root: src,
            version: "1.23.2".to_string(),
            toggles: Toggles::default(),
            extra: String::new(),
            cache_root: temp.path().join("cache"),
            visible_build: temp.path().join("project/build/ort"),
            visible_install: temp.path().join("project/install/ort"),
            stamp: temp.path().join("project/ort.stamp"),
            force: false,
            skip_if_built: false,
            toolchain: ToolchainEnv::default(),
            probe_runtime: false,
            jobs: 8,
            generator: GeneratorChoice::Default,
        };
        Fixture { temp, request }
    }

    fn orchestrator(runner: FakeRunner) -> Orchestrator<FakeRunner> {
        Orchestrator::new(runner).with_platform(Platform::Linux)
    }

    #[cfg(unix)]
    #[test]
    fn test_end_to_end_build() {
        let fx = fixture();
        let mut orch = orchestrator(FakeRunner::installing());

        let outcome = orch.run(&fx.request).unwrap();

        assert!(outcome.built);
        assert_eq!(orch.runner().steps(), vec!["configure", "build", "install"]);
        assert_eq!(
            outcome.library,
            Normalized::Linked("libonnxruntime.so.1.23.2".to_string())
        );
        assert!(outcome.layout.lib_dir().join("libonnxruntime.so").exists());
        assert!(fx.request.stamp.exists());
        assert_eq!(
            fs::read_link(&fx.request.visible_install).unwrap(),
            outcome.layout.install_dir
        );
        assert_eq!(
            fs::read_link(&fx.request.visible_build).unwrap(),
            outcome.layout.build_dir
        );

        let manifest = BuildManifest::load(&outcome.layout.install_dir).unwrap();
        assert_eq!(manifest.version, "1.23.2");
        assert_eq!(manifest.library.as_deref(), Some("libonnxruntime.so.1.23.2"));
        assert!(!manifest.reused);
    }

    #[test]
    fn test_configure_arguments() {
        let mut fx = fixture();
        fx.request.extra = "FOO=1;BAR=two".to_string();
        let mut orch = orchestrator(FakeRunner::installing());
        let outcome = orch.run(&fx.request).unwrap();

        let commands = &orch.runner().commands;
        let configure = &commands[0].args;
        assert_eq!(configure[0], "-S");
        assert_eq!(configure[1], fx.request.source_root.join("cmake").display().to_string());
        assert_eq!(configure[3], outcome.layout.build_dir.display().to_string());
        assert!(!configure.contains(&"-G".to_string()));
        assert_eq!(&configure[configure.len() - 2..], ["-DFOO=1", "-DBAR=two"]);
        assert!(configure.contains(&format!(
            "-DFETCHCONTENT_BASE_DIR={}",
            outcome.layout.fetch_dir.display()
        )));

        assert_eq!(commands[1].args[4..], ["--parallel".to_string(), "8".to_string()]);
        assert_eq!(commands[2].args[0], "--install");
    }

    #[test]
    fn test_ninja_generator_requested() {
        let mut fx = fixture();
        fx.request.generator = GeneratorChoice::Ninja;
        let mut orch = orchestrator(FakeRunner::installing());
        orch.run(&fx.request).unwrap();

        let configure = &orch.runner().commands[0].args;
        assert_eq!(configure[4..6], ["-G".to_string(), "Ninja".to_string()]);
    }

    #[test]
    fn test_skip_if_built_runs_nothing() {
        let mut fx = fixture();
        orchestrator(FakeRunner::installing()).run(&fx.request).unwrap();
        fs::remove_file(&fx.request.stamp).unwrap();

        fx.request.skip_if_built = true;
        let mut orch = orchestrator(FakeRunner::default());
        let outcome = orch.run(&fx.request).unwrap();

        assert!(!outcome.built);
        assert!(orch.runner().commands.is_empty());
        assert_eq!(outcome.library, Normalized::AlreadyPresent);
        assert!(fx.request.stamp.exists());
        let manifest = BuildManifest::load(&outcome.layout.install_dir).unwrap();
        assert!(manifest.reused);
        assert_eq!(manifest.library.as_deref(), Some("libonnxruntime.so.1.23.2"));
    }

    #[test]
    fn test_skip_if_built_without_artifact_still_builds() {
        let mut fx = fixture();
        fx.request.skip_if_built = true;
        let mut orch = orchestrator(FakeRunner::installing());

        assert!(orch.run(&fx.request).unwrap().built);
        assert_eq!(orch.runner().steps().len(), 3);
    }

    #[test]
    fn test_force_wipes_previous_trees() {
        let mut fx = fixture();
        let first = orchestrator(FakeRunner::installing()).run(&fx.request).unwrap();
        let marker = first.layout.build_dir.join("CMakeCache.txt");
        fs::write(&marker, "old").unwrap();

        fx.request.force = true;
        fx.request.skip_if_built = true;
        let mut orch = orchestrator(FakeRunner::installing());
        let outcome = orch.run(&fx.request).unwrap();

        assert!(outcome.built);
        assert!(!marker.exists());
        assert_eq!(orch.runner().steps().len(), 3);
        assert!(outcome.layout.fetch_dir.exists());
    }

    #[test]
    fn test_invalid_extra_runs_nothing() {
        let mut fx = fixture();
        fx.request.extra = "GOOD=1;BROKEN".to_string();
        let mut orch = orchestrator(FakeRunner::installing());

        let err = orch.run(&fx.request).unwrap_err();

        assert!(matches!(err, BuildError::InvalidExtraDefinition(ref e) if e == "BROKEN"));
        assert!(orch.runner().commands.is_empty());
        assert!(!fx.request.stamp.exists());
        assert!(!fx.request.cache_root.exists());
    }

    #[test]
    fn test_missing_source_layout() {
        let mut fx = fixture();
        fx.request.source_root = fx.temp.path().join("nowhere");
        let mut orch = orchestrator(FakeRunner::installing());

        let err = orch.run(&fx.request).unwrap_err();
        assert!(matches!(err, BuildError::MissingSourceLayout(_)));
        assert!(orch.runner().commands.is_empty());
    }

    #[test]
    fn test_tool_failure_leaves_no_stamp() {
        let fx = fixture();
        let mut orch = orchestrator(FakeRunner {
            fail_step: Some("build"),
            install_library: true,
            ..Default::default()
        });

        let err = orch.run(&fx.request).unwrap_err();
        assert!(matches!(err, BuildError::ToolFailed { step: "build", .. }));
        assert_eq!(orch.runner().steps(), vec!["configure", "build"]);
        assert!(!fx.request.stamp.exists());
    }

    #[test]
    fn test_missing_lib_dir_after_install() {
        let fx = fixture();
        let mut orch = orchestrator(FakeRunner::default());

        let err = orch.run(&fx.request).unwrap_err();
        assert!(matches!(err, BuildError::MissingLibDir { .. }));
        assert!(!fx.request.stamp.exists());
    }

    #[test]
    fn test_toggles_select_distinct_trees() {
        let mut fx = fixture();
        let off = orchestrator(FakeRunner::installing()).run(&fx.request).unwrap();
        fx.request.toggles.xnnpack = true;
        let on = orchestrator(FakeRunner::installing()).run(&fx.request).unwrap();

        assert_ne!(off.signature, on.signature);
        assert_ne!(off.layout.install_dir, on.layout.install_dir);
        assert_eq!(off.layout.fetch_dir, on.layout.fetch_dir);
        assert_eq!(
            fs::read_link(&fx.request.visible_install).unwrap(),
            on.layout.install_dir
        );
    }

    #[test]
    fn test_touch_creates_parent_and_updates() {
        let temp = TempDir::new().unwrap();
        let stamp = temp.path().join("a/b/done.stamp");
        touch(&stamp).unwrap();
        assert!(stamp.exists());
        touch(&stamp).unwrap();
        assert_eq!(fs::read(&stamp).unwrap(), b"");
    }

    /// Restores the working directory when dropped
    struct CwdGuard(PathBuf);

    impl CwdGuard {
        fn enter(dir: &Path) -> Self {
            let previous = std::env::current_dir().unwrap();
            std::env::set_current_dir(dir).unwrap();
            Self(previous)
        }
    }

    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = std::env::set_current_dir(&self.0);
        }
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_relative_cache_root_links_resolve() {
        let mut fx = fixture();
        let _cwd = CwdGuard::enter(fx.temp.path());
        fx.request.cache_root = PathBuf::from("cache");
        fx.request.visible_install = PathBuf::from("project/install/ort");
        fx.request.visible_build = PathBuf::from("project/build/ort");

        let outcome = orchestrator(FakeRunner::installing()).run(&fx.request).unwrap();

        let target = fs::read_link(&fx.request.visible_install).unwrap();
        assert!(target.is_absolute());
        assert_eq!(target, outcome.layout.install_dir);
        assert!(fx
            .request
            .visible_install
            .join("lib/libonnxruntime.so")
            .exists());
        assert!(fx.request.visible_build.is_dir());
    }

    #[test]
    fn test_lock_waiter_reuses_concurrent_build() {
        let mut fx = fixture();
        fx.request.skip_if_built = true;
        let layout = BuildPlan::new(&fx.request).unwrap().layout;

        // Another run holds the lock while it installs the library
        let held = BuildLock::acquire(&layout.lock_path()).unwrap();

        let request = fx.request.clone();
        let waiter = std::thread::spawn(move || {
            let mut orch = orchestrator(FakeRunner::installing());
            let outcome = orch.run(&request);
            (outcome, orch.runner().commands.len())
        });

        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(!waiter.is_finished());

        let lib = layout.lib_dir();
        fs::create_dir_all(&lib).unwrap();
        fs::write(lib.join("libonnxruntime.so.1.23.2"), b"elf").unwrap();
        drop(held);

        let (outcome, commands) = waiter.join().unwrap();
        let outcome = outcome.unwrap();
        assert!(!outcome.built);
        assert_eq!(commands, 0);
        assert!(fx.request.stamp.exists());
        assert!(outcome.layout.lib_dir().join("libonnxruntime.so").exists());
    }
}

/// CMake cache definitions for the configure step
use std::path::Path;

use super::Toggles;
use crate::error::{BuildError, Result};
use crate::flags;
use crate::toolchain::ToolchainEnv;

/// Split and validate a raw `KEY=VALUE;KEY=VALUE` string.
///
/// Blank entries are ignored. Order is preserved.
pub fn parse_extra_definitions(extra: &str) -> Result<Vec<String>> {
    extra
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, _)) if !key.trim().is_empty() => Ok(entry.to_string()),
            _ => Err(BuildError::InvalidExtraDefinition(entry.to_string())),
        })
        .collect()
}

/// Ordered set of `-D` definitions.
///
/// Setting an existing key replaces its value in place, so the first insertion
/// fixes the position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defines {
    entries: Vec<(String, String)>,
}

impl Defines {
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `-DKEY=VALUE` arguments
    pub fn to_args(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("-D{}={}", k, v)).collect()
    }
}

/// Inputs for [`compute_defines`]
#[derive(Debug, Clone)]
pub struct DefineInputs<'a> {
    /// Prefix of the dependency's own options (`onnxruntime_...`)
    pub prefix: &'a str,
    pub install_dir: &'a Path,
    pub fetch_dir: &'a Path,
    pub toggles: Toggles,
    pub env: &'a ToolchainEnv,
    /// `-L`/rpath flags from the toolchain probe
    pub runtime_link_flags: Vec<String>,
}

/// Definitions passed to every configure run.
pub fn compute_defines(inputs: &DefineInputs<'_>) -> Defines {
    let mut defines = Defines::default();
    let on_off = Toggles::cmake;
    let dep = |name: &str| format!("{}_{}", inputs.prefix, name);

    defines.set("CMAKE_BUILD_TYPE", "Release");
    defines.set("CMAKE_POSITION_INDEPENDENT_CODE", "ON");
    defines.set("CMAKE_INSTALL_PREFIX", inputs.install_dir.display().to_string());

    // Downloads are shared by every signature of this version
    defines.set("FETCHCONTENT_BASE_DIR", inputs.fetch_dir.display().to_string());
    defines.set("FETCHCONTENT_UPDATES_DISCONNECTED", "ON");

    defines.set("CMAKE_SUPPRESS_DEVELOPER_WARNINGS", "ON");
    defines.set("CMAKE_C_FLAGS", flags::compile_flags(inputs.env.cflags.as_deref()));
    defines.set(
        "CMAKE_CXX_FLAGS",
        flags::compile_flags(inputs.env.cxxflags.as_deref()),
    );

    if let Some(cc) = &inputs.env.cc {
        defines.set("CMAKE_C_COMPILER", cc.as_str());
    }
    if let Some(cxx) = &inputs.env.cxx {
        defines.set("CMAKE_CXX_COMPILER", cxx.as_str());
    }

    let linker = flags::linker_flags(
        inputs.runtime_link_flags.clone(),
        inputs.env.ldflags.as_deref(),
    );
    if !linker.is_empty() {
        defines.set("CMAKE_EXE_LINKER_FLAGS", linker.as_str());
        defines.set("CMAKE_SHARED_LINKER_FLAGS", linker);
    }

    defines.set(dep("BUILD_UNIT_TESTS"), on_off(inputs.toggles.tests));
    defines.set(dep("RUN_ONNX_TESTS"), on_off(inputs.toggles.tests));

    defines.set(dep("BUILD_SHARED_LIB"), "ON");
    defines.set(dep("ENABLE_PYTHON"), "OFF");
    defines.set(dep("ENABLE_TRAINING"), "OFF");
    defines.set(dep("BUILD_APPLE_FRAMEWORK"), "OFF");

    // CPU only
    for provider in ["CUDA", "ROCM", "TENSORRT", "OPENVINO", "COREML", "DML"] {
        defines.set(dep(&format!("USE_{}", provider)), "OFF");
    }

    defines.set(dep("DISABLE_ML_OPS"), "ON");
    defines.set(dep("ENABLE_LTO"), "ON");
    defines.set(dep("BUILD_FOR_NATIVE_MACHINE"), "ON");

    defines.set(dep("USE_ACL"), on_off(inputs.toggles.acl));
    defines.set(dep("USE_XNNPACK"), on_off(inputs.toggles.xnnpack));

    defines
}

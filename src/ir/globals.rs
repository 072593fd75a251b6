//! Named inputs every decision routine may read.
//!
//! A generator maps each of these onto whatever its build system calls the
//! same value. The interpreter takes them as plain values.

use std::fmt;

/// A value supplied by the build environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Global {
    /// Folder archives are unpacked under.
    ExplodedRoot,
    /// The runtime name a build system uses for "no C++ runtime".
    NoneRuntime,
    /// `Android`, `Darwin`, `Linux`, ...
    TargetSystem,
    /// Android API level.
    TargetPlatform,
    AndroidAbi,
    AndroidRuntime,
    OsxSysroot,
    OsxArchitectures,
    CxxCompilerStandard,
}

impl Global {
    pub const ALL: &'static [Global] = &[
        Global::ExplodedRoot,
        Global::NoneRuntime,
        Global::TargetSystem,
        Global::TargetPlatform,
        Global::AndroidAbi,
        Global::AndroidRuntime,
        Global::OsxSysroot,
        Global::OsxArchitectures,
        Global::CxxCompilerStandard,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Global::ExplodedRoot => "cdep_exploded_root",
            Global::NoneRuntime => "build_system_none_runtime",
            Global::TargetSystem => "build_system_target_system",
            Global::TargetPlatform => "build_system_target_platform",
            Global::AndroidAbi => "cdep_determined_android_abi",
            Global::AndroidRuntime => "cdep_determined_android_runtime",
            Global::OsxSysroot => "CMAKE_OSX_SYSROOT",
            Global::OsxArchitectures => "CMAKE_OSX_ARCHITECTURES",
            Global::CxxCompilerStandard => "build_system_cxx_compiler_standard",
        }
    }

    pub fn from_name(name: &str) -> Option<Global> {
        Global::ALL.iter().copied().find(|g| g.name() == name)
    }
}

impl fmt::Display for Global {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

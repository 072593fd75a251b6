//! The `cdep-manifest.yml` document.
//!
//! A manifest describes one package: its coordinate, the hard-name
//! dependencies it needs, an optional header-only archive, and the prebuilt
//! archive variants it ships per platform.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::coordinate::Coordinate;
use crate::core::dependency::HardNameDependency;

/// A parsed manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub coordinate: Coordinate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<HardNameDependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<Interfaces>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<Android>,
    #[serde(rename = "iOS", default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<Ios>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux: Option<Linux>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interfaces {
    #[serde(default)]
    pub headers: Option<HeaderArchive>,
}

/// A platform-independent archive, in practice the header-only interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderArchive {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub include: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<CxxLanguageFeature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Android {
    #[serde(default)]
    pub archives: Vec<AndroidArchive>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AndroidArchive {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub ndk: String,
    #[serde(default)]
    pub compiler: String,
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub builder: String,
    #[serde(default)]
    pub abi: String,
    #[serde(default)]
    pub include: String,
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default)]
    pub flavor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ios {
    #[serde(default)]
    pub archives: Vec<IosArchive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IosArchive {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub platform: Option<IosPlatform>,
    #[serde(default)]
    pub architecture: Option<IosArchitecture>,
    #[serde(default)]
    pub sdk: String,
    #[serde(default)]
    pub include: String,
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default)]
    pub flavor: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IosPlatform {
    #[serde(rename = "iPhoneOS")]
    IPhoneOs,
    #[serde(rename = "iPhoneSimulator")]
    IPhoneSimulator,
}

impl IosPlatform {
    pub fn as_str(self) -> &'static str {
        match self {
            IosPlatform::IPhoneOs => "iPhoneOS",
            IosPlatform::IPhoneSimulator => "iPhoneSimulator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IosArchitecture {
    Armv7,
    Armv7s,
    Arm64,
    I386,
    #[serde(rename = "x86_64")]
    X86_64,
}

impl IosArchitecture {
    pub fn as_str(self) -> &'static str {
        match self {
            IosArchitecture::Armv7 => "armv7",
            IosArchitecture::Armv7s => "armv7s",
            IosArchitecture::Arm64 => "arm64",
            IosArchitecture::I386 => "i386",
            IosArchitecture::X86_64 => "x86_64",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Linux {
    #[serde(default)]
    pub archives: Vec<LinuxArchive>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinuxArchive {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub include: String,
    #[serde(default)]
    pub libs: Vec<String>,
}

/// Android ABIs a manifest may name.
pub const KNOWN_ANDROID_ABIS: &[&str] = &[
    "x86",
    "x86_64",
    "armeabi",
    "armeabi-v7a",
    "arm64-v8a",
    "mips",
    "mips64",
];

/// Android C++ runtimes a manifest may name.
pub const KNOWN_ANDROID_RUNTIMES: &[&str] = &["c++", "stlport", "gnustl"];

/// One archive seen through the fields every platform shares.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveRef<'a> {
    pub file: &'a str,
    pub sha256: &'a str,
    pub size: u64,
}

impl Manifest {
    /// Parse manifest YAML.
    pub fn from_yaml_str(text: &str) -> Result<Manifest, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Render the manifest back to YAML.
    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn header_archive(&self) -> Option<&HeaderArchive> {
        self.interfaces.as_ref().and_then(|i| i.headers.as_ref())
    }

    pub fn android_archives(&self) -> &[AndroidArchive] {
        self.android.as_ref().map(|a| a.archives.as_slice()).unwrap_or(&[])
    }

    pub fn ios_archives(&self) -> &[IosArchive] {
        self.ios.as_ref().map(|a| a.archives.as_slice()).unwrap_or(&[])
    }

    pub fn linux_archives(&self) -> &[LinuxArchive] {
        self.linux.as_ref().map(|a| a.archives.as_slice()).unwrap_or(&[])
    }

    /// Whether the manifest has no platform-specific archives.
    pub fn is_header_only(&self) -> bool {
        self.android_archives().is_empty()
            && self.ios_archives().is_empty()
            && self.linux_archives().is_empty()
    }

    /// Every archive in the manifest, header archive first.
    pub fn archives(&self) -> Vec<ArchiveRef<'_>> {
        let mut all = Vec::new();
        if let Some(h) = self.header_archive() {
            all.push(ArchiveRef {
                file: &h.file,
                sha256: &h.sha256,
                size: h.size,
            });
        }
        for a in self.android_archives() {
            all.push(ArchiveRef {
                file: &a.file,
                sha256: &a.sha256,
                size: a.size,
            });
        }
        for a in self.ios_archives() {
            all.push(ArchiveRef {
                file: &a.file,
                sha256: &a.sha256,
                size: a.size,
            });
        }
        for a in self.linux_archives() {
            all.push(ArchiveRef {
                file: &a.file,
                sha256: &a.sha256,
                size: a.size,
            });
        }
        all
    }

    /// Non-empty example source, if any.
    pub fn example_source(&self) -> Option<&str> {
        self.example.as_deref().filter(|e| !e.trim().is_empty())
    }
}

macro_rules! cxx_language_features {
    ($($variant:ident => ($name:literal, $standard:literal),)*) => {
        /// A C++ language feature, named the way CMake's
        /// `target_compile_features` names it.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum CxxLanguageFeature {
            $($variant,)*
        }

        impl CxxLanguageFeature {
            pub const ALL: &'static [CxxLanguageFeature] = &[$(CxxLanguageFeature::$variant,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(CxxLanguageFeature::$variant => $name,)*
                }
            }

            /// The language standard that introduced the feature (0 for C++98).
            pub fn standard(self) -> u32 {
                match self {
                    $(CxxLanguageFeature::$variant => $standard,)*
                }
            }
        }

        impl FromStr for CxxLanguageFeature {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(CxxLanguageFeature::$variant),)*
                    other => Err(format!("unknown C++ language feature '{}'", other)),
                }
            }
        }
    };
}

cxx_language_features! {
    CxxStd98 => ("cxx_std_98", 0),
    CxxStd11 => ("cxx_std_11", 11),
    CxxStd14 => ("cxx_std_14", 14),
    CxxStd17 => ("cxx_std_17", 17),
    AggregateDefaultInitializers => ("cxx_aggregate_default_initializers", 11),
    AliasTemplates => ("cxx_alias_templates", 11),
    Alignas => ("cxx_alignas", 11),
    Alignof => ("cxx_alignof", 11),
    Attributes => ("cxx_attributes", 11),
    AttributeDeprecated => ("cxx_attribute_deprecated", 14),
    AutoType => ("cxx_auto_type", 11),
    BinaryLiterals => ("cxx_binary_literals", 14),
    Constexpr => ("cxx_constexpr", 11),
    ContextualConversions => ("cxx_contextual_conversions", 14),
    DecltypeIncompleteReturnTypes => ("cxx_decltype_incomplete_return_types", 11),
    Decltype => ("cxx_decltype", 11),
    DecltypeAuto => ("cxx_decltype_auto", 14),
    DefaultFunctionTemplateArgs => ("cxx_default_function_template_args", 11),
    DefaultedFunctions => ("cxx_defaulted_functions", 11),
    DefaultedMoveInitializers => ("cxx_defaulted_move_initializers", 11),
    DelegatingConstructors => ("cxx_delegating_constructors", 11),
    DeletedFunctions => ("cxx_deleted_functions", 11),
    DigitSeparators => ("cxx_digit_separators", 14),
    EnumForwardDeclarations => ("cxx_enum_forward_declarations", 11),
    ExplicitConversions => ("cxx_explicit_conversions", 11),
    ExtendedFriendDeclarations => ("cxx_extended_friend_declarations", 11),
    ExternTemplates => ("cxx_extern_templates", 11),
    Final => ("cxx_final", 11),
    FuncIdentifier => ("cxx_func_identifier", 11),
    GeneralizedInitializers => ("cxx_generalized_initializers", 11),
    GenericLambdas => ("cxx_generic_lambdas", 14),
    InheritingConstructors => ("cxx_inheriting_constructors", 11),
    InlineNamespaces => ("cxx_inline_namespaces", 11),
    Lambdas => ("cxx_lambdas", 11),
    LambdaInitCaptures => ("cxx_lambda_init_captures", 14),
    LocalTypeTemplateArgs => ("cxx_local_type_template_args", 11),
    LongLongType => ("cxx_long_long_type", 11),
    Noexcept => ("cxx_noexcept", 11),
    NonstaticMemberInit => ("cxx_nonstatic_member_init", 11),
    Nullptr => ("cxx_nullptr", 11),
    Override => ("cxx_override", 11),
    RangeFor => ("cxx_range_for", 11),
    RawStringLiterals => ("cxx_raw_string_literals", 11),
    ReferenceQualifiedFunctions => ("cxx_reference_qualified_functions", 11),
    RelaxedConstexpr => ("cxx_relaxed_constexpr", 14),
    ReturnTypeDeduction => ("cxx_return_type_deduction", 11),
    RightAngleBrackets => ("cxx_right_angle_brackets", 11),
    RvalueReferences => ("cxx_rvalue_references", 11),
    SizeofMember => ("cxx_sizeof_member", 11),
    StaticAssert => ("cxx_static_assert", 11),
    StrongEnums => ("cxx_strong_enums", 11),
    ThreadLocal => ("cxx_thread_local", 11),
    TrailingReturnTypes => ("cxx_trailing_return_types", 11),
    UnicodeLiterals => ("cxx_unicode_literals", 11),
    UniformInitialization => ("cxx_uniform_initialization", 11),
    UnrestrictedUnions => ("cxx_unrestricted_unions", 11),
    UserLiterals => ("cxx_user_literals", 11),
    VariableTemplates => ("cxx_variable_templates", 14),
    VariadicMacros => ("cxx_variadic_macros", 11),
    VariadicTemplates => ("cxx_variadic_templates", 11),
    TemplateTemplateParameters => ("cxx_template_template_parameters", 11),
}

impl fmt::Display for CxxLanguageFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CxxLanguageFeature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CxxLanguageFeature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQLITE: &str = r#"
coordinate:
  groupId: com.github.jomof
  artifactId: sqlite
  version: 3.16.2-rev45
dependencies:
  - compile: com.github.jomof:boost:1.0.63-rev21
    sha256: 0a1b
interfaces:
  headers:
    file: sqlite-headers.zip
    sha256: 11aa
    size: 100
    include: include
    requires: [cxx_auto_type, cxx_decltype_auto]
android:
  archives:
    - file: sqlite-android-arm64.zip
      sha256: 22bb
      size: 200
      ndk: r13b
      runtime: c++
      platform: 21
      abi: arm64-v8a
      include: include
      libs: [libsqlite.a]
iOS:
  archives:
    - file: sqlite-ios.zip
      sha256: 33cc
      size: 300
      platform: iPhoneOS
      architecture: armv7s
      sdk: 10.2
      include: include
      libs: [libsqlite.a]
example: |
  #include <sqlite3.h>
"#;

    #[test]
    fn test_parse_full_manifest() {
        let m = Manifest::from_yaml_str(SQLITE).unwrap();
        assert_eq!(m.coordinate.to_string(), "com.github.jomof:sqlite:3.16.2-rev45");
        assert_eq!(m.dependencies[0].compile, "com.github.jomof:boost:1.0.63-rev21");

        let headers = m.header_archive().unwrap();
        assert_eq!(
            headers.requires,
            vec![CxxLanguageFeature::AutoType, CxxLanguageFeature::DecltypeAuto]
        );

        let android = &m.android_archives()[0];
        assert_eq!(android.platform, "21");
        assert_eq!(android.abi, "arm64-v8a");

        let ios = &m.ios_archives()[0];
        assert_eq!(ios.platform, Some(IosPlatform::IPhoneOs));
        assert_eq!(ios.architecture, Some(IosArchitecture::Armv7s));
        assert_eq!(ios.sdk, "10.2");

        assert_eq!(m.archives().len(), 3);
        assert!(!m.is_header_only());
        assert!(m.example_source().unwrap().contains("sqlite3.h"));
    }

    #[test]
    fn test_missing_coordinate_is_blank() {
        let m = Manifest::from_yaml_str("linux:\n  archives:\n    - file: a.zip\n").unwrap();
        assert!(m.coordinate.is_blank());
        assert_eq!(m.coordinate, Coordinate::default());
        assert!(Manifest::default().coordinate.is_blank());
    }

    #[test]
    fn test_unknown_feature_is_rejected() {
        let text = "interfaces:\n  headers:\n    file: a.zip\n    requires: [cxx_time_travel]\n";
        let err = Manifest::from_yaml_str(text).unwrap_err();
        assert!(err.to_string().contains("cxx_time_travel"));
    }

    #[test]
    fn test_feature_standards() {
        assert_eq!(CxxLanguageFeature::CxxStd98.standard(), 0);
        assert_eq!(CxxLanguageFeature::GenericLambdas.standard(), 14);
        assert_eq!("cxx_nullptr".parse::<CxxLanguageFeature>().unwrap().standard(), 11);
        assert!(CxxLanguageFeature::ALL.len() > 60);
    }

    #[test]
    fn test_yaml_round_trip_keeps_ios_key() {
        let m = Manifest::from_yaml_str(SQLITE).unwrap();
        let text = m.to_yaml_string().unwrap();
        assert!(text.contains("iOS:"));
        assert_eq!(Manifest::from_yaml_str(&text).unwrap(), m);
    }
}

//! The closed set of builtins a decision routine may call.

use std::fmt;

use crate::core::manifest::CxxLanguageFeature;
use crate::ir::interpreter::{CompilerRequirement, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalFunction {
    /// Last path segment.
    FileGetName,
    /// Byte position of the last occurrence, or -1.
    StringLastIndexOf,
    /// `(text, begin, end)`; a negative end means the end of the text.
    StringSubstring,
    StringStartsWith,
    StringEquals,
    FileJoinSegments,
    IntegerGte,
    Not,
    Or,
    RequireMinimumCxxCompilerStandard,
    ArrayHasOnlyElement,
    RequiresCompilerFeatures,
    SupportsCompilerFeatures,
}

impl ExternalFunction {
    pub fn name(self) -> &'static str {
        match self {
            ExternalFunction::FileGetName => "getName",
            ExternalFunction::StringLastIndexOf => "lastIndexOf",
            ExternalFunction::StringSubstring => "substring",
            ExternalFunction::StringStartsWith => "startsWith",
            ExternalFunction::StringEquals => "eq",
            ExternalFunction::FileJoinSegments => "joinFileSegments",
            ExternalFunction::IntegerGte => "gte",
            ExternalFunction::Not => "not",
            ExternalFunction::Or => "or",
            ExternalFunction::RequireMinimumCxxCompilerStandard => {
                "requireMinimumCxxCompilerStandard"
            }
            ExternalFunction::ArrayHasOnlyElement => "arrayHasOnlyElement",
            ExternalFunction::RequiresCompilerFeatures => "requiresCompilerFeatures",
            ExternalFunction::SupportsCompilerFeatures => "supportsCompilerFeatures",
        }
    }

    /// Number of arguments, or `None` for variadic.
    pub fn arity(self) -> Option<usize> {
        match self {
            ExternalFunction::SupportsCompilerFeatures => Some(0),
            ExternalFunction::FileGetName
            | ExternalFunction::Not
            | ExternalFunction::RequireMinimumCxxCompilerStandard
            | ExternalFunction::RequiresCompilerFeatures => Some(1),
            ExternalFunction::StringLastIndexOf
            | ExternalFunction::StringStartsWith
            | ExternalFunction::StringEquals
            | ExternalFunction::IntegerGte
            | ExternalFunction::Or
            | ExternalFunction::ArrayHasOnlyElement => Some(2),
            ExternalFunction::StringSubstring => Some(3),
            ExternalFunction::FileJoinSegments => None,
        }
    }

    /// Whether this function's result is bound to a name rather than
    /// tested or executed directly.
    pub fn is_assignable(self) -> bool {
        matches!(
            self,
            ExternalFunction::FileGetName
                | ExternalFunction::StringLastIndexOf
                | ExternalFunction::StringSubstring
                | ExternalFunction::FileJoinSegments
        )
    }

    /// Apply a pure builtin. `SupportsCompilerFeatures` depends on the
    /// environment and is answered by the interpreter instead.
    pub fn apply(self, args: &[Value]) -> Result<Value, String> {
        if let Some(arity) = self.arity() {
            if args.len() != arity {
                return Err(format!(
                    "{} expects {} argument(s) but got {}",
                    self,
                    arity,
                    args.len()
                ));
            }
        }
        match self {
            ExternalFunction::FileGetName => {
                let path = args[0].as_str(self)?;
                let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
                Ok(Value::Str(name.to_string()))
            }
            ExternalFunction::StringLastIndexOf => {
                let text = args[0].as_str(self)?;
                let needle = args[1].as_str(self)?;
                Ok(Value::Int(text.rfind(needle).map_or(-1, |i| i as i64)))
            }
            ExternalFunction::StringSubstring => {
                let text = args[0].as_str(self)?;
                let begin = clamp(args[1].as_int(self)?, text.len());
                let end = match args[2].as_int(self)? {
                    end if end < 0 => text.len(),
                    end => clamp(end, text.len()),
                };
                Ok(Value::Str(
                    text.get(begin..end.max(begin)).unwrap_or_default().to_string(),
                ))
            }
            ExternalFunction::StringStartsWith => {
                Ok(Value::Bool(args[0].as_str(self)?.starts_with(args[1].as_str(self)?)))
            }
            ExternalFunction::StringEquals => Ok(Value::Bool(args[0].loosely_equals(&args[1]))),
            ExternalFunction::FileJoinSegments => {
                let mut segments = Vec::with_capacity(args.len());
                for arg in args {
                    segments.push(arg.as_str(self)?);
                }
                Ok(Value::Str(join_segments(&segments)))
            }
            ExternalFunction::IntegerGte => {
                Ok(Value::Bool(args[0].as_int(self)? >= args[1].as_int(self)?))
            }
            ExternalFunction::Not => Ok(Value::Bool(!args[0].as_bool(self)?)),
            ExternalFunction::Or => Ok(Value::Bool(args[0].as_bool(self)? || args[1].as_bool(self)?)),
            ExternalFunction::RequireMinimumCxxCompilerStandard => {
                let standard = args[0].as_int(self)?;
                Ok(Value::Requirement(CompilerRequirement::MinimumStandard(
                    standard as u32,
                )))
            }
            ExternalFunction::ArrayHasOnlyElement => {
                let wanted = args[1].as_str(self)?;
                let only = match &args[0] {
                    Value::Array(items) => items.len() == 1 && items[0].as_str(self)? == wanted,
                    Value::Str(single) => single == wanted,
                    other => return Err(format!("{} expected an array but got {}", self, other)),
                };
                Ok(Value::Bool(only))
            }
            ExternalFunction::RequiresCompilerFeatures => {
                let Value::Array(items) = &args[0] else {
                    return Err(format!("{} expected an array of features", self));
                };
                let mut features: Vec<CxxLanguageFeature> = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Feature(feature) => features.push(*feature),
                        other => {
                            return Err(format!("{} expected a feature but got {}", self, other))
                        }
                    }
                }
                Ok(Value::Requirement(CompilerRequirement::Features(features)))
            }
            ExternalFunction::SupportsCompilerFeatures => {
                Err(format!("{} depends on the build environment", self))
            }
        }
    }
}

impl fmt::Display for ExternalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Join path segments with `/`, skipping empty segments and doubled
/// separators.
pub fn join_segments(segments: &[&str]) -> String {
    let mut joined = String::new();
    for segment in segments.iter().filter(|s| !s.is_empty()) {
        if joined.is_empty() {
            joined.push_str(segment);
        } else {
            if !joined.ends_with('/') {
                joined.push('/');
            }
            joined.push_str(segment.trim_start_matches('/'));
        }
    }
    joined
}

fn clamp(value: i64, len: usize) -> usize {
    if value < 0 {
        0
    } else {
        (value as usize).min(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::Str(text.to_string())
    }

    #[test]
    fn test_sysroot_decomposition() {
        let sysroot = s("/Applications/Xcode.app/SDKs/iPhoneOS10.2.sdk");
        let name = ExternalFunction::FileGetName.apply(&[sysroot]).unwrap();
        assert_eq!(name, s("iPhoneOS10.2.sdk"));

        let dot = ExternalFunction::StringLastIndexOf
            .apply(&[name.clone(), s(".")])
            .unwrap();
        assert_eq!(dot, Value::Int(12));

        let combined = ExternalFunction::StringSubstring
            .apply(&[name, Value::Int(0), dot])
            .unwrap();
        assert_eq!(combined, s("iPhoneOS10.2"));
    }

    #[test]
    fn test_substring_without_dot_is_whole_text() {
        let result = ExternalFunction::StringSubstring
            .apply(&[s("iPhoneOS"), Value::Int(0), Value::Int(-1)])
            .unwrap();
        assert_eq!(result, s("iPhoneOS"));
    }

    #[test]
    fn test_join_segments() {
        assert_eq!(join_segments(&["/root", "com.example", "", "lib"]), "/root/com.example/lib");
        assert_eq!(join_segments(&["/root/", "/a"]), "/root/a");
    }

    #[test]
    fn test_gte_accepts_numeric_strings() {
        let result = ExternalFunction::IntegerGte
            .apply(&[s("24"), Value::Int(21)])
            .unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn test_array_has_only_element() {
        let one = Value::Array(vec![s("arm64")]);
        let two = Value::Array(vec![s("arm64"), s("x86_64")]);
        let f = ExternalFunction::ArrayHasOnlyElement;
        assert_eq!(f.apply(&[one, s("arm64")]).unwrap(), Value::Bool(true));
        assert_eq!(f.apply(&[two, s("arm64")]).unwrap(), Value::Bool(false));
        assert_eq!(f.apply(&[s("arm64"), s("arm64")]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_arity_is_checked() {
        let err = ExternalFunction::Not.apply(&[]).unwrap_err();
        assert!(err.contains("expects 1 argument"));
    }
}

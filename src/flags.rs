//! Compiler and linker flag assembly
//!
//! Flag strings are built from ordered groups (fixed defaults, warning
//! suppression, environment overrides). Group order is preserved and blank
//! entries are skipped. Duplicates are kept so a later flag overrides an
//! earlier one the way the compiler expects.

/// Warnings the native dependency triggers in volume without being actionable.
pub const WARNING_SUPPRESSION: &[&str] = &[
    "-Wno-unused-parameter",
    "-Wno-unused-variable",
    "-fno-strict-aliasing",
    "-Wno-lto-type-mismatch",
];

/// One group of flags, either pre-split tokens or a raw string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagGroup {
    Tokens(Vec<String>),
    Raw(String),
}

impl FlagGroup {
    fn tokens(&self) -> Vec<&str> {
        match self {
            FlagGroup::Tokens(tokens) => tokens
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .collect(),
            FlagGroup::Raw(raw) => raw.split_whitespace().collect(),
        }
    }
}

impl From<&str> for FlagGroup {
    fn from(raw: &str) -> Self {
        FlagGroup::Raw(raw.to_string())
    }
}

impl From<String> for FlagGroup {
    fn from(raw: String) -> Self {
        FlagGroup::Raw(raw)
    }
}

impl From<Option<&str>> for FlagGroup {
    fn from(raw: Option<&str>) -> Self {
        FlagGroup::Raw(raw.unwrap_or_default().to_string())
    }
}

impl From<&[&str]> for FlagGroup {
    fn from(tokens: &[&str]) -> Self {
        FlagGroup::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

impl From<Vec<String>> for FlagGroup {
    fn from(tokens: Vec<String>) -> Self {
        FlagGroup::Tokens(tokens)
    }
}

/// Join flag groups into a single space-separated string.
pub fn assemble<I>(groups: I) -> String
where
    I: IntoIterator,
    I::Item: Into<FlagGroup>,
{
    let groups: Vec<FlagGroup> = groups.into_iter().map(Into::into).collect();
    groups
        .iter()
        .flat_map(|group| group.tokens())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Default C/C++ flags followed by the caller's override string.
pub fn compile_flags(env_override: Option<&str>) -> String {
    assemble([
        FlagGroup::from(WARNING_SUPPRESSION),
        FlagGroup::from(env_override),
    ])
}

/// Linker flags: runtime-library search paths first, then the caller's override.
pub fn linker_flags(runtime_flags: Vec<String>, env_override: Option<&str>) -> String {
    assemble([FlagGroup::from(runtime_flags), FlagGroup::from(env_override)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_preserves_group_order() {
        let flags = assemble([
            FlagGroup::from(&["-O2", "-g"][..]),
            FlagGroup::from("-O3"),
        ]);
        assert_eq!(flags, "-O2 -g -O3");
    }

    #[test]
    fn test_assemble_skips_blank_entries() {
        let flags = assemble([
            FlagGroup::Tokens(vec!["".to_string(), "  ".to_string(), "-Wall".to_string()]),
            FlagGroup::from("   "),
            FlagGroup::from(None::<&str>),
            FlagGroup::from("  -fPIC   -DNDEBUG "),
        ]);
        assert_eq!(flags, "-Wall -fPIC -DNDEBUG");
    }

    #[test]
    fn test_assemble_keeps_duplicates() {
        let flags = assemble(["-O2", "-O0", "-O2"]);
        assert_eq!(flags, "-O2 -O0 -O2");
    }

    #[test]
    fn test_compile_flags_defaults_then_override() {
        let flags = compile_flags(Some("-march=native"));
        assert!(flags.starts_with("-Wno-unused-parameter -Wno-unused-variable"));
        assert!(flags.ends_with("-Wno-lto-type-mismatch -march=native"));
    }

    #[test]
    fn test_compile_flags_without_override() {
        assert_eq!(compile_flags(None), WARNING_SUPPRESSION.join(" "));
    }

    #[test]
    fn test_linker_flags_empty() {
        assert_eq!(linker_flags(vec![], None), "");
        assert_eq!(linker_flags(vec![], Some("")), "");
    }

    #[test]
    fn test_linker_flags_runtime_first() {
        let flags = linker_flags(
            vec!["-L/opt/llvm/lib".to_string()],
            Some("-Wl,--as-needed"),
        );
        assert_eq!(flags, "-L/opt/llvm/lib -Wl,--as-needed");
    }
}

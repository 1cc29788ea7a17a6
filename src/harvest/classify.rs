//! Heuristic test-file classification.
//!
//! The rules favour recall: a non-test file swept in costs a little noise,
//! a generated test that is missed is lost output.

use super::paths::NormalizedPath;

/// Directory names that mark everything beneath them as tests.
const TEST_DIRS: &[&str] = &["test", "tests", "__tests__"];

/// Filename suffixes used by common per-language test conventions.
const TEST_SUFFIXES: &[&str] = &[
    "_test.py",
    "_tests.py",
    "_spec.py",
    "_test.ts",
    "_tests.ts",
    "_spec.ts",
    "_test.tsx",
    "_spec.tsx",
    "_test.js",
    "_tests.js",
    "_spec.js",
    "test.java",
    "tests.java",
    "test.kt",
    "tests.kt",
    "test.rs",
    "tests.rs",
    "test.go",
    "tests.go",
    "test.rb",
    "tests.rb",
    "test.swift",
    "tests.swift",
    "test.cs",
    "tests.cs",
];

/// Source extensions for which a `test`/`spec` keyword anywhere in the
/// filename is enough.
const SOURCE_EXTENSIONS: &[&str] = &[
    ".py", ".ts", ".tsx", ".js", ".jsx", ".java", ".kt", ".go", ".rb", ".rs", ".php", ".c",
    ".cpp", ".cs", ".swift", ".m", ".scala",
];

const KEYWORDS: &[&str] = &["test", "spec"];

/// Decide whether `path` looks like a test artifact.
///
/// Rules, first match wins:
/// 1. a parent directory is `test`, `tests` or `__tests__`
/// 2. the filename starts with `test`
/// 3. the filename ends with a known test suffix (`_test.py`, `Test.java`, ...)
/// 4. the filename contains `test` or `spec` and has a source extension
///
/// All comparisons are case-insensitive.
pub fn is_test_file(path: &NormalizedPath) -> bool {
    let segments: Vec<String> = path.segments().map(str::to_lowercase).collect();
    let Some((name, parents)) = segments.split_last() else {
        return false;
    };

    if parents.iter().any(|dir| TEST_DIRS.contains(&dir.as_str())) {
        return true;
    }

    if name.starts_with("test") {
        return true;
    }

    if TEST_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        return true;
    }

    KEYWORDS.iter().any(|keyword| name.contains(keyword))
        && SOURCE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(path: &str) -> bool {
        is_test_file(&NormalizedPath::from(path))
    }

    #[test]
    fn test_directory_rule() {
        assert!(check("tests/foo.py"));
        assert!(check("pkg/test/helpers.txt"));
        assert!(check("web/__tests__/App.jsx"));
        assert!(check("Tests/Fixtures/data.json"));
    }

    #[test]
    fn test_directory_rule_ignores_final_segment() {
        assert!(!check("src/__tests__"));
        assert!(!check("src/foo.py"));
    }

    #[test]
    fn test_prefix_rule() {
        assert!(check("test_sample.py"));
        assert!(check("src/TestUtils.txt"));
    }

    #[test]
    fn test_suffix_rule() {
        assert!(check("foo_test.go"));
        assert!(check("FooTest.java"));
        assert!(check("src/WidgetTests.kt"));
        assert!(check("lib/parser_spec.js"));
        assert!(check("Sources/AppTests.swift"));
        assert!(check("Project/ServiceTest.cs"));
    }

    #[test]
    fn test_keyword_and_extension_rule() {
        assert!(check("src/button.spec.tsx"));
        assert!(check("src/contest.cpp"));
        assert!(check("latest_results.py"));
        assert!(!check("docs/latest-guide.md"));
    }

    #[test]
    fn test_non_tests() {
        assert!(!check("readme.md"));
        assert!(!check("src/main.rs"));
        assert!(!check("Cargo.toml"));
        assert!(!check(""));
    }

    #[test]
    fn test_deterministic() {
        for path in ["tests/foo.py", "src/foo.py", "FooTest.java", "readme.md"] {
            assert_eq!(check(path), check(path));
        }
    }
}

//! Test paths recovered from the agent's recorded file edits and writes.

use std::collections::BTreeSet;
use std::path::Path;

use crate::backend::HistoryEvent;

use super::classify::is_test_file;
use super::paths::NormalizedPath;

/// Collect test-file paths the agent edited or wrote, as recorded in its
/// history. Paths are normalized as recorded, so absolute paths lose only
/// their root.
pub fn extract_test_paths(history: &[HistoryEvent]) -> BTreeSet<NormalizedPath> {
    collect(history, None)
}

/// Like [`extract_test_paths`], but absolute paths inside `workspace` are
/// first made relative to it.
pub fn extract_test_paths_under(
    history: &[HistoryEvent],
    workspace: &Path,
) -> BTreeSet<NormalizedPath> {
    collect(history, Some(workspace))
}

fn collect(history: &[HistoryEvent], workspace: Option<&Path>) -> BTreeSet<NormalizedPath> {
    history
        .iter()
        .filter_map(HistoryEvent::file_path)
        .map(|raw| {
            let path = Path::new(raw);
            match workspace.and_then(|ws| path.strip_prefix(ws).ok()) {
                Some(relative) => NormalizedPath::from(relative),
                None => NormalizedPath::from(raw),
            }
        })
        .filter(|path| !path.is_empty() && is_test_file(path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AgentState;

    fn write(path: &str) -> HistoryEvent {
        HistoryEvent::FileWrite {
            path: path.to_string(),
        }
    }

    fn edit(path: &str) -> HistoryEvent {
        HistoryEvent::FileEdit {
            path: path.to_string(),
        }
    }

    fn names(paths: &BTreeSet<NormalizedPath>) -> Vec<&str> {
        paths.iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn test_collects_edits_and_writes_of_tests() {
        let history = vec![
            write("tests/test_a.py"),
            edit("src/lib.rs"),
            edit("src\\foo_test.go"),
            write("/abs/spec/widget.spec.ts"),
        ];
        let paths = extract_test_paths(&history);
        assert_eq!(
            names(&paths),
            vec!["abs/spec/widget.spec.ts", "src/foo_test.go", "tests/test_a.py"]
        );
    }

    #[test]
    fn test_ignores_other_events() {
        let history = vec![
            HistoryEvent::Message {
                source: Some("agent".to_string()),
                content: "I wrote tests/test_a.py".to_string(),
                wait_for_response: false,
            },
            HistoryEvent::Other {
                kind: "read".to_string(),
            },
            HistoryEvent::AgentStateChanged {
                agent_state: AgentState::Finished,
            },
            HistoryEvent::Finish { message: None },
        ];
        assert!(extract_test_paths(&history).is_empty());
        assert!(extract_test_paths(&[]).is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let history = vec![
            write("tests/test_a.py"),
            edit("./tests/test_a.py"),
            edit("tests//test_a.py"),
        ];
        assert_eq!(names(&extract_test_paths(&history)), vec!["tests/test_a.py"]);
    }

    #[test]
    fn test_relative_to_workspace() {
        let history = vec![
            edit("/srv/repo/tests/test_a.py"),
            edit("/elsewhere/tests/test_b.py"),
            edit("tests/test_c.py"),
        ];
        let paths = extract_test_paths_under(&history, Path::new("/srv/repo"));
        assert_eq!(
            names(&paths),
            vec!["elsewhere/tests/test_b.py", "tests/test_a.py", "tests/test_c.py"]
        );
    }
}

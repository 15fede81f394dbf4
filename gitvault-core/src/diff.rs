use similar::{ChangeTag, TextDiff};

#[derive(Debug, Clone)]
pub struct FileDiff {
    pub path: String,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
    pub binary: bool,
    pub diff_lines: Vec<DiffLine>,
    changed: bool,
}

#[derive(Debug, Clone)]
pub struct DiffLine {
    pub line_type: DiffLineType,
    pub content: String,
    pub old_line_number: Option<usize>,
    pub new_line_number: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineType {
    Context,
    Addition,
    Deletion,
}

impl FileDiff {
    /// Compare two versions of `path`. `None` means the path is absent on that side.
    pub fn between(path: &str, old: Option<&[u8]>, new: Option<&[u8]>) -> Self {
        let binary = [old, new].iter().flatten().any(|bytes| is_binary(bytes));
        let old_content = old.map(|bytes| String::from_utf8_lossy(bytes).into_owned());
        let new_content = new.map(|bytes| String::from_utf8_lossy(bytes).into_owned());

        let diff_lines = if binary {
            Vec::new()
        } else {
            Self::compute_diff(
                old_content.as_deref().unwrap_or(""),
                new_content.as_deref().unwrap_or(""),
            )
        };

        FileDiff {
            path: path.to_string(),
            old_content,
            new_content,
            binary,
            diff_lines,
            changed: old != new,
        }
    }

    /// True when the bytes differ or the path exists on only one side.
    pub fn has_changes(&self) -> bool {
        self.changed
    }

    fn compute_diff(old_text: &str, new_text: &str) -> Vec<DiffLine> {
        let diff = TextDiff::from_lines(old_text, new_text);
        let mut lines = Vec::new();
        let mut old_line_num = 1;
        let mut new_line_num = 1;

        for change in diff.iter_all_changes() {
            let (line_type, old_num, new_num) = match change.tag() {
                ChangeTag::Delete => {
                    let num = old_line_num;
                    old_line_num += 1;
                    (DiffLineType::Deletion, Some(num), None)
                }
                ChangeTag::Insert => {
                    let num = new_line_num;
                    new_line_num += 1;
                    (DiffLineType::Addition, None, Some(num))
                }
                ChangeTag::Equal => {
                    let old_num = old_line_num;
                    let new_num = new_line_num;
                    old_line_num += 1;
                    new_line_num += 1;
                    (DiffLineType::Context, Some(old_num), Some(new_num))
                }
            };

            lines.push(DiffLine {
                line_type,
                content: change.to_string(),
                old_line_number: old_num,
                new_line_number: new_num,
            });
        }

        lines
    }

    /// Render as a unified diff. Returns an empty string when nothing changed.
    pub fn format_unified(&self, context_lines: usize) -> String {
        if !self.has_changes() {
            return String::new();
        }

        let old_header = match self.old_content {
            Some(_) => format!("a/{}", self.path),
            None => "/dev/null".to_string(),
        };
        let new_header = match self.new_content {
            Some(_) => format!("b/{}", self.path),
            None => "/dev/null".to_string(),
        };

        if self.binary {
            return format!("Binary files {} and {} differ\n", old_header, new_header);
        }

        let old_text = self.old_content.as_deref().unwrap_or("");
        let new_text = self.new_content.as_deref().unwrap_or("");
        let rendered = TextDiff::from_lines(old_text, new_text)
            .unified_diff()
            .context_radius(context_lines)
            .header(&old_header, &new_header)
            .to_string();

        // An empty file added or removed has no hunks.
        if rendered.is_empty() {
            format!("--- {}\n+++ {}\n", old_header, new_header)
        } else {
            rendered
        }
    }
}

fn is_binary(bytes: &[u8]) -> bool {
    bytes.contains(&0) || std::str::from_utf8(bytes).is_err()
}

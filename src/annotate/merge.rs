//! Merging generated comments back into source text
//!
//! Insert-only: the output is the input with comment blocks spliced in at
//! recorded offsets, byte-identical everywhere else. Insertions are applied
//! in descending offset order so earlier offsets never shift.

use crate::annotate::{AnnotationResult, AnnotationTask, Priority, TaskKind};
use crate::models::SourceFile;
use std::collections::HashMap;

/// Merge the successful results for one file into a copy of its text.
///
/// Tasks without a successful result contribute nothing; the surrounding
/// code is left untouched either way. Which targets get annotated at all is
/// the caller's policy; everything passed in here is spliced.
pub fn merge_file(
    source: &SourceFile,
    tasks: &[AnnotationTask],
    results: &[AnnotationResult],
) -> String {
    let texts: HashMap<_, _> = results
        .iter()
        .filter(|r| r.succeeded())
        .filter_map(|r| r.text.as_deref().map(|t| (&r.task_id, t)))
        .collect();

    let mut insertions: Vec<Insertion> = tasks
        .iter()
        .filter_map(|task| {
            let text = texts.get(&task.id)?;
            Some(build_insertion(source, task, text))
        })
        .collect();

    // Descending offset; at equal offsets, later-applied text lands first,
    // so members sort before their type (type comment ends up above) and
    // later-declared targets before earlier ones (comments follow
    // declaration order).
    insertions.sort_by(|a, b| {
        b.offset
            .cmp(&a.offset)
            .then_with(|| kind_rank(b.kind).cmp(&kind_rank(a.kind)))
            .then_with(|| b.start.cmp(&a.start))
    });

    let mut merged = source.text.clone();
    for ins in insertions {
        merged.insert_str(ins.offset, &ins.text);
    }
    merged
}

struct Insertion {
    offset: usize,
    /// Start offset of the target declaration, for equal-offset ordering
    start: usize,
    kind: TaskKind,
    text: String,
}

fn kind_rank(kind: TaskKind) -> u8 {
    match kind {
        TaskKind::File => 0,
        TaskKind::Type => 1,
        TaskKind::Member => 2,
    }
}

fn build_insertion(source: &SourceFile, task: &AnnotationTask, text: &str) -> Insertion {
    if task.kind == TaskKind::Member && task.priority == Priority::Low {
        // Trivial members get a short trailing comment on their own line
        // instead of a Javadoc block.
        let offset = source.line_end(task.insert_offset);
        return Insertion {
            offset,
            start: task.id.start,
            kind: task.kind,
            text: format!(" // {}", inline_text(text)),
        };
    }

    let offset = source.line_start(task.insert_offset);
    let indent = source.indent_at(task.insert_offset);
    Insertion {
        offset,
        start: task.id.start,
        kind: task.kind,
        text: format_javadoc(text, indent),
    }
}

/// Normalize generated text into a Javadoc block: strip code fences and any
/// comment markers the model added, then re-wrap with the target's indent.
fn format_javadoc(text: &str, indent: &str) -> String {
    let mut block = String::new();
    block.push_str(indent);
    block.push_str("/**\n");
    for line in cleaned_lines(text) {
        block.push_str(indent);
        if line.is_empty() {
            block.push_str(" *\n");
        } else {
            block.push_str(" * ");
            block.push_str(line);
            block.push('\n');
        }
    }
    block.push_str(indent);
    block.push_str(" */\n");
    block
}

/// First meaningful line of the generated text, markers stripped.
fn inline_text(text: &str) -> String {
    cleaned_lines(text)
        .into_iter()
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .to_string()
}

fn cleaned_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            let trimmed = trimmed
                .trim_start_matches("/**")
                .trim_end_matches("*/")
                .trim_start_matches("//")
                .trim();
            trimmed.trim_start_matches('*').trim()
        })
        .filter(|line| !line.starts_with("```"))
        .collect();
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::{partition_unit, TaskStatus};
    use crate::parser::parse_source;

    fn succeed_all(tasks: &[AnnotationTask], text: &str) -> Vec<AnnotationResult> {
        tasks
            .iter()
            .map(|t| AnnotationResult {
                task_id: t.id.clone(),
                status: TaskStatus::Succeeded,
                text: Some(text.to_string()),
                retries: 0,
            })
            .collect()
    }

    fn merge(source: &str, comment: &str, min_member_size: usize) -> (String, String) {
        let sf = SourceFile::new("Test.java", source);
        let unit = parse_source(&sf).expect("parse");
        let tasks = partition_unit(&sf, &unit, min_member_size);
        let results = succeed_all(&tasks, comment);
        (source.to_string(), merge_file(&sf, &tasks, &results))
    }

    #[test]
    fn test_block_comments_inserted_with_indent() {
        let source = "package p;\nclass A {\n    void run() {\n        int x = 0;\n        x += 1;\n        x += 2;\n    }\n}\n";
        let (_, merged) = merge(source, "Does a thing.", 10);

        assert!(merged.contains("/**\n * Does a thing.\n */\nclass A {"));
        assert!(merged.contains("    /**\n     * Does a thing.\n     */\n    void run()"));
    }

    #[test]
    fn test_trivial_member_gets_inline_comment() {
        let source = "class A {\n    int count;\n}\n";
        let (_, merged) = merge(source, "Running total.", 40);
        assert!(merged.contains("int count; // Running total."));
    }

    #[test]
    fn test_unannotated_bytes_unchanged() {
        let source = "package p;\nclass A {\n    void run() { int total = 0; total += 1; }\n}\n";
        let (original, merged) = merge(source, "Comment.", 10);

        // Removing every inserted line restores the original exactly
        let stripped: String = merged
            .lines()
            .filter(|l| {
                let t = l.trim();
                !(t.starts_with("/**") || t.starts_with('*'))
            })
            .map(|l| format!("{l}\n"))
            .collect();
        assert_eq!(stripped, original);
    }

    #[test]
    fn test_failed_tasks_leave_target_untouched() {
        let source = "class A {\n    void run() { int t = 0; t += 1; t += 2; }\n}\n";
        let sf = SourceFile::new("Test.java", source);
        let unit = parse_source(&sf).expect("parse");
        let tasks = partition_unit(&sf, &unit, 10);
        let results: Vec<AnnotationResult> = tasks
            .iter()
            .map(|t| AnnotationResult {
                task_id: t.id.clone(),
                status: TaskStatus::Cancelled,
                text: None,
                retries: 0,
            })
            .collect();
        assert_eq!(merge_file(&sf, &tasks, &results), source);
    }

    #[test]
    fn test_only_passed_tasks_spliced() {
        let source = "/** Existing. */\nclass A {\n    void run() { int t = 0; t += 1; t += 2; }\n}\n";
        let sf = SourceFile::new("Test.java", source);
        let unit = parse_source(&sf).expect("parse");
        // Documented targets were filtered out upstream
        let tasks: Vec<AnnotationTask> = partition_unit(&sf, &unit, 10)
            .into_iter()
            .filter(|t| !t.documented)
            .collect();
        let results = succeed_all(&tasks, "Generated.");
        let merged = merge_file(&sf, &tasks, &results);

        // The class keeps its hand-written comment; only the method gains one
        assert_eq!(merged.matches("Generated.").count(), 1);
        assert!(merged.contains("/** Existing. */\nclass A {"));
    }

    #[test]
    fn test_generated_markup_normalized() {
        let source = "class A {\n    void run() { int t = 0; t += 1; t += 2; }\n}\n";
        let fenced = "```java\n/**\n * Already wrapped.\n */\n```";
        let (_, merged) = merge(source, fenced, 10);

        assert!(!merged.contains("```"));
        assert!(merged.contains(" * Already wrapped."));
        // No doubled comment markers
        assert!(!merged.contains("/** /**"));
    }

    #[test]
    fn test_same_line_inline_comments_follow_declaration_order() {
        let source = "class A {\n    int first; int second;\n}\n";
        let sf = SourceFile::new("Test.java", source);
        let unit = parse_source(&sf).expect("parse");
        let tasks = partition_unit(&sf, &unit, 40);
        let results: Vec<AnnotationResult> = tasks
            .iter()
            .map(|t| AnnotationResult {
                task_id: t.id.clone(),
                status: TaskStatus::Succeeded,
                text: Some(
                    if t.kind == TaskKind::Member && t.prompt.contains("int second") {
                        "Beta.".to_string()
                    } else {
                        "Alpha.".to_string()
                    },
                ),
                retries: 0,
            })
            .collect();

        let merged = merge_file(&sf, &tasks, &results);
        assert!(merged.contains("int first; int second; // Alpha. // Beta."));
    }

    #[test]
    fn test_multiline_comment_preserves_blank_lines() {
        let block = format_javadoc("Summary.\n\n@return nothing", "  ");
        assert_eq!(
            block,
            "  /**\n   * Summary.\n   *\n   * @return nothing\n   */\n"
        );
    }
}

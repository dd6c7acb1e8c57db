//! Task partitioning
//!
//! Converts the structural model into annotation tasks: one file-level task
//! per compilation unit, one class-level task per type declaration, one
//! member-level task per member. Partitioning is deterministic and total -
//! every unit yields exactly one task - and trivially small members are
//! kept but flagged low-priority.

use crate::annotate::prompts;
use crate::models::{CompilationUnit, Member, MemberKind, SourceFile, TypeDeclaration};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Task identity: file path plus the target's byte range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId {
    pub file: PathBuf,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    File,
    Type,
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    /// Below the minimum-size threshold (trivial getters/setters, fields);
    /// annotated with a short inline comment instead of a Javadoc block
    Low,
}

/// One unit of requested annotation work. Tasks are independent and carry
/// no ordering dependency on each other.
#[derive(Debug, Clone)]
pub struct AnnotationTask {
    pub id: TaskId,
    pub kind: TaskKind,
    pub priority: Priority,
    /// Prompt sent to the completion service; built from a bounded context
    /// window, never the whole file
    pub prompt: String,
    /// Byte offset the generated comment is inserted before
    pub insert_offset: usize,
    /// Whether the target already carries a Javadoc block
    pub documented: bool,
}

/// How much surrounding code a member-level prompt may carry.
pub const CONTEXT_WINDOW: usize = 1200;

/// Partition one compilation unit into tasks.
///
/// Total: every type declaration (nested included) and every member yields
/// exactly one task, plus one file-level task for the unit itself.
pub fn partition_unit(
    source: &SourceFile,
    unit: &CompilationUnit,
    min_member_size: usize,
) -> Vec<AnnotationTask> {
    let mut tasks = Vec::new();

    tasks.push(AnnotationTask {
        id: TaskId {
            file: unit.path.clone(),
            start: unit.header_insert_offset,
            end: unit.header_insert_offset,
        },
        kind: TaskKind::File,
        priority: Priority::Normal,
        prompt: prompts::file_prompt(unit),
        insert_offset: unit.header_insert_offset,
        documented: unit.has_header_comment,
    });

    for decl in &unit.types {
        partition_type(source, unit, decl, min_member_size, &mut tasks);
    }

    tasks
}

fn partition_type(
    source: &SourceFile,
    unit: &CompilationUnit,
    decl: &TypeDeclaration,
    min_member_size: usize,
    tasks: &mut Vec<AnnotationTask>,
) {
    tasks.push(AnnotationTask {
        id: TaskId {
            file: unit.path.clone(),
            start: decl.start,
            end: decl.end,
        },
        kind: TaskKind::Type,
        priority: Priority::Normal,
        prompt: prompts::type_prompt(unit, decl),
        insert_offset: decl.start,
        documented: decl.has_javadoc,
    });

    for member in &decl.members {
        tasks.push(member_task(source, unit, decl, member, min_member_size));
    }

    for nested in &decl.nested {
        partition_type(source, unit, nested, min_member_size, tasks);
    }
}

fn member_task(
    source: &SourceFile,
    unit: &CompilationUnit,
    decl: &TypeDeclaration,
    member: &Member,
    min_member_size: usize,
) -> AnnotationTask {
    // Fields and bodies below the threshold stay in the queue but drop to
    // low priority, which also switches the comment style to inline.
    let priority = if member.kind == MemberKind::Field || member.body_len < min_member_size {
        Priority::Low
    } else {
        Priority::Normal
    };

    AnnotationTask {
        id: TaskId {
            file: unit.path.clone(),
            start: member.start,
            end: member.end,
        },
        kind: TaskKind::Member,
        priority,
        prompt: prompts::member_prompt(decl, member, context_window(source, member)),
        insert_offset: member.start,
        documented: member.has_javadoc,
    }
}

/// The minimal enclosing snippet for a member: its declaration plus a
/// bounded window of following code, clipped to char boundaries. Never the
/// whole file.
fn context_window<'a>(source: &'a SourceFile, member: &Member) -> &'a str {
    let start = member.start;
    let mut end = member.end.min(start + CONTEXT_WINDOW);
    while !source.text.is_char_boundary(end) {
        end -= 1;
    }
    &source.text[start..end]
}

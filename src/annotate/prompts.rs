//! Prompt templates for annotation generation

use crate::models::{CompilationUnit, Member, MemberKind, TypeDeclaration};

/// System prompt sent with every request.
pub const SYSTEM_PROMPT: &str =
    "You are an expert Java developer writing documentation comments. \
     Be concise and practical. Describe purpose and behavior, not syntax. \
     Return only the comment text, no code fences and no surrounding code.";

/// Prompt for the file-level header comment.
pub fn file_prompt(unit: &CompilationUnit) -> String {
    let mut names: Vec<&str> = unit.types.iter().map(|t| t.name.as_str()).collect();
    names.truncate(3);
    let mut summary = names.join(", ");
    if unit.types.len() > 3 {
        summary.push_str(", ...");
    }

    format!(
        "Write a brief Javadoc comment for this Java file.\n\n\
         File: {}\n\
         Package: {}\n\
         Main types: {}\n\
         Imports: {}\n\n\
         Explain what this file contains and its main purpose.\n\
         Return only the Javadoc comment.",
        unit.path.display(),
        package_or_default(&unit.package),
        summary,
        unit.imports.len(),
    )
}

/// Prompt for a class/interface/enum-level comment.
pub fn type_prompt(unit: &CompilationUnit, decl: &TypeDeclaration) -> String {
    let inheritance = if decl.supertypes.is_empty() {
        String::new()
    } else {
        format!(" (supertypes: {})", decl.supertypes.join(", "))
    };

    format!(
        "Write a concise Javadoc comment for this Java {kind}.\n\n\
         {kind_title}: {name}{inheritance}\n\
         Package: {package}\n\
         Members: {members}\n\n\
         Explain the purpose and main responsibilities of this {kind}.\n\
         Return only the Javadoc comment.",
        kind = decl.kind,
        kind_title = capitalize(&decl.kind.to_string()),
        name = decl.name,
        inheritance = inheritance,
        package = package_or_default(&unit.package),
        members = decl.members.len(),
    )
}

/// Prompt for a method, constructor, or field comment. `context` is the
/// bounded snippet around the declaration, not the whole file.
pub fn member_prompt(decl: &TypeDeclaration, member: &Member, context: &str) -> String {
    match member.kind {
        MemberKind::Field => format!(
            "Write a brief single-line comment for this Java field.\n\n\
             Field: {}\n\
             Declared in: {}\n\n\
             Explain what this field represents in a few words.\n\
             Return only a single line, no comment markers.",
            member.signature, decl.name,
        ),
        _ => format!(
            "Write a Javadoc comment for this Java method.\n\n\
             Signature: {}\n\
             Declared in: {} ({})\n\n\
             Code:\n{}\n\n\
             Explain what it does; include @param and @return where appropriate.\n\
             Return only the Javadoc comment.",
            member.signature, decl.name, decl.kind, context,
        ),
    }
}

fn package_or_default(package: &str) -> &str {
    if package.is_empty() {
        "(default package)"
    } else {
        package
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceFile;
    use crate::parser::parse_source;

    #[test]
    fn test_prompts_mention_target() {
        let sf = SourceFile::new(
            "Acct.java",
            "package bank;\nclass Account { int balance; void deposit(int amount) { balance += amount; } }\n",
        );
        let unit = parse_source(&sf).expect("parse");
        let decl = &unit.types[0];

        assert!(file_prompt(&unit).contains("Account"));
        assert!(type_prompt(&unit, decl).contains("Class: Account"));

        let deposit = decl.members.iter().find(|m| m.name == "deposit").unwrap();
        let prompt = member_prompt(decl, deposit, "void deposit(int amount) { ... }");
        assert!(prompt.contains("void deposit(int amount)"));
        assert!(prompt.contains("@param"));

        let field = decl.members.iter().find(|m| m.name == "balance").unwrap();
        let prompt = member_prompt(decl, field, "");
        assert!(prompt.contains("single line"));
    }
}

// src/build/syntax.rs

//! Structural check for scripts: brackets must balance and strings, comments
//! and template literals must be terminated.
//!
//! This is not a parser. It walks the source once, skipping string, comment
//! and regular-expression literals, and keeps a stack of open brackets.

/// First structural problem found in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Paren,
    Bracket,
    Brace,
    /// `${` inside a template literal; closing it resumes the template.
    TemplateExpr,
}

impl Open {
    fn closer(self) -> char {
        match self {
            Open::Paren => ')',
            Open::Bracket => ']',
            Open::Brace | Open::TemplateExpr => '}',
        }
    }

    fn opener(self) -> &'static str {
        match self {
            Open::Paren => "(",
            Open::Bracket => "[",
            Open::Brace => "{",
            Open::TemplateExpr => "${",
        }
    }
}

const REGEX_PRECEDING_WORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "new", "delete", "void", "throw",
];

pub fn check_script(source: &str) -> Result<(), SyntaxIssue> {
    let chars: Vec<char> = source.chars().collect();
    let mut stack: Vec<(Open, usize)> = Vec::new();
    let mut line = 1;
    let mut i = 0;
    // Last significant character and identifier outside literals, used to
    // tell a division from the start of a regex literal.
    let mut last_sig: Option<char> = None;
    let mut last_word = String::new();
    // Set right after `++` or `--`, which end an operand.
    let mut after_update = false;
    let mut in_template: Option<usize> = None;

    while i < chars.len() {
        let c = chars[i];

        if let Some(opened_at) = in_template {
            match c {
                '\\' => i += 1,
                '\n' => line += 1,
                '`' => {
                    in_template = None;
                    last_sig = Some('`');
                }
                '$' if chars.get(i + 1) == Some(&'{') => {
                    stack.push((Open::TemplateExpr, opened_at));
                    in_template = None;
                    last_sig = Some('{');
                    i += 1;
                }
                _ => {}
            }
            i += 1;
            continue;
        }

        match c {
            '\n' => line += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let start = line;
                i += 2;
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(SyntaxIssue {
                                line: start,
                                message: "unterminated block comment".to_string(),
                            });
                        }
                        Some('*') if chars.get(i + 1) == Some(&'/') => {
                            i += 1;
                            break;
                        }
                        Some('\n') => line += 1,
                        Some(_) => {}
                    }
                    i += 1;
                }
            }
            '/' if !after_update && regex_allowed(last_sig, &last_word) => {
                let start = line;
                let mut in_class = false;
                i += 1;
                loop {
                    match chars.get(i) {
                        None | Some('\n') => {
                            return Err(SyntaxIssue {
                                line: start,
                                message: "unterminated regular expression literal".to_string(),
                            });
                        }
                        Some('\\') => i += 1,
                        Some('[') => in_class = true,
                        Some(']') => in_class = false,
                        Some('/') if !in_class => break,
                        Some(_) => {}
                    }
                    i += 1;
                }
                last_sig = Some('/');
                last_word.clear();
            }
            '\'' | '"' => {
                let start = line;
                i += 1;
                loop {
                    match chars.get(i) {
                        None | Some('\n') => {
                            return Err(SyntaxIssue {
                                line: start,
                                message: format!("unterminated string literal ({c})"),
                            });
                        }
                        Some('\\') => {
                            if chars.get(i + 1) == Some(&'\n') {
                                line += 1;
                            }
                            i += 1;
                        }
                        Some(q) if *q == c => break,
                        Some(_) => {}
                    }
                    i += 1;
                }
                last_sig = Some(c);
                last_word.clear();
            }
            '`' => in_template = Some(line),
            '(' | '[' | '{' => {
                let kind = match c {
                    '(' => Open::Paren,
                    '[' => Open::Bracket,
                    _ => Open::Brace,
                };
                stack.push((kind, line));
                last_sig = Some(c);
                last_word.clear();
            }
            ')' | ']' | '}' => {
                match stack.pop() {
                    Some((open, _)) if open.closer() == c => {
                        if open == Open::TemplateExpr {
                            in_template = Some(line);
                        }
                    }
                    Some((open, opened_at)) => {
                        return Err(SyntaxIssue {
                            line,
                            message: format!(
                                "unexpected '{c}'; '{}' opened at line {opened_at} is still open",
                                open.opener()
                            ),
                        });
                    }
                    None => {
                        return Err(SyntaxIssue {
                            line,
                            message: format!("unexpected '{c}' with nothing open"),
                        });
                    }
                }
                last_sig = Some(c);
                last_word.clear();
            }
            c if is_ident(c) => {
                if i == 0 || !is_ident(chars[i - 1]) {
                    last_word.clear();
                }
                last_word.push(c);
                last_sig = Some(c);
            }
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            other => {
                let update = matches!(other, '+' | '-')
                    && !after_update
                    && i > 0
                    && chars[i - 1] == other;
                last_sig = Some(other);
                last_word.clear();
                after_update = update;
                i += 1;
                continue;
            }
        }
        after_update = false;
        i += 1;
    }

    if let Some(opened_at) = in_template {
        return Err(SyntaxIssue {
            line: opened_at,
            message: "unterminated template literal".to_string(),
        });
    }

    if let Some((open, opened_at)) = stack.pop() {
        return Err(SyntaxIssue {
            line: opened_at,
            message: format!("'{}' is never closed", open.opener()),
        });
    }

    Ok(())
}

fn regex_allowed(last_sig: Option<char>, last_word: &str) -> bool {
    match last_sig {
        None => true,
        Some(c) if is_ident(c) => REGEX_PRECEDING_WORDS.contains(&last_word),
        Some(')') | Some(']') | Some('}') | Some('\'') | Some('"') | Some('`') | Some('/') => false,
        Some(_) => true,
    }
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

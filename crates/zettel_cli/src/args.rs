//! Command-line parsing.
//!
//! Arguments are parsed by hand into [`Command`]; anything unexpected is a
//! [`UsageError`] carrying a one-line message.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Show { id: String },
    Tag { name: String },
    Tags,
    Links,
    Threads,
    Thread { id: String },
    New { content: String, tags: Vec<String> },
    Start { content: String, tags: Vec<String> },
    Reply { parent_id: String, content: String, tags: Vec<String> },
    Edit { id: String, content: Option<String>, tags: Option<Vec<String>> },
    Delete { id: String },
    Search { query: String, limit: Option<usize> },
    Export { dir: PathBuf },
    Import { file: PathBuf },
    Usage,
    Clear,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError(pub String);

impl Display for UsageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for UsageError {}

pub fn parse(args: Vec<String>) -> Result<Command, UsageError> {
    let mut args = args.into_iter();
    let Some(name) = args.next() else {
        return Ok(Command::Help);
    };
    let rest = args.collect::<Vec<_>>();

    match name.as_str() {
        "list" => no_args(&name, rest).map(|()| Command::List),
        "tags" => no_args(&name, rest).map(|()| Command::Tags),
        "links" => no_args(&name, rest).map(|()| Command::Links),
        "threads" => no_args(&name, rest).map(|()| Command::Threads),
        "usage" => no_args(&name, rest).map(|()| Command::Usage),
        "clear" => no_args(&name, rest).map(|()| Command::Clear),
        "help" | "--help" | "-h" => Ok(Command::Help),
        "show" => single(&name, rest).map(|id| Command::Show { id }),
        "tag" => single(&name, rest).map(|name| Command::Tag {
            name: name.trim_start_matches('#').to_string(),
        }),
        "thread" => single(&name, rest).map(|id| Command::Thread { id }),
        "delete" => single(&name, rest).map(|id| Command::Delete { id }),
        "import" => single(&name, rest).map(|file| Command::Import {
            file: PathBuf::from(file),
        }),
        "export" => match rest.as_slice() {
            [] => Ok(Command::Export {
                dir: PathBuf::from("."),
            }),
            [dir] => Ok(Command::Export {
                dir: PathBuf::from(dir),
            }),
            _ => Err(UsageError("usage: zettel export [dir]".to_string())),
        },
        "new" | "start" => {
            let parsed = Options::parse(rest)?;
            let content = parsed.one_positional(&format!("usage: zettel {name} <content> [-t tag]..."))?;
            let tags = parsed.tags.unwrap_or_default();
            Ok(if name == "new" {
                Command::New { content, tags }
            } else {
                Command::Start { content, tags }
            })
        }
        "reply" => {
            let parsed = Options::parse(rest)?;
            match <[String; 2]>::try_from(parsed.positional) {
                Ok([parent_id, content]) => Ok(Command::Reply {
                    parent_id,
                    content,
                    tags: parsed.tags.unwrap_or_default(),
                }),
                Err(_) => Err(UsageError(
                    "usage: zettel reply <parent-id> <content> [-t tag]...".to_string(),
                )),
            }
        }
        "edit" => {
            let parsed = Options::parse(rest)?;
            let id = parsed.one_positional("usage: zettel edit <id> [--content text] [-t tag]...")?;
            if parsed.content.is_none() && parsed.tags.is_none() {
                return Err(UsageError(
                    "edit needs --content and/or at least one -t tag".to_string(),
                ));
            }
            Ok(Command::Edit {
                id,
                content: parsed.content,
                tags: parsed.tags,
            })
        }
        "search" => {
            let parsed = Options::parse(rest)?;
            let query = parsed.one_positional("usage: zettel search <query> [--limit n]")?;
            Ok(Command::Search {
                query,
                limit: parsed.limit,
            })
        }
        other => Err(UsageError(format!(
            "unknown command `{other}`; run `zettel help`"
        ))),
    }
}

fn no_args(name: &str, rest: Vec<String>) -> Result<(), UsageError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(UsageError(format!("`{name}` takes no arguments")))
    }
}

fn single(name: &str, rest: Vec<String>) -> Result<String, UsageError> {
    match <[String; 1]>::try_from(rest) {
        Ok([value]) => Ok(value),
        Err(_) => Err(UsageError(format!("`{name}` takes exactly one argument"))),
    }
}

#[derive(Debug, Default)]
struct Options {
    positional: Vec<String>,
    tags: Option<Vec<String>>,
    content: Option<String>,
    limit: Option<usize>,
}

impl Options {
    fn parse(args: Vec<String>) -> Result<Self, UsageError> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-t" | "--tag" => {
                    let tag = args
                        .next()
                        .ok_or_else(|| UsageError(format!("{arg} needs a value")))?;
                    parsed
                        .tags
                        .get_or_insert_with(Vec::new)
                        .push(tag.trim_start_matches('#').to_string());
                }
                "--content" => {
                    let content = args
                        .next()
                        .ok_or_else(|| UsageError("--content needs a value".to_string()))?;
                    parsed.content = Some(content);
                }
                "-n" | "--limit" => {
                    let raw = args
                        .next()
                        .ok_or_else(|| UsageError(format!("{arg} needs a value")))?;
                    let limit = raw
                        .parse::<usize>()
                        .map_err(|_| UsageError(format!("invalid limit `{raw}`")))?;
                    parsed.limit = Some(limit);
                }
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(UsageError(format!("unknown option `{flag}`")));
                }
                _ => parsed.positional.push(arg),
            }
        }
        Ok(parsed)
    }

    fn one_positional(&self, usage: &str) -> Result<String, UsageError> {
        match self.positional.as_slice() {
            [value] => Ok(value.clone()),
            _ => Err(UsageError(usage.to_string())),
        }
    }
}
